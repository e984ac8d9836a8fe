use anyhow::{Context, Result};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::CollaboratorError;

/// Shared JSON-over-HTTP plumbing for one collaborator.
#[derive(Debug, Clone)]
pub struct CollaboratorClient {
    http_client: ReqwestClient,
    base_url: String,
    name: &'static str,
}

impl CollaboratorClient {
    pub fn new(name: &'static str, base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            name,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `path` and decode the JSON reply.
    pub async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, CollaboratorError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| transport_error(&err))?;

        let status = response.status();
        debug!(collaborator = self.name, %url, status = status.as_u16(), "Collaborator replied");

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(from_status(status, body));
        }

        let bytes = response.bytes().await.map_err(|err| transport_error(&err))?;
        serde_json::from_slice(&bytes)
            .map_err(|err| CollaboratorError::Malformed(format!("{} response: {err}", self.name)))
    }
}

fn transport_error(err: &reqwest::Error) -> CollaboratorError {
    if err.is_timeout() {
        CollaboratorError::Timeout
    } else {
        CollaboratorError::Unavailable(err.to_string())
    }
}

/// Classify a non-success HTTP status.
pub fn from_status(status: StatusCode, body: String) -> CollaboratorError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        CollaboratorError::Unavailable(format!("{status}: {body}"))
    } else if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        CollaboratorError::Timeout
    } else {
        CollaboratorError::Rejected(format!("{status}: {body}"))
    }
}
