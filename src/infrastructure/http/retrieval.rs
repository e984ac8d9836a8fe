use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::CollaboratorClient;
use crate::domain::errors::CollaboratorError;
use crate::domain::models::{EvidencePassage, Language};
use crate::domain::ports::RetrievalIndex;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    language: Language,
    k: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    passages: Vec<EvidencePassage>,
}

/// Retrieval index reached over `POST {base}/search`.
#[derive(Debug, Clone)]
pub struct HttpRetrievalIndex {
    client: CollaboratorClient,
}

impl HttpRetrievalIndex {
    pub const fn new(client: CollaboratorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RetrievalIndex for HttpRetrievalIndex {
    async fn search(
        &self,
        query: &str,
        language: Language,
        k: usize,
    ) -> Result<Vec<EvidencePassage>, CollaboratorError> {
        let response: SearchResponse = self
            .client
            .post("/search", &SearchRequest { query, language, k })
            .await?;
        let mut passages = response.passages;
        passages.truncate(k);
        Ok(passages)
    }
}
