use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::CollaboratorClient;
use crate::domain::errors::CollaboratorError;
use crate::domain::models::Language;
use crate::domain::ports::{Generation, GenerationConstraints, LanguageModel};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    max_tokens: u64,
    temperature: f64,
    language: Language,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
    token_cost: u64,
}

/// LM inference engine reached over `POST {base}/generate`.
#[derive(Debug, Clone)]
pub struct HttpLanguageModel {
    client: CollaboratorClient,
}

impl HttpLanguageModel {
    pub const fn new(client: CollaboratorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<Generation, CollaboratorError> {
        let request = GenerateRequest {
            prompt,
            max_tokens: constraints.max_tokens,
            temperature: constraints.temperature,
            language: constraints.language,
        };
        let response: GenerateResponse = self.client.post("/generate", &request).await?;
        Ok(Generation {
            text: response.text,
            token_cost: response.token_cost,
        })
    }
}
