//! LM inference engine port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::CollaboratorError;
use crate::domain::models::Language;

/// Limits passed with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConstraints {
    /// Hard ceiling on tokens the engine may spend.
    pub max_tokens: u64,

    /// Sampling temperature (0.0 - 1.0)
    pub temperature: f64,

    /// Language the answer should be written in
    pub language: Language,
}

/// Text produced by the engine and the tokens it consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub token_cost: u64,
}

/// Reentrant language model shared by every resolution.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<Generation, CollaboratorError>;
}
