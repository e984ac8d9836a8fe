use async_trait::async_trait;

use crate::domain::errors::CollaboratorError;
use crate::domain::models::{Citation, EvidencePassage, VerificationResult};

/// Truthfulness and citation-precision scorer.
#[async_trait]
pub trait TruthScorer: Send + Sync {
    async fn score(
        &self,
        candidate_text: &str,
        citations: &[Citation],
        evidence: &[EvidencePassage],
    ) -> Result<VerificationResult, CollaboratorError>;
}
