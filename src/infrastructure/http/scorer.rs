use async_trait::async_trait;
use serde::Serialize;

use super::client::CollaboratorClient;
use crate::domain::errors::CollaboratorError;
use crate::domain::models::{Citation, EvidencePassage, VerificationResult};
use crate::domain::ports::TruthScorer;

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    text: &'a str,
    citations: &'a [Citation],
    evidence: &'a [EvidencePassage],
}

/// Truth scorer reached over `POST {base}/score`.
///
/// The reply is decoded straight into a [`VerificationResult`]; range checks
/// happen in the verifier.
#[derive(Debug, Clone)]
pub struct HttpTruthScorer {
    client: CollaboratorClient,
}

impl HttpTruthScorer {
    pub const fn new(client: CollaboratorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TruthScorer for HttpTruthScorer {
    async fn score(
        &self,
        candidate_text: &str,
        citations: &[Citation],
        evidence: &[EvidencePassage],
    ) -> Result<VerificationResult, CollaboratorError> {
        self.client
            .post(
                "/score",
                &ScoreRequest {
                    text: candidate_text,
                    citations,
                    evidence,
                },
            )
            .await
    }
}
