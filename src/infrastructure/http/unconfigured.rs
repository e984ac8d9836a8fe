use async_trait::async_trait;

use crate::domain::errors::CollaboratorError;
use crate::domain::models::{Citation, EvidencePassage, Language, VerificationResult};
use crate::domain::ports::{
    Generation, GenerationConstraints, LanguageModel, RetrievalIndex, TruthScorer,
};

/// Stand-in for a collaborator with no configured URL.
///
/// Every call reports the collaborator as unavailable, so the orchestrator
/// treats it like an outage instead of failing at startup.
#[derive(Debug, Clone, Copy)]
pub struct UnconfiguredCollaborator {
    name: &'static str,
}

impl UnconfiguredCollaborator {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    fn unavailable(self) -> CollaboratorError {
        CollaboratorError::Unavailable(format!("no {} URL configured", self.name))
    }
}

#[async_trait]
impl LanguageModel for UnconfiguredCollaborator {
    async fn generate(
        &self,
        _prompt: &str,
        _constraints: &GenerationConstraints,
    ) -> Result<Generation, CollaboratorError> {
        Err(self.unavailable())
    }
}

#[async_trait]
impl RetrievalIndex for UnconfiguredCollaborator {
    async fn search(
        &self,
        _query: &str,
        _language: Language,
        _k: usize,
    ) -> Result<Vec<EvidencePassage>, CollaboratorError> {
        Err(self.unavailable())
    }
}

#[async_trait]
impl TruthScorer for UnconfiguredCollaborator {
    async fn score(
        &self,
        _candidate_text: &str,
        _citations: &[Citation],
        _evidence: &[EvidencePassage],
    ) -> Result<VerificationResult, CollaboratorError> {
        Err(self.unavailable())
    }
}
