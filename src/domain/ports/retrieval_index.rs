use async_trait::async_trait;

use crate::domain::errors::CollaboratorError;
use crate::domain::models::{EvidencePassage, Language};

/// Document search backend. Results come back best-first.
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    async fn search(
        &self,
        query: &str,
        language: Language,
        k: usize,
    ) -> Result<Vec<EvidencePassage>, CollaboratorError>;
}
