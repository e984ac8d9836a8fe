//! Dataset/label store port.
//!
//! Write-only from the orchestrator's point of view: completed resolutions
//! are handed over for later human review and never read back on the
//! answering path.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::ResolutionRecord;

#[async_trait]
pub trait LabelStore: Send + Sync {
    async fn record(&self, record: &ResolutionRecord) -> DomainResult<()>;
}

/// A label store that discards every record.
///
/// Use this when persistence is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLabelStore;

impl NullLabelStore {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LabelStore for NullLabelStore {
    async fn record(&self, _record: &ResolutionRecord) -> DomainResult<()> {
        Ok(())
    }
}
