use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::answer::FinalAnswer;
use super::budget::Cost;
use super::features::FeatureVector;
use super::gating::GatingDecision;
use super::query::{Language, Query};
use super::trace::ExecutionTrace;

/// Everything one query resolution produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub query: Query,
    pub features: FeatureVector,
    pub decision: GatingDecision,
    pub trace: ExecutionTrace,
    pub final_answer: FinalAnswer,
    /// Total latency and tokens reserved from the budget.
    pub consumed: Cost,
}

/// Row handed to the label store for later human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub query_id: Uuid,
    pub query_text: String,
    pub language: Language,
    pub outcome: String,
    pub final_action: Option<String>,
    pub escalation_reason: Option<String>,
    pub model_version: String,
    pub attempts: u32,
    pub consumed: Cost,
    pub features: FeatureVector,
    pub decision: GatingDecision,
    pub trace: ExecutionTrace,
    pub final_answer: FinalAnswer,
    pub recorded_at: DateTime<Utc>,
}

impl From<&Resolution> for ResolutionRecord {
    fn from(resolution: &Resolution) -> Self {
        Self {
            query_id: resolution.query.id(),
            query_text: resolution.query.text().to_string(),
            language: resolution.features.language,
            outcome: resolution.final_answer.outcome().to_string(),
            final_action: resolution
                .final_answer
                .accepted_action()
                .map(|action| action.to_string()),
            escalation_reason: resolution
                .final_answer
                .escalation_reason()
                .map(|reason| reason.code().to_string()),
            model_version: resolution.decision.model_version().to_string(),
            attempts: u32::try_from(resolution.trace.attempts()).unwrap_or(u32::MAX),
            consumed: resolution.consumed,
            features: resolution.features.clone(),
            decision: resolution.decision.clone(),
            trace: resolution.trace.clone(),
            final_answer: resolution.final_answer.clone(),
            recorded_at: Utc::now(),
        }
    }
}
