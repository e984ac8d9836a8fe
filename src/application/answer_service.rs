//! The answering service boundary.
//!
//! Accepts a request, builds the [`Query`] and its budget, runs the
//! orchestrator and hands the completed resolution to the label store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

use super::orchestrator::Orchestrator;
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    BudgetConfig, Config, FinalAnswer, FreshnessRequirement, Language, Query, QueryMetadata,
    Resolution, ResolutionRecord,
};
use crate::domain::ports::LabelStore;
use crate::services::budget_controller::BudgetController;

/// One incoming question with its optional constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub text: String,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub max_staleness_days: Option<u32>,
    /// Absolute deadline; the configured relative deadline still applies.
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: QueryMetadata,
    #[serde(default)]
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub tokens: Option<u64>,
}

impl AnswerRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn into_query(self) -> Query {
        let mut query = Query::new(self.text).with_metadata(self.metadata);
        if let Some(language) = self.language {
            query = query.with_language(language);
        }
        if let Some(days) = self.max_staleness_days {
            query = query.with_freshness(FreshnessRequirement::days(days));
        }
        if let Some(deadline) = self.deadline {
            query = query.with_deadline(deadline);
        }
        query
    }
}

/// Budget for `query`: request overrides, else configured defaults. The
/// deadline is the earlier of the query's own and arrival plus the default.
pub fn budget_for(
    query: &Query,
    defaults: &BudgetConfig,
    latency_ms: Option<u64>,
    tokens: Option<u64>,
) -> BudgetController {
    let latency = latency_ms.map_or_else(|| defaults.latency(), Duration::from_millis);
    let tokens = tokens.unwrap_or(defaults.tokens);
    let configured = query
        .arrived_at()
        .checked_add_signed(defaults.deadline())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let deadline = query
        .deadline()
        .map_or(configured, |requested| requested.min(configured));
    BudgetController::new(latency, tokens, deadline)
}

#[derive(Clone)]
pub struct AnswerService {
    orchestrator: Orchestrator,
    labels: Arc<dyn LabelStore>,
    budget: BudgetConfig,
}

impl AnswerService {
    pub fn new(orchestrator: Orchestrator, labels: Arc<dyn LabelStore>, config: &Config) -> Self {
        Self {
            orchestrator,
            labels,
            budget: config.budget.clone(),
        }
    }

    /// Resolve a request and keep the full record of how it was resolved.
    #[instrument(skip_all, fields(chars = request.text.chars().count()))]
    pub async fn resolve(&self, request: AnswerRequest) -> DomainResult<Resolution> {
        let (latency_ms, tokens) = (request.latency_ms, request.tokens);
        let query = request.into_query();
        let budget = budget_for(&query, &self.budget, latency_ms, tokens);

        let resolution = self.orchestrator.resolve(&query, budget).await?;

        if let Err(err) = self
            .labels
            .record(&ResolutionRecord::from(&resolution))
            .await
        {
            warn!(query_id = %query.id(), error = %err, "Failed to record resolution");
        }
        Ok(resolution)
    }

    /// Resolve a request to its final answer.
    pub async fn answer(&self, request: AnswerRequest) -> DomainResult<FinalAnswer> {
        Ok(self.resolve(request).await?.final_answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builds_query() {
        let request = AnswerRequest {
            language: Some(Language::Es),
            max_staleness_days: Some(3),
            ..AnswerRequest::new("¿Qué hora es?")
        };
        let query = request.into_query();
        assert_eq!(query.text(), "¿Qué hora es?");
        assert_eq!(query.declared_language(), Some(Language::Es));
        assert_eq!(query.freshness(), Some(FreshnessRequirement::days(3)));
    }

    #[test]
    fn test_budget_uses_earlier_deadline() {
        let defaults = BudgetConfig::default();
        let soon = Utc::now() + chrono::Duration::milliseconds(500);
        let query = Query::new("q").with_deadline(soon);
        let budget = budget_for(&query, &defaults, Some(1000), None);
        assert_eq!(budget.deadline(), soon);
        assert_eq!(budget.remaining(), (Duration::from_millis(1000), defaults.tokens));

        let query = Query::new("q");
        let budget = budget_for(&query, &defaults, None, Some(64));
        assert_eq!(budget.deadline(), query.arrived_at() + defaults.deadline());
        assert_eq!(budget.remaining().1, 64);
    }
}
