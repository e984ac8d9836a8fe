use async_trait::async_trait;

use super::{aborted, StrategyExecutor};
use crate::domain::errors::ExecutorFailure;
use crate::domain::models::{ActionKind, CandidateAnswer, Config, Cost, FeatureVector, Query};
use crate::services::budget_controller::ExecutionBudget;
use crate::services::messages;

/// Asks the user to clarify. Costs a fixed small amount and calls no collaborator.
#[derive(Debug, Clone)]
pub struct ClarifyExecutor {
    cost: Cost,
}

impl ClarifyExecutor {
    pub const fn new(config: &Config) -> Self {
        Self {
            cost: config.costs.clarification.cost(),
        }
    }
}

#[async_trait]
impl StrategyExecutor for ClarifyExecutor {
    fn action(&self) -> ActionKind {
        ActionKind::Clarify
    }

    async fn execute(
        &self,
        _query: &Query,
        features: &FeatureVector,
        budget: &ExecutionBudget,
    ) -> Result<CandidateAnswer, ExecutorFailure> {
        if let Err(interruption) = budget.checkpoint(&self.cost) {
            return Ok(aborted(self.action(), interruption, budget));
        }
        Ok(CandidateAnswer::clarification(
            messages::clarification_question(features.language),
            budget.committed(),
        ))
    }
}
