//! Strategy executors.
//!
//! One executor per answer-producing action plus the clarification executor.
//! [`ExecutorSet`] dispatches on [`ActionKind`] with an exhaustive `match`;
//! escalation is handled there directly since it calls nothing.
//!
//! Every executor gates external work through
//! [`ExecutionBudget::checkpoint`]. A refused checkpoint yields an aborted
//! candidate rather than a partial answer.

pub mod clarify;
pub mod compute;
pub mod parametric;
pub mod retrieval;

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::errors::ExecutorFailure;
use crate::domain::models::{
    ActionKind, CandidateAnswer, Config, EscalationReason, FeatureVector, FinalAnswer, Interruption,
    Query,
};
use crate::domain::ports::{LanguageModel, RetrievalIndex, ToolRuntime};
use crate::services::budget_controller::ExecutionBudget;
use crate::services::messages;

pub use clarify::ClarifyExecutor;
pub use compute::ComputeExecutor;
pub use parametric::ParametricExecutor;
pub use retrieval::RetrievalExecutor;

/// Shared capability of every executor.
#[async_trait]
pub trait StrategyExecutor: Send + Sync {
    fn action(&self) -> ActionKind;

    async fn execute(
        &self,
        query: &Query,
        features: &FeatureVector,
        budget: &ExecutionBudget,
    ) -> Result<CandidateAnswer, ExecutorFailure>;
}

/// Candidate produced by one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Candidate(CandidateAnswer),
    /// Escalation needs no collaborator and ends the resolution directly.
    Abstention(FinalAnswer),
}

/// Build the aborted candidate for a refused checkpoint.
pub(crate) fn aborted(
    action: ActionKind,
    interruption: Interruption,
    budget: &ExecutionBudget,
) -> CandidateAnswer {
    tracing::debug!(%action, %interruption, "Executor stopped at reservation checkpoint");
    CandidateAnswer::aborted(action, interruption, budget.committed())
}

/// The closed set of executors, one per action.
#[derive(Clone)]
pub struct ExecutorSet {
    parametric: ParametricExecutor,
    retrieval: RetrievalExecutor,
    compute: ComputeExecutor,
    clarify: ClarifyExecutor,
}

impl ExecutorSet {
    pub fn new(
        lm: Arc<dyn LanguageModel>,
        index: Arc<dyn RetrievalIndex>,
        tools: Arc<dyn ToolRuntime>,
        config: &Config,
    ) -> Self {
        Self {
            parametric: ParametricExecutor::new(Arc::clone(&lm), config),
            retrieval: RetrievalExecutor::new(index, lm, config),
            compute: ComputeExecutor::new(tools, config),
            clarify: ClarifyExecutor::new(config),
        }
    }

    pub async fn execute(
        &self,
        action: ActionKind,
        query: &Query,
        features: &FeatureVector,
        budget: &ExecutionBudget,
    ) -> Result<ExecutionOutcome, ExecutorFailure> {
        let candidate = match action {
            ActionKind::Parametric => self.parametric.execute(query, features, budget).await?,
            ActionKind::Retrieve => self.retrieval.execute(query, features, budget).await?,
            ActionKind::Compute => self.compute.execute(query, features, budget).await?,
            ActionKind::Clarify => self.clarify.execute(query, features, budget).await?,
            ActionKind::Escalate => {
                return Ok(ExecutionOutcome::Abstention(FinalAnswer::escalated(
                    EscalationReason::PolicyEscalation,
                    messages::escalation_message(
                        features.language,
                        EscalationReason::PolicyEscalation,
                    ),
                )));
            }
        };
        Ok(ExecutionOutcome::Candidate(candidate))
    }
}
