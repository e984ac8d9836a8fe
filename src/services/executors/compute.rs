use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::{aborted, StrategyExecutor};
use crate::domain::errors::{ExecutorFailure, ExecutorFailureCause};
use crate::domain::models::{ActionKind, CandidateAnswer, Config, Cost, FeatureVector, Query};
use crate::domain::ports::ToolRuntime;
use crate::services::budget_controller::ExecutionBudget;

/// Tool invoked for arithmetic queries.
pub const CALCULATOR_TOOL: &str = "calculator";

static EXPRESSION_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d.\s()+\-*/^×÷]+").expect("valid regex"));

/// Pull the longest arithmetic-looking span out of free text.
pub fn extract_expression(text: &str) -> Option<String> {
    EXPRESSION_RUN
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|span| {
            span.chars().any(|c| c.is_ascii_digit())
                && span
                    .trim_start_matches('-')
                    .chars()
                    .any(|c| matches!(c, '+' | '-' | '*' | '/' | '^' | '×' | '÷'))
        })
        .max_by_key(|span| span.len())
        .map(|span| span.trim_end_matches('.').trim().to_string())
}

/// Answers arithmetic queries with the calculator tool.
#[derive(Clone)]
pub struct ComputeExecutor {
    tools: Arc<dyn ToolRuntime>,
    tool_cost: Cost,
}

impl ComputeExecutor {
    pub fn new(tools: Arc<dyn ToolRuntime>, config: &Config) -> Self {
        Self {
            tools,
            tool_cost: config.costs.tool.cost(),
        }
    }
}

#[async_trait]
impl StrategyExecutor for ComputeExecutor {
    fn action(&self) -> ActionKind {
        ActionKind::Compute
    }

    async fn execute(
        &self,
        query: &Query,
        _features: &FeatureVector,
        budget: &ExecutionBudget,
    ) -> Result<CandidateAnswer, ExecutorFailure> {
        let Some(expression) = extract_expression(query.text()) else {
            return Err(ExecutorFailure::new(
                self.action(),
                ExecutorFailureCause::NotApplicable("no arithmetic expression found".to_string()),
            ));
        };

        if let Err(interruption) = budget.checkpoint(&self.tool_cost) {
            return Ok(aborted(self.action(), interruption, budget));
        }

        let output = self
            .tools
            .run(
                CALCULATOR_TOOL,
                &serde_json::json!({ "expression": expression }),
            )
            .await
            .map_err(|failure| ExecutorFailure::new(self.action(), failure))?;

        tracing::debug!(
            query_id = %query.id(),
            expression = %expression,
            result = %output.rendered,
            "Computation finished"
        );
        Ok(CandidateAnswer::text(
            self.action(),
            format!("{expression} = {}", output.rendered),
            budget.committed(),
        ))
    }
}
