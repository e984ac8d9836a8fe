use async_trait::async_trait;
use std::sync::Arc;

use super::{aborted, StrategyExecutor};
use crate::domain::errors::{CollaboratorError, ExecutorFailure};
use crate::domain::models::{
    ActionKind, CandidateAnswer, Config, Cost, FeatureVector, Language, Query,
};
use crate::domain::ports::{Generation, GenerationConstraints, LanguageModel};
use crate::services::budget_controller::ExecutionBudget;

/// Answers from the language model's internal knowledge.
#[derive(Clone)]
pub struct ParametricExecutor {
    lm: Arc<dyn LanguageModel>,
    generation_cost: Cost,
    temperature: f64,
}

impl ParametricExecutor {
    pub fn new(lm: Arc<dyn LanguageModel>, config: &Config) -> Self {
        Self {
            lm,
            generation_cost: config.costs.generation.cost(),
            temperature: config.generation.temperature,
        }
    }
}

fn prompt(query: &Query, language: Language) -> String {
    format!(
        "Answer the question concisely and factually. Reply in language '{language}'. \
         If you are not sure, say so.\n\nQuestion: {}\nAnswer:",
        query.text()
    )
}

/// Call the engine under a token ceiling and check the reply honours it.
pub(crate) async fn generate_within(
    lm: &dyn LanguageModel,
    prompt: &str,
    constraints: &GenerationConstraints,
) -> Result<Generation, CollaboratorError> {
    let generation = lm.generate(prompt, constraints).await?;
    if generation.token_cost > constraints.max_tokens {
        return Err(CollaboratorError::Malformed(format!(
            "generation used {} tokens, ceiling was {}",
            generation.token_cost, constraints.max_tokens
        )));
    }
    if generation.text.trim().is_empty() {
        return Err(CollaboratorError::Rejected("empty generation".to_string()));
    }
    Ok(generation)
}

#[async_trait]
impl StrategyExecutor for ParametricExecutor {
    fn action(&self) -> ActionKind {
        ActionKind::Parametric
    }

    async fn execute(
        &self,
        query: &Query,
        features: &FeatureVector,
        budget: &ExecutionBudget,
    ) -> Result<CandidateAnswer, ExecutorFailure> {
        if let Err(interruption) = budget.checkpoint(&self.generation_cost) {
            return Ok(aborted(self.action(), interruption, budget));
        }

        let constraints = GenerationConstraints {
            max_tokens: self.generation_cost.tokens,
            temperature: self.temperature,
            language: features.language,
        };
        let generation = generate_within(
            self.lm.as_ref(),
            &prompt(query, features.language),
            &constraints,
        )
        .await
        .map_err(|err| ExecutorFailure::new(self.action(), err))?;

        tracing::debug!(
            query_id = %query.id(),
            token_cost = generation.token_cost,
            "Parametric answer generated"
        );
        Ok(CandidateAnswer::text(
            self.action(),
            generation.text.trim(),
            budget.committed(),
        ))
    }
}
