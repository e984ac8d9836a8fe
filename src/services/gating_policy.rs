//! Budget-aware gating policy.
//!
//! Wraps a versioned [`GatingModel`] and turns its scores into a ranked
//! [`GatingDecision`]. The policy adds three rules on top of the model:
//! actions whose minimum cost no longer fits the budget are dropped (and if
//! nothing but escalation is left, escalation is forced to the top), degraded
//! feature vectors have their answer confidences scaled down, and ambiguity
//! above the configured threshold promotes `Clarify` to the top.

use std::sync::Arc;

use crate::domain::models::{
    ActionKind, BudgetSnapshot, Cost, CostsConfig, FeatureVector, GatingConfig, GatingDecision,
    RankedAction, RationaleTag,
};
use crate::domain::ports::GatingModel;

#[derive(Clone)]
pub struct GatingPolicy {
    model: Arc<dyn GatingModel>,
    gating: GatingConfig,
    costs: CostsConfig,
}

impl std::fmt::Debug for GatingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatingPolicy")
            .field("model_version", &self.model.version())
            .field("gating", &self.gating)
            .finish_non_exhaustive()
    }
}

impl GatingPolicy {
    pub fn new(model: Arc<dyn GatingModel>, gating: GatingConfig, costs: CostsConfig) -> Self {
        Self {
            model,
            gating,
            costs,
        }
    }

    pub fn model_version(&self) -> &str {
        self.model.version()
    }

    /// Cheapest run of `action`, dispatch included.
    pub fn minimum_cost(&self, action: ActionKind) -> Cost {
        if action == ActionKind::Escalate {
            return Cost::ZERO;
        }
        self.costs
            .minimum_for(action)
            .saturating_add(self.costs.dispatch.cost())
    }

    /// Whether the cheapest run of `action` fits `budget`.
    pub fn affordable(&self, action: ActionKind, budget: &BudgetSnapshot) -> bool {
        action == ActionKind::Escalate || budget.covers(&self.minimum_cost(action))
    }

    /// Rank candidate actions for `features` under `budget`.
    ///
    /// Deterministic for a fixed model version and input.
    pub fn decide(&self, features: &FeatureVector, budget: &BudgetSnapshot) -> GatingDecision {
        let version = self.model.version();

        let any_affordable = ActionKind::ALL
            .iter()
            .any(|&action| action != ActionKind::Escalate && self.affordable(action, budget));
        if !any_affordable {
            tracing::info!(
                model_version = version,
                remaining_tokens = budget.remaining_tokens,
                remaining_latency_ms = budget.remaining_latency.as_millis() as u64,
                expired = budget.expired,
                "No action fits the remaining budget; escalating"
            );
            return GatingDecision::budget_escalation(version);
        }

        let scores = self.model.score(features);
        let clarify_forced = features.ambiguity > self.gating.clarify_ambiguity_threshold;

        let candidates = ActionKind::ALL
            .iter()
            .filter(|&&action| self.affordable(action, budget))
            .map(|&action| {
                let score = scores[action.index()];
                let score = if score.is_finite() { score } else { 0.0 };
                match action {
                    ActionKind::Clarify if clarify_forced => {
                        RankedAction::new(action, 1.0, RationaleTag::AmbiguityOverride)
                    }
                    _ if features.degraded && action.produces_answer() => RankedAction::new(
                        action,
                        score * self.gating.degraded_confidence_factor,
                        RationaleTag::DegradedFeatures,
                    ),
                    _ => RankedAction::new(action, score, RationaleTag::ModelScore),
                }
            })
            .collect();

        let decision = GatingDecision::ranked(candidates, version);
        if let Some(top) = decision.top() {
            tracing::debug!(
                model_version = version,
                top_action = %top.action,
                confidence = top.confidence,
                candidates = decision.len(),
                degraded = features.degraded,
                "Gating decision made"
            );
        }
        decision
    }
}
