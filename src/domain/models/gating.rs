use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::action::ActionKind;

/// Why an action sits where it does in a [`GatingDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RationaleTag {
    /// Confidence taken from the gating model.
    ModelScore,
    /// Model confidence scaled down because the features were degraded.
    DegradedFeatures,
    /// Clarify promoted because ambiguity crossed the configured threshold.
    AmbiguityOverride,
    /// No non-escalating action fits the remaining budget.
    BudgetFloor,
}

/// One candidate action with its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedAction {
    pub action: ActionKind,
    pub confidence: f64,
    pub rationale: RationaleTag,
}

impl RankedAction {
    pub fn new(action: ActionKind, confidence: f64, rationale: RationaleTag) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            action,
            confidence,
            rationale,
        }
    }
}

/// Higher confidence first; exact ties fall back to the fixed action priority.
fn rank_order(a: &RankedAction, b: &RankedAction) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.action.tie_break_rank().cmp(&b.action.tie_break_rank()))
}

/// Ranked candidate actions produced once per resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatingDecision {
    entries: Vec<RankedAction>,
    model_version: String,
}

impl GatingDecision {
    /// Rank `candidates`. Duplicate actions keep their highest-ranked entry.
    pub fn ranked(mut candidates: Vec<RankedAction>, model_version: impl Into<String>) -> Self {
        candidates.sort_by(rank_order);
        let mut seen = BTreeSet::new();
        candidates.retain(|entry| seen.insert(entry.action));
        Self {
            entries: candidates,
            model_version: model_version.into(),
        }
    }

    /// A decision whose only option is to escalate for lack of budget.
    pub fn budget_escalation(model_version: impl Into<String>) -> Self {
        Self {
            entries: vec![RankedAction::new(
                ActionKind::Escalate,
                1.0,
                RationaleTag::BudgetFloor,
            )],
            model_version: model_version.into(),
        }
    }

    pub fn top(&self) -> Option<&RankedAction> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[RankedAction] {
        &self.entries
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the top entry is an escalation forced by the budget floor.
    pub fn is_budget_escalation(&self) -> bool {
        self.top()
            .is_some_and(|e| e.action == ActionKind::Escalate && e.rationale == RationaleTag::BudgetFloor)
    }

    /// Highest-ranked action not in `attempted`.
    pub fn next_untried(&self, attempted: &BTreeSet<ActionKind>) -> Option<&RankedAction> {
        self.entries.iter().find(|e| !attempted.contains(&e.action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_by_confidence_then_priority() {
        let decision = GatingDecision::ranked(
            vec![
                RankedAction::new(ActionKind::Compute, 0.3, RationaleTag::ModelScore),
                RankedAction::new(ActionKind::Retrieve, 0.3, RationaleTag::ModelScore),
                RankedAction::new(ActionKind::Escalate, 0.3, RationaleTag::ModelScore),
                RankedAction::new(ActionKind::Clarify, 0.3, RationaleTag::ModelScore),
                RankedAction::new(ActionKind::Parametric, 0.9, RationaleTag::ModelScore),
            ],
            "test",
        );

        let order: Vec<_> = decision.entries().iter().map(|e| e.action).collect();
        assert_eq!(
            order,
            vec![
                ActionKind::Parametric,
                ActionKind::Clarify,
                ActionKind::Retrieve,
                ActionKind::Compute,
                ActionKind::Escalate,
            ]
        );
    }

    #[test]
    fn test_duplicates_keep_best_entry() {
        let decision = GatingDecision::ranked(
            vec![
                RankedAction::new(ActionKind::Retrieve, 0.2, RationaleTag::ModelScore),
                RankedAction::new(ActionKind::Retrieve, 0.8, RationaleTag::ModelScore),
            ],
            "test",
        );
        assert_eq!(decision.len(), 1);
        assert!((decision.entries()[0].confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_next_untried_skips_attempted() {
        let decision = GatingDecision::ranked(
            vec![
                RankedAction::new(ActionKind::Retrieve, 0.7, RationaleTag::ModelScore),
                RankedAction::new(ActionKind::Parametric, 0.2, RationaleTag::ModelScore),
            ],
            "test",
        );
        let attempted = BTreeSet::from([ActionKind::Retrieve]);
        assert_eq!(
            decision.next_untried(&attempted).map(|e| e.action),
            Some(ActionKind::Parametric)
        );
    }

    #[test]
    fn test_confidence_is_clamped() {
        let entry = RankedAction::new(ActionKind::Parametric, f64::NAN, RationaleTag::ModelScore);
        assert!(entry.confidence.abs() < f64::EPSILON);
        let entry = RankedAction::new(ActionKind::Parametric, 1.7, RationaleTag::ModelScore);
        assert!((entry.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_budget_escalation() {
        let decision = GatingDecision::budget_escalation("v1");
        assert!(decision.is_budget_escalation());
        assert_eq!(decision.top().map(|e| e.action), Some(ActionKind::Escalate));
    }
}
