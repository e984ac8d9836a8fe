use crate::domain::models::{ActionKind, FeatureVector};
use crate::domain::ports::GatingModel;

use super::softmax;

/// Built-in gating model used when no trained weights are configured.
///
/// Hand-set logits over the extracted signals, normalised with a softmax.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicGatingModel;

impl HeuristicGatingModel {
    pub const VERSION: &'static str = "heuristic-v1";

    pub const fn new() -> Self {
        Self
    }

    fn logits(features: &FeatureVector) -> [f64; ActionKind::ALL.len()] {
        let confidence = features.internal_confidence;
        let need = features.freshness_need;
        let ambiguity = features.ambiguity;
        let entities = f64::from(features.entity_count.min(5)) / 5.0;

        let mut logits = [0.0; ActionKind::ALL.len()];
        logits[ActionKind::Parametric.index()] = 2.0 * confidence - 1.5 * need - ambiguity;
        logits[ActionKind::Retrieve.index()] =
            2.0 * need + (1.0 - confidence) + 0.3 * entities - 0.5 * ambiguity;
        logits[ActionKind::Compute.index()] = if features.needs_computation { 3.0 } else { -2.0 };
        logits[ActionKind::Clarify.index()] =
            2.5 * ambiguity - 1.0 + if features.degraded { 1.0 } else { 0.0 };
        logits[ActionKind::Escalate.index()] = 1.5 * features.risk * (1.0 - confidence) - 1.0;
        logits
    }
}

impl GatingModel for HeuristicGatingModel {
    fn version(&self) -> &str {
        Self::VERSION
    }

    fn score(&self, features: &FeatureVector) -> [f64; ActionKind::ALL.len()] {
        softmax(Self::logits(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Language, Volatility};

    fn base() -> FeatureVector {
        FeatureVector {
            language: Language::En,
            entity_count: 1,
            has_time_expression: false,
            ambiguity: 0.1,
            breaking_news: 0.0,
            freshness_need: 0.2,
            internal_confidence: 0.7,
            needs_computation: false,
            volatility: Volatility::Slow,
            staleness_horizon_days: 180.0,
            max_staleness_days: None,
            risk: 0.0,
            domain: 0.0,
            degraded: false,
        }
    }

    fn argmax(scores: [f64; 5]) -> ActionKind {
        ActionKind::ALL
            .into_iter()
            .max_by(|a, b| scores[a.index()].total_cmp(&scores[b.index()]))
            .unwrap_or(ActionKind::Escalate)
    }

    #[test]
    fn test_scores_form_distribution() {
        let scores = HeuristicGatingModel.score(&base());
        let total: f64 = scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(scores.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_confident_timeless_query_prefers_parametric() {
        assert_eq!(argmax(HeuristicGatingModel.score(&base())), ActionKind::Parametric);
    }

    #[test]
    fn test_fresh_low_confidence_query_prefers_retrieve() {
        let mut features = base();
        features.freshness_need = 0.9;
        features.internal_confidence = 0.2;
        features.entity_count = 3;
        assert_eq!(argmax(HeuristicGatingModel.score(&features)), ActionKind::Retrieve);
    }

    #[test]
    fn test_arithmetic_prefers_compute() {
        let mut features = base();
        features.needs_computation = true;
        assert_eq!(argmax(HeuristicGatingModel.score(&features)), ActionKind::Compute);
    }
}
