use crate::domain::models::{ActionKind, FeatureVector};

/// Versioned scoring model behind the gating policy.
///
/// Implementations must be deterministic for a fixed version: the same
/// feature vector always yields the same scores.
pub trait GatingModel: Send + Sync {
    /// Identifier recorded with every decision.
    fn version(&self) -> &str;

    /// Probability per action, indexed by [`ActionKind::index`].
    fn score(&self, features: &FeatureVector) -> [f64; ActionKind::ALL.len()];
}
