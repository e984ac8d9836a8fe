//! Gating model implementations
//!
//! - `HeuristicGatingModel`: built-in hand-set logits
//! - `LinearGatingModel`: trained softmax weights loaded from JSON

pub mod heuristic;
pub mod linear;

pub use heuristic::HeuristicGatingModel;
pub use linear::{GatingModelError, LinearGatingModel};

/// Numerically stable softmax.
pub(crate) fn softmax_slice(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    if total > 0.0 && total.is_finite() {
        exps.into_iter().map(|e| e / total).collect()
    } else {
        vec![1.0 / logits.len().max(1) as f64; logits.len()]
    }
}

pub(crate) fn softmax<const N: usize>(logits: [f64; N]) -> [f64; N] {
    let mut out = [0.0; N];
    for (slot, p) in out.iter_mut().zip(softmax_slice(&logits)) {
        *slot = p;
    }
    out
}
