pub mod budget_controller;
pub mod evaluation;
pub mod executors;
pub mod feature_extractor;
pub mod freshness;
pub mod gating_policy;
pub mod messages;
pub mod verifier;

pub use budget_controller::{BudgetController, CancellationFlag, ExecutionBudget};
pub use evaluation::{evaluate_policy, parse_dataset, EvaluationReport, LabelledExample};
pub use executors::{ExecutionOutcome, ExecutorSet, StrategyExecutor};
pub use feature_extractor::FeatureExtractor;
pub use gating_policy::GatingPolicy;
pub use verifier::{VerificationOutcome, VerifierAdapter};
