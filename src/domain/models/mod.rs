pub mod action;
pub mod answer;
pub mod budget;
pub mod config;
pub mod features;
pub mod gating;
pub mod query;
pub mod record;
pub mod trace;

pub use action::ActionKind;
pub use answer::{
    AnswerBody, CandidateAnswer, Citation, EscalationReason, EvidencePassage, FinalAnswer,
    VerificationResult,
};
pub use budget::{Budget, BudgetSnapshot, Cost, Interruption};
pub use config::{
    BudgetConfig, CollaboratorsConfig, Config, CostEstimate, CostsConfig, DatabaseConfig,
    FeaturesConfig, GatingConfig, GenerationConfig, LoggingConfig, OrchestratorConfig,
    RetrievalConfig, SpeculativeConfig, VerificationConfig,
};
pub use features::FeatureVector;
pub use gating::{GatingDecision, RankedAction, RationaleTag};
pub use query::{
    FreshnessRequirement, Language, Query, QueryDomain, QueryMetadata, RiskLevel, Volatility,
};
pub use record::{Resolution, ResolutionRecord};
pub use trace::{AttemptOutcome, ExecutionTrace, ResolutionState, TraceEntry};
