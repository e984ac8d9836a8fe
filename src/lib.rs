//! Janus - budget-aware gating and orchestration for grounded answers
//!
//! Janus decides, per question, whether to answer from the language model's
//! own knowledge, retrieve evidence first, run a computation, ask the user to
//! clarify, or hand off to a human. It then executes that choice under a
//! latency and token budget, verifies the candidate, and retries or escalates
//! when verification fails.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models, errors and collaborator ports
//! - **Service Layer** (`services`): Feature extraction, budgeting, gating,
//!   strategy executors, verification and policy evaluation
//! - **Application Layer** (`application`): The orchestrator state machine and
//!   the answering service boundary
//! - **Infrastructure Layer** (`infrastructure`): Config, logging, gating
//!   models, HTTP collaborators, the arithmetic tool and the `SQLite` label store
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use janus::application::AnswerRequest;
//! use janus::infrastructure::{config::ConfigLoader, setup::build_answer_service};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let (service, _db) = build_answer_service(&config).await?;
//!     let answer = service.answer(AnswerRequest::new("What is 12 * 7?")).await?;
//!     println!("{}", answer.display_text());
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{AnswerRequest, AnswerService, Orchestrator};
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    ActionKind, Config, EscalationReason, FeatureVector, FinalAnswer, GatingDecision, Language,
    Query, Resolution,
};
pub use domain::ports::{
    GatingModel, LabelStore, LanguageModel, RetrievalIndex, ToolRuntime, TruthScorer,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{BudgetController, FeatureExtractor, GatingPolicy};
