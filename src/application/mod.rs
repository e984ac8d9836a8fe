pub mod answer_service;
pub mod orchestrator;

pub use answer_service::{budget_for, AnswerRequest, AnswerService};
pub use orchestrator::Orchestrator;
