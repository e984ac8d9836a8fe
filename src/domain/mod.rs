//! Domain layer for the Janus answering loop
//!
//! Core models, collaborator ports and the error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{
    CollaboratorError, DomainError, DomainResult, ExecutorFailure, ExecutorFailureCause,
    ToolFailure, ToolFailureKind,
};
