//! Domain errors for the Janus answering loop.
//!
//! Only [`DomainError`] ever reaches a caller of the answer service. Budget
//! exhaustion, executor failures and an unreachable scorer are recoverable
//! and are resolved inside the orchestrator into an escalation.

use thiserror::Error;

use super::models::ActionKind;

/// Hard errors that surface to the caller instead of a `FinalAnswer`.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Collaborator contract broken by {collaborator}: {detail}")]
    CollaboratorContract { collaborator: String, detail: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation(detail.into())
    }

    pub fn contract(collaborator: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::CollaboratorContract {
            collaborator: collaborator.into(),
            detail: detail.into(),
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for DomainError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Failure reported by an external collaborator (LM engine, index, scorer).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator timed out")]
    Timeout,

    #[error("collaborator rejected the request: {0}")]
    Rejected(String),

    /// The collaborator answered, but not in the shape its contract promises.
    #[error("malformed collaborator response: {0}")]
    Malformed(String),
}

impl CollaboratorError {
    pub fn is_contract_breach(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Kind of failure reported by the tool runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFailureKind {
    UnknownTool,
    InvalidArguments,
    Unsupported,
    Runtime,
}

/// Failure returned by `ToolRuntime::run`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("tool failure ({kind:?}): {message}")]
pub struct ToolFailure {
    pub kind: ToolFailureKind,
    pub message: String,
}

impl ToolFailure {
    pub fn new(kind: ToolFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Why a strategy executor could not produce a candidate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorFailureCause {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Tool(#[from] ToolFailure),

    #[error("no usable evidence: {0}")]
    NoEvidence(String),

    #[error("query cannot be handled by this strategy: {0}")]
    NotApplicable(String),
}

/// A rejected strategy attempt. Recoverable unless the cause is a contract breach.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{action} executor failed: {cause}")]
pub struct ExecutorFailure {
    pub action: ActionKind,
    pub cause: ExecutorFailureCause,
}

impl ExecutorFailure {
    pub fn new(action: ActionKind, cause: impl Into<ExecutorFailureCause>) -> Self {
        Self {
            action,
            cause: cause.into(),
        }
    }

    pub fn is_contract_breach(&self) -> bool {
        matches!(&self.cause, ExecutorFailureCause::Collaborator(err) if err.is_contract_breach())
    }

    /// Convert a contract breach into the hard error the caller will see.
    pub fn into_contract_error(self) -> DomainError {
        DomainError::contract(format!("{} executor", self.action), self.cause.to_string())
    }
}
