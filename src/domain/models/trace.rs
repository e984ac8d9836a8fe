//! Append-only provenance log of one query resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use super::action::ActionKind;
use super::answer::{EscalationReason, VerificationResult};
use super::budget::{Cost, Interruption};
use crate::domain::errors::{DomainError, DomainResult};

/// States of the orchestration state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Init,
    Gated,
    Executing,
    Verifying,
    Accepted,
    Retrying,
    Escalated,
    Done,
}

impl ResolutionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Gated => "gated",
            Self::Executing => "executing",
            Self::Verifying => "verifying",
            Self::Accepted => "accepted",
            Self::Retrying => "retrying",
            Self::Escalated => "escalated",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one attempted action, or how the resolution ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Candidate passed verification (or was exempt) and became the answer.
    Accepted,
    /// Candidate scored below the acceptance thresholds.
    Rejected,
    /// A clarification question was returned to the user.
    Clarified,
    /// The executor reported a collaborator or tool failure.
    ExecutorFailed { detail: String },
    /// The executor stopped at a reservation checkpoint.
    Aborted { interruption: Interruption },
    /// Verification could not be afforded.
    VerificationSkipped { interruption: Interruption },
    /// The scorer could not be reached.
    VerificationUnavailable { detail: String },
    /// A speculative sibling was accepted first; this result was discarded.
    Superseded,
    /// Terminal escalation record.
    Escalated { reason: EscalationReason },
}

impl AttemptOutcome {
    /// Whether this record ends the resolution.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Clarified | Self::Escalated { .. })
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Clarified => "clarified",
            Self::ExecutorFailed { .. } => "executor_failed",
            Self::Aborted { .. } => "aborted",
            Self::VerificationSkipped { .. } => "verification_skipped",
            Self::VerificationUnavailable { .. } => "verification_unavailable",
            Self::Superseded => "superseded",
            Self::Escalated { .. } => "escalated",
        }
    }
}

/// One record of the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub sequence: u32,
    pub action: ActionKind,
    pub outcome: AttemptOutcome,
    pub cost: Cost,
    pub verification: Option<VerificationResult>,
    pub recorded_at: DateTime<Utc>,
}

impl TraceEntry {
    /// Whether this record stands for an executor invocation.
    pub const fn is_attempt(&self) -> bool {
        !matches!(self.outcome, AttemptOutcome::Escalated { .. })
    }
}

/// Ordered, append-only record of a resolution.
///
/// Entries can be added but never edited or removed; after
/// [`finalize`](Self::finalize) no more can be added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    query_id: Uuid,
    entries: Vec<TraceEntry>,
    finalized: bool,
}

impl ExecutionTrace {
    pub const fn new(query_id: Uuid) -> Self {
        Self {
            query_id,
            entries: Vec::new(),
            finalized: false,
        }
    }

    pub fn append(
        &mut self,
        action: ActionKind,
        outcome: AttemptOutcome,
        cost: Cost,
        verification: Option<VerificationResult>,
    ) -> DomainResult<()> {
        if self.finalized {
            return Err(DomainError::invariant(format!(
                "trace for query {} is finalized; cannot append {} {}",
                self.query_id,
                action,
                outcome.label()
            )));
        }
        let sequence = u32::try_from(self.entries.len())
            .map_err(|_| DomainError::invariant("trace length overflow"))?;
        self.entries.push(TraceEntry {
            sequence,
            action,
            outcome,
            cost,
            verification,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    /// Close the trace. A trace must hold exactly one terminal record.
    pub fn finalize(&mut self) -> DomainResult<()> {
        if self.finalized {
            return Err(DomainError::invariant("trace finalized twice"));
        }
        let terminal = self.entries.iter().filter(|e| e.outcome.is_terminal()).count();
        if terminal != 1 {
            return Err(DomainError::invariant(format!(
                "trace for query {} has {terminal} terminal records",
                self.query_id
            )));
        }
        self.finalized = true;
        Ok(())
    }

    pub const fn query_id(&self) -> Uuid {
        self.query_id
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of executor invocations recorded.
    pub fn attempts(&self) -> usize {
        self.entries.iter().filter(|e| e.is_attempt()).count()
    }

    /// Distinct actions that reached an executor.
    pub fn attempted_actions(&self) -> BTreeSet<ActionKind> {
        self.entries
            .iter()
            .filter(|e| e.is_attempt())
            .map(|e| e.action)
            .collect()
    }

    pub fn last(&self) -> Option<&TraceEntry> {
        self.entries.last()
    }
}
