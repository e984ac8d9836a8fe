use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Answering strategy the gating policy can choose. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Answer from the model's internal knowledge.
    Parametric,
    /// Retrieve evidence and generate a cited answer.
    #[serde(alias = "retrieval")]
    Retrieve,
    /// Run a computation tool.
    Compute,
    /// Ask the user a clarifying question.
    Clarify,
    /// Abstain and hand off to a human or higher tier.
    #[serde(alias = "abstain")]
    Escalate,
}

impl ActionKind {
    /// All actions, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Parametric,
        Self::Retrieve,
        Self::Compute,
        Self::Clarify,
        Self::Escalate,
    ];

    /// Position in the tie-break order `Clarify > Parametric > Retrieve > Compute > Escalate`.
    /// Lower ranks first.
    pub const fn tie_break_rank(self) -> u8 {
        match self {
            Self::Clarify => 0,
            Self::Parametric => 1,
            Self::Retrieve => 2,
            Self::Compute => 3,
            Self::Escalate => 4,
        }
    }

    /// Dense index for per-action score arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::Parametric => 0,
            Self::Retrieve => 1,
            Self::Compute => 2,
            Self::Clarify => 3,
            Self::Escalate => 4,
        }
    }

    /// Actions whose executor calls an external collaborator and whose
    /// candidate goes through verification.
    pub const fn produces_answer(self) -> bool {
        matches!(self, Self::Parametric | Self::Retrieve | Self::Compute)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parametric => "parametric",
            Self::Retrieve => "retrieve",
            Self::Compute => "compute",
            Self::Clarify => "clarify",
            Self::Escalate => "escalate",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parametric" => Ok(Self::Parametric),
            "retrieve" | "retrieval" => Ok(Self::Retrieve),
            "compute" => Ok(Self::Compute),
            "clarify" => Ok(Self::Clarify),
            // Labelled datasets use "abstain" for the same terminal handoff.
            "escalate" | "abstain" => Ok(Self::Escalate),
            other => Err(format!("unknown action: {other}")),
        }
    }
}
