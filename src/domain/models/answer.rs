use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::action::ActionKind;
use super::budget::{Cost, Interruption};
use super::query::Language;

/// A passage returned by the retrieval index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidencePassage {
    pub document_id: String,
    pub span: String,
    pub score: f64,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// A source the answer relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source_id: String,
    pub span: String,
    pub confidence: f64,
}

impl From<&EvidencePassage> for Citation {
    fn from(passage: &EvidencePassage) -> Self {
        Self {
            source_id: passage.document_id.clone(),
            span: passage.span.clone(),
            confidence: if passage.score.is_finite() {
                passage.score.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }
}

/// What an executor produced. Answer text and a clarification request are
/// mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerBody {
    Text(String),
    Clarification(String),
    /// Stopped at a reservation checkpoint; no partial text is kept.
    Aborted(Interruption),
}

/// Output of one strategy executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAnswer {
    pub action: ActionKind,
    pub body: AnswerBody,
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Passages handed to the scorer; empty for non-retrieval answers.
    #[serde(default)]
    pub evidence: Vec<EvidencePassage>,
    pub cost: Cost,
}

impl CandidateAnswer {
    pub fn text(action: ActionKind, text: impl Into<String>, cost: Cost) -> Self {
        Self {
            action,
            body: AnswerBody::Text(text.into()),
            citations: Vec::new(),
            evidence: Vec::new(),
            cost,
        }
    }

    pub fn clarification(question: impl Into<String>, cost: Cost) -> Self {
        Self {
            action: ActionKind::Clarify,
            body: AnswerBody::Clarification(question.into()),
            citations: Vec::new(),
            evidence: Vec::new(),
            cost,
        }
    }

    pub const fn aborted(action: ActionKind, interruption: Interruption, cost: Cost) -> Self {
        Self {
            action,
            body: AnswerBody::Aborted(interruption),
            citations: Vec::new(),
            evidence: Vec::new(),
            cost,
        }
    }

    #[must_use]
    pub fn with_citations(mut self, citations: Vec<Citation>, evidence: Vec<EvidencePassage>) -> Self {
        self.citations = citations;
        self.evidence = evidence;
        self
    }

    pub const fn is_clarification(&self) -> bool {
        matches!(self.body, AnswerBody::Clarification(_))
    }

    pub const fn is_aborted(&self) -> bool {
        matches!(self.body, AnswerBody::Aborted(_))
    }

    pub const fn interruption(&self) -> Option<Interruption> {
        match self.body {
            AnswerBody::Aborted(interruption) => Some(interruption),
            _ => None,
        }
    }

    /// Answer or clarification text; `None` when aborted.
    pub fn body_text(&self) -> Option<&str> {
        match &self.body {
            AnswerBody::Text(text) | AnswerBody::Clarification(text) => Some(text),
            AnswerBody::Aborted(_) => None,
        }
    }
}

/// Scores returned by the truthfulness/citation scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub truthfulness: f64,
    pub citation_precision: f64,
    #[serde(default)]
    pub unsupported_claims: BTreeSet<String>,
}

impl VerificationResult {
    pub fn new(truthfulness: f64, citation_precision: f64) -> Self {
        Self {
            truthfulness,
            citation_precision,
            unsupported_claims: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_unsupported_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unsupported_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    /// Both scores are finite and within `[0, 1]`.
    pub fn is_well_formed(&self) -> bool {
        let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        in_range(self.truthfulness) && in_range(self.citation_precision)
    }
}

/// Reason code attached to every escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    BudgetExhausted,
    DeadlineExpired,
    VerificationUnavailable,
    VerificationFailed,
    ExecutorFailure,
    /// The gating policy ranked escalation first.
    PolicyEscalation,
}

impl EscalationReason {
    pub const fn code(self) -> &'static str {
        match self {
            Self::BudgetExhausted => "budget_exhausted",
            Self::DeadlineExpired => "deadline_expired",
            Self::VerificationUnavailable => "verification_unavailable",
            Self::VerificationFailed => "verification_failed",
            Self::ExecutorFailure => "executor_failure",
            Self::PolicyEscalation => "policy_escalation",
        }
    }

    /// Human-readable explanation shown to the user.
    pub const fn describe(self) -> &'static str {
        match self {
            Self::BudgetExhausted => {
                "The request ran out of its time or token allowance before a verified answer was found."
            }
            Self::DeadlineExpired => "The request deadline passed before a verified answer was found.",
            Self::VerificationUnavailable => {
                "The answer could not be checked for accuracy, so it was withheld."
            }
            Self::VerificationFailed => {
                "No candidate answer passed the accuracy and citation checks."
            }
            Self::ExecutorFailure => "Every answering strategy tried for this request failed.",
            Self::PolicyEscalation => "This request needs human or higher-tier review.",
        }
    }
}

impl From<Interruption> for EscalationReason {
    fn from(interruption: Interruption) -> Self {
        match interruption {
            Interruption::DeadlineExpired => Self::DeadlineExpired,
            Interruption::BudgetExhausted | Interruption::Cancelled => Self::BudgetExhausted,
        }
    }
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Terminal artifact of a resolution. Exactly one variant per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FinalAnswer {
    Accepted {
        answer: CandidateAnswer,
        /// `None` only for actions configured as exempt from verification.
        verification: Option<VerificationResult>,
    },
    Clarification {
        question: String,
        language: Language,
    },
    Escalated {
        reason: EscalationReason,
        message: String,
    },
}

impl FinalAnswer {
    pub fn escalated(reason: EscalationReason, message: impl Into<String>) -> Self {
        Self::Escalated {
            reason,
            message: message.into(),
        }
    }

    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Clarification { .. } => "clarification",
            Self::Escalated { .. } => "escalated",
        }
    }

    /// Action that produced an accepted answer.
    pub const fn accepted_action(&self) -> Option<ActionKind> {
        match self {
            Self::Accepted { answer, .. } => Some(answer.action),
            _ => None,
        }
    }

    pub const fn escalation_reason(&self) -> Option<EscalationReason> {
        match self {
            Self::Escalated { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub const fn is_clarification(&self) -> bool {
        matches!(self, Self::Clarification { .. })
    }

    pub const fn is_escalated(&self) -> bool {
        matches!(self, Self::Escalated { .. })
    }

    /// Text shown to the user, whichever variant this is.
    pub fn display_text(&self) -> &str {
        match self {
            Self::Accepted { answer, .. } => answer.body_text().unwrap_or_default(),
            Self::Clarification { question, .. } => question,
            Self::Escalated { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_variants_are_exclusive() {
        let answer = CandidateAnswer::text(ActionKind::Parametric, "Paris", Cost::ZERO);
        assert!(!answer.is_clarification());
        assert!(!answer.is_aborted());
        assert_eq!(answer.body_text(), Some("Paris"));

        let question = CandidateAnswer::clarification("Which Paris?", Cost::ZERO);
        assert!(question.is_clarification());
        assert_eq!(question.action, ActionKind::Clarify);

        let aborted =
            CandidateAnswer::aborted(ActionKind::Retrieve, Interruption::BudgetExhausted, Cost::ZERO);
        assert!(aborted.is_aborted());
        assert_eq!(aborted.body_text(), None);
        assert_eq!(aborted.interruption(), Some(Interruption::BudgetExhausted));
    }

    #[test]
    fn test_citation_from_passage_clamps_score() {
        let passage = EvidencePassage {
            document_id: "doc-1".into(),
            span: "Paris is the capital".into(),
            score: 3.2,
            published_at: None,
        };
        let citation = Citation::from(&passage);
        assert_eq!(citation.source_id, "doc-1");
        assert!((citation.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_verification_well_formed() {
        assert!(VerificationResult::new(0.9, 0.0).is_well_formed());
        assert!(!VerificationResult::new(1.2, 0.5).is_well_formed());
        assert!(!VerificationResult::new(f64::NAN, 0.5).is_well_formed());
    }

    #[test]
    fn test_final_answer_serialization_is_tagged() {
        let answer = FinalAnswer::escalated(
            EscalationReason::BudgetExhausted,
            EscalationReason::BudgetExhausted.describe(),
        );
        let json = serde_json::to_value(&answer).expect("serialize");
        assert_eq!(json["outcome"], "escalated");
        assert_eq!(json["reason"], "budget_exhausted");
    }
}
