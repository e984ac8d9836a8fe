//! Verifier adapter.
//!
//! Reserves the verification cost, calls the external scorer and checks its
//! reply against the scorer contract. An unreachable scorer is a normal
//! outcome; a reply with scores outside `[0, 1]` is a contract breach.

use std::sync::Arc;

use crate::domain::errors::{CollaboratorError, DomainError, DomainResult};
use crate::domain::models::{
    ActionKind, CandidateAnswer, Cost, Interruption, VerificationConfig, VerificationResult,
};
use crate::domain::ports::TruthScorer;
use crate::services::budget_controller::ExecutionBudget;

const SCORER: &str = "truth scorer";

/// What happened when a candidate was sent for verification.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Verified(VerificationResult),
    /// Verification could not be reserved; the candidate stays unverified.
    Skipped(Interruption),
    /// The scorer could not be reached.
    Unavailable(String),
}

#[derive(Clone)]
pub struct VerifierAdapter {
    scorer: Arc<dyn TruthScorer>,
    cost: Cost,
    rules: VerificationConfig,
}

impl VerifierAdapter {
    pub fn new(scorer: Arc<dyn TruthScorer>, cost: Cost, rules: VerificationConfig) -> Self {
        Self {
            scorer,
            cost,
            rules,
        }
    }

    pub const fn cost(&self) -> Cost {
        self.cost
    }

    /// Whether candidates of `action` go to the scorer at all.
    pub fn requires_verification(&self, action: ActionKind) -> bool {
        self.rules.requires_verification(action)
    }

    /// Acceptance rule: truthfulness at or above the threshold, and citation
    /// precision at or above its threshold when the action must cite.
    pub fn accepts(&self, action: ActionKind, result: &VerificationResult) -> bool {
        let truthful = result.truthfulness >= self.rules.accept_threshold;
        let cited = !self.rules.requires_citations(action)
            || result.citation_precision >= self.rules.citation_threshold;
        truthful && cited
    }

    pub async fn verify(
        &self,
        candidate: &CandidateAnswer,
        budget: &ExecutionBudget,
    ) -> DomainResult<VerificationOutcome> {
        let Some(text) = candidate.body_text() else {
            return Err(DomainError::invariant(format!(
                "aborted {} candidate sent for verification",
                candidate.action
            )));
        };

        if let Err(interruption) = budget.checkpoint(&self.cost) {
            tracing::info!(action = %candidate.action, %interruption, "Verification skipped");
            return Ok(VerificationOutcome::Skipped(interruption));
        }

        match self
            .scorer
            .score(text, &candidate.citations, &candidate.evidence)
            .await
        {
            Ok(result) if result.is_well_formed() => {
                tracing::debug!(
                    action = %candidate.action,
                    truthfulness = result.truthfulness,
                    citation_precision = result.citation_precision,
                    unsupported_claims = result.unsupported_claims.len(),
                    "Candidate verified"
                );
                Ok(VerificationOutcome::Verified(result))
            }
            Ok(result) => Err(DomainError::contract(
                SCORER,
                format!(
                    "scores out of range: truthfulness={}, citation_precision={}",
                    result.truthfulness, result.citation_precision
                ),
            )),
            Err(CollaboratorError::Malformed(detail)) => Err(DomainError::contract(SCORER, detail)),
            Err(err) => {
                tracing::warn!(action = %candidate.action, error = %err, "Truth scorer unavailable");
                Ok(VerificationOutcome::Unavailable(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Citation;
    use crate::domain::models::EvidencePassage;
    use crate::services::budget_controller::{BudgetController, CancellationFlag};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::time::Duration;

    struct Fixed(Result<VerificationResult, CollaboratorError>);

    #[async_trait]
    impl TruthScorer for Fixed {
        async fn score(
            &self,
            _text: &str,
            _citations: &[Citation],
            _evidence: &[EvidencePassage],
        ) -> Result<VerificationResult, CollaboratorError> {
            self.0.clone()
        }
    }

    fn adapter(reply: Result<VerificationResult, CollaboratorError>) -> VerifierAdapter {
        VerifierAdapter::new(
            Arc::new(Fixed(reply)),
            Cost::from_millis(256, 800),
            VerificationConfig::default(),
        )
    }

    fn lease(tokens: u64) -> ExecutionBudget {
        BudgetController::new(
            Duration::from_secs(5),
            tokens,
            Utc::now() + chrono::Duration::seconds(30),
        )
        .lease(CancellationFlag::new())
    }

    fn candidate() -> CandidateAnswer {
        CandidateAnswer::text(ActionKind::Parametric, "Paris", Cost::ZERO)
    }

    #[test]
    fn test_acceptance_rule() {
        let verifier = adapter(Ok(VerificationResult::new(1.0, 1.0)));
        let passing_without_citations = VerificationResult::new(0.9, 0.0);
        assert!(verifier.accepts(ActionKind::Parametric, &passing_without_citations));
        assert!(!verifier.accepts(ActionKind::Retrieve, &passing_without_citations));
        assert!(verifier.accepts(ActionKind::Retrieve, &VerificationResult::new(0.92, 0.95)));
        assert!(!verifier.accepts(ActionKind::Retrieve, &VerificationResult::new(0.4, 0.95)));
        assert!(verifier.accepts(ActionKind::Compute, &VerificationResult::new(0.8, 0.0)));
    }

    #[tokio::test]
    async fn test_verify_reserves_cost() {
        let verifier = adapter(Ok(VerificationResult::new(0.9, 0.9)));
        let budget = lease(1000);
        let outcome = verifier.verify(&candidate(), &budget).await.expect("no hard error");
        assert!(matches!(outcome, VerificationOutcome::Verified(_)));
        assert_eq!(budget.committed(), Cost::from_millis(256, 800));
    }

    #[tokio::test]
    async fn test_verify_skipped_without_budget() {
        let verifier = adapter(Ok(VerificationResult::new(0.9, 0.9)));
        let outcome = verifier.verify(&candidate(), &lease(100)).await.expect("no hard error");
        assert_eq!(
            outcome,
            VerificationOutcome::Skipped(Interruption::BudgetExhausted)
        );
    }

    #[tokio::test]
    async fn test_unreachable_scorer_is_unavailable() {
        let verifier = adapter(Err(CollaboratorError::Unavailable("connection refused".into())));
        let outcome = verifier.verify(&candidate(), &lease(1000)).await.expect("no hard error");
        assert!(matches!(outcome, VerificationOutcome::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_scores_break_contract() {
        let verifier = adapter(Ok(VerificationResult::new(1.5, 0.5)));
        let err = verifier.verify(&candidate(), &lease(1000)).await.unwrap_err();
        assert!(matches!(err, DomainError::CollaboratorContract { .. }));
    }
}
