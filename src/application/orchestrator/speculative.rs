//! Speculative execution of the two top-ranked actions.
//!
//! When the top two answer-producing actions are nearly tied and the budget
//! covers both, they run concurrently on separate leases of the same budget.
//! The first verified candidate wins and the other lease is cancelled at its
//! next checkpoint. Losers are recorded before the winner so the terminal
//! record stays last. A speculative round counts as one retry.

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info};

use super::{AttemptKind, AttemptReport, Orchestrator, Run, Step};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ActionKind, AttemptOutcome, Cost, EscalationReason, Interruption, ResolutionState,
    VerificationResult,
};
use crate::services::budget_controller::CancellationFlag;

impl Orchestrator {
    /// The pair to run speculatively, if this decision qualifies.
    pub(super) fn speculation_pair(&self, run: &Run<'_>) -> Option<(ActionKind, ActionKind)> {
        let settings = &self.settings.speculative;
        if !settings.enabled || self.settings.max_retries == 0 {
            return None;
        }
        let [first, second, ..] = run.decision.entries() else {
            return None;
        };
        if !first.action.produces_answer() || !second.action.produces_answer() {
            return None;
        }
        let gap = first.confidence - second.confidence;
        if gap > settings.max_confidence_gap {
            return None;
        }
        let combined = self
            .speculative_cost(first.action)
            .saturating_add(self.speculative_cost(second.action));
        if !run.budget.snapshot().covers(&combined) {
            debug!(query_id = %run.query.id(), %combined, "Budget too small to speculate");
            return None;
        }
        Some((first.action, second.action))
    }

    fn speculative_cost(&self, action: ActionKind) -> Cost {
        let cost = self.policy.minimum_cost(action);
        if self.verifier.requires_verification(action) {
            cost.saturating_add(self.verifier.cost())
        } else {
            cost
        }
    }

    pub(super) async fn speculate(
        &self,
        run: &mut Run<'_>,
        first: ActionKind,
        second: ActionKind,
    ) -> DomainResult<Step> {
        run.transition(ResolutionState::Executing);
        info!(query_id = %run.query.id(), %first, %second, "Speculating on top two actions");

        let flags = [CancellationFlag::new(), CancellationFlag::new()];
        let reports = {
            let shared: &Run<'_> = run;
            let mut in_flight: FuturesUnordered<_> = [(0usize, first), (1, second)]
                .into_iter()
                .map(|(slot, action)| {
                    let cancel = flags[slot].clone();
                    async move { (slot, self.attempt(shared, action, cancel).await) }
                })
                .collect();

            let mut reports = Vec::with_capacity(2);
            let mut failure: Option<DomainError> = None;
            while let Some((slot, result)) = in_flight.next().await {
                match result {
                    Ok(report) => {
                        if matches!(report.kind, AttemptKind::Accepted { .. }) {
                            for (other, flag) in flags.iter().enumerate() {
                                if other != slot {
                                    flag.cancel();
                                }
                            }
                        }
                        reports.push(report);
                    }
                    Err(err) => {
                        flags.iter().for_each(CancellationFlag::cancel);
                        failure.get_or_insert(err);
                    }
                }
            }
            if let Some(err) = failure {
                return Err(err);
            }
            reports
        };

        run.retries_used += 1;
        self.settle(run, reports)
    }

    fn settle(&self, run: &mut Run<'_>, mut reports: Vec<AttemptReport>) -> DomainResult<Step> {
        if let Some(index) = reports
            .iter()
            .position(|report| matches!(report.kind, AttemptKind::Accepted { .. }))
        {
            let winner = reports.remove(index);
            for loser in reports {
                Self::record_settled(run, loser)?;
            }
            return self.apply(run, winner);
        }

        let interruption = reports.iter().find_map(|report| match report.kind {
            AttemptKind::DispatchRefused(i)
            | AttemptKind::Aborted(i)
            | AttemptKind::VerificationSkipped(i) => Some(i),
            _ => None,
        });
        let unavailable = reports
            .iter()
            .any(|report| matches!(report.kind, AttemptKind::VerificationUnavailable(_)));
        let rejected = reports
            .iter()
            .any(|report| matches!(report.kind, AttemptKind::Rejected(_)));

        for report in reports {
            Self::record_settled(run, report)?;
        }

        if let Some(interruption) = interruption {
            self.escalate(run, EscalationReason::from(interruption))
        } else if unavailable {
            self.escalate(run, EscalationReason::VerificationUnavailable)
        } else if rejected {
            self.retry_or_escalate(run, EscalationReason::VerificationFailed)
        } else {
            self.retry_or_escalate(run, EscalationReason::ExecutorFailure)
        }
    }

    /// Record an attempt that does not end the resolution.
    fn record_settled(run: &mut Run<'_>, report: AttemptReport) -> DomainResult<()> {
        let AttemptReport { action, cost, kind } = report;
        run.attempted.insert(action);
        let (outcome, verification): (AttemptOutcome, Option<VerificationResult>) = match kind {
            AttemptKind::Accepted { verification, .. } => (AttemptOutcome::Superseded, verification),
            AttemptKind::VerificationSkipped(Interruption::Cancelled) => {
                (AttemptOutcome::Superseded, None)
            }
            AttemptKind::VerificationSkipped(interruption) => {
                (AttemptOutcome::VerificationSkipped { interruption }, None)
            }
            AttemptKind::Rejected(result) => (AttemptOutcome::Rejected, Some(result)),
            AttemptKind::DispatchRefused(interruption) | AttemptKind::Aborted(interruption) => {
                (AttemptOutcome::Aborted { interruption }, None)
            }
            AttemptKind::Failed(failure) => (
                AttemptOutcome::ExecutorFailed {
                    detail: failure.cause.to_string(),
                },
                None,
            ),
            AttemptKind::VerificationUnavailable(detail) => {
                (AttemptOutcome::VerificationUnavailable { detail }, None)
            }
            AttemptKind::Clarified(_) | AttemptKind::Abstained(_) => {
                return Err(DomainError::invariant(format!(
                    "{action} cannot run speculatively"
                )));
            }
        };
        run.record(action, outcome, cost, verification)
    }
}
