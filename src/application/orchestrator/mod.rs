//! Orchestrator state machine.
//!
//! One [`Orchestrator::resolve`] call takes a query through
//! `INIT → GATED → EXECUTING → VERIFYING → {ACCEPTED | RETRYING | ESCALATED} → DONE`.
//! Recoverable conditions (refused reservations, executor failures, an
//! unreachable scorer) always end in a [`FinalAnswer`]; only invariant
//! violations and collaborator contract breaches are returned as errors.
//!
//! Retries are bounded by `max_retries`, never repeat an action and only
//! start while the budget has not expired, so a resolution makes at most
//! `min(max_retries, 4) + 1` executor invocations.

mod speculative;

use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult, ExecutorFailure};
use crate::domain::models::{
    ActionKind, AttemptOutcome, CandidateAnswer, Config, Cost, EscalationReason, ExecutionTrace,
    FeatureVector, FinalAnswer, GatingDecision, Interruption, OrchestratorConfig, Query,
    Resolution, ResolutionState, VerificationResult,
};
use crate::services::budget_controller::{BudgetController, CancellationFlag, ExecutionBudget};
use crate::services::executors::{ExecutionOutcome, ExecutorSet};
use crate::services::feature_extractor::FeatureExtractor;
use crate::services::gating_policy::GatingPolicy;
use crate::services::messages;
use crate::services::verifier::{VerificationOutcome, VerifierAdapter};

/// How one executor invocation ended, before it is written to the trace.
#[derive(Debug)]
pub(crate) enum AttemptKind {
    /// The dispatch reservation itself was refused; no executor ran.
    DispatchRefused(Interruption),
    Abstained(FinalAnswer),
    Aborted(Interruption),
    Clarified(String),
    Accepted {
        answer: CandidateAnswer,
        verification: Option<VerificationResult>,
    },
    Rejected(VerificationResult),
    Failed(ExecutorFailure),
    VerificationSkipped(Interruption),
    VerificationUnavailable(String),
}

#[derive(Debug)]
pub(crate) struct AttemptReport {
    pub action: ActionKind,
    pub cost: Cost,
    pub kind: AttemptKind,
}

/// Next move of the state machine.
enum Step {
    Execute(ActionKind),
    Finish(FinalAnswer),
}

/// Mutable state of one resolution.
struct Run<'a> {
    query: &'a Query,
    features: FeatureVector,
    decision: GatingDecision,
    budget: BudgetController,
    trace: ExecutionTrace,
    attempted: BTreeSet<ActionKind>,
    retries_used: u32,
    state: ResolutionState,
}

impl Run<'_> {
    fn transition(&mut self, next: ResolutionState) {
        debug!(
            query_id = %self.query.id(),
            from = %self.state,
            to = %next,
            "State transition"
        );
        self.state = next;
    }

    fn record(
        &mut self,
        action: ActionKind,
        outcome: AttemptOutcome,
        cost: Cost,
        verification: Option<VerificationResult>,
    ) -> DomainResult<()> {
        self.trace.append(action, outcome, cost, verification)
    }
}

/// Deadline expiry when the deadline has passed, budget exhaustion otherwise.
fn exhaustion_reason(budget: &BudgetController) -> EscalationReason {
    if chrono::Utc::now() >= budget.deadline() {
        EscalationReason::DeadlineExpired
    } else {
        EscalationReason::BudgetExhausted
    }
}

/// Composes feature extraction, gating, execution and verification.
#[derive(Clone)]
pub struct Orchestrator {
    extractor: FeatureExtractor,
    policy: GatingPolicy,
    executors: ExecutorSet,
    verifier: VerifierAdapter,
    settings: OrchestratorConfig,
    dispatch_cost: Cost,
}

impl Orchestrator {
    pub fn new(
        extractor: FeatureExtractor,
        policy: GatingPolicy,
        executors: ExecutorSet,
        verifier: VerifierAdapter,
        config: &Config,
    ) -> Self {
        Self {
            extractor,
            policy,
            executors,
            verifier,
            settings: config.orchestrator.clone(),
            dispatch_cost: config.costs.dispatch.cost(),
        }
    }

    /// Resolve `query` within `budget`.
    #[instrument(skip_all, fields(query_id = %query.id()))]
    pub async fn resolve(&self, query: &Query, budget: BudgetController) -> DomainResult<Resolution> {
        let features = self.extractor.extract(query);
        let decision = self.policy.decide(&features, &budget.snapshot());

        let mut run = Run {
            query,
            features,
            decision,
            budget,
            trace: ExecutionTrace::new(query.id()),
            attempted: BTreeSet::new(),
            retries_used: 0,
            state: ResolutionState::Init,
        };
        run.transition(ResolutionState::Gated);

        let Some(top) = run.decision.top().copied() else {
            return Err(DomainError::invariant("gating produced an empty decision"));
        };
        info!(
            query_id = %query.id(),
            action = %top.action,
            confidence = top.confidence,
            model_version = run.decision.model_version(),
            "Query gated"
        );

        let mut step = if run.decision.is_budget_escalation() {
            let reason = exhaustion_reason(&run.budget);
            self.escalate(&mut run, reason)?
        } else if let Some((first, second)) = self.speculation_pair(&run) {
            self.speculate(&mut run, first, second).await?
        } else {
            Step::Execute(top.action)
        };

        let final_answer = loop {
            match step {
                Step::Execute(action) => {
                    run.transition(ResolutionState::Executing);
                    let report = self.attempt(&run, action, CancellationFlag::new()).await?;
                    step = self.apply(&mut run, report)?;
                }
                Step::Finish(answer) => break answer,
            }
        };

        run.transition(ResolutionState::Done);
        run.trace.finalize()?;
        info!(
            query_id = %query.id(),
            outcome = final_answer.outcome(),
            attempts = run.trace.attempts(),
            "Resolution finished"
        );

        Ok(Resolution {
            query: query.clone(),
            consumed: run.budget.consumed(),
            features: run.features,
            decision: run.decision,
            trace: run.trace,
            final_answer,
        })
    }

    /// Dispatch `action` and, for an answer, verify it. Touches no run state.
    async fn attempt(
        &self,
        run: &Run<'_>,
        action: ActionKind,
        cancel: CancellationFlag,
    ) -> DomainResult<AttemptReport> {
        let lease = run.budget.lease(cancel);
        let kind = self.attempt_kind(run, action, &lease).await?;
        Ok(AttemptReport {
            action,
            cost: lease.committed(),
            kind,
        })
    }

    async fn attempt_kind(
        &self,
        run: &Run<'_>,
        action: ActionKind,
        lease: &ExecutionBudget,
    ) -> DomainResult<AttemptKind> {
        if action != ActionKind::Escalate {
            if let Err(interruption) = lease.checkpoint(&self.dispatch_cost) {
                return Ok(AttemptKind::DispatchRefused(interruption));
            }
        }

        let candidate = match self
            .executors
            .execute(action, run.query, &run.features, lease)
            .await
        {
            Ok(ExecutionOutcome::Abstention(answer)) => return Ok(AttemptKind::Abstained(answer)),
            Ok(ExecutionOutcome::Candidate(candidate)) => candidate,
            Err(failure) if failure.is_contract_breach() => {
                return Err(failure.into_contract_error())
            }
            Err(failure) => {
                warn!(query_id = %run.query.id(), %action, error = %failure, "Executor failed");
                return Ok(AttemptKind::Failed(failure));
            }
        };

        if candidate.action != action {
            return Err(DomainError::invariant(format!(
                "{action} dispatch returned a {} candidate",
                candidate.action
            )));
        }
        if let Some(interruption) = candidate.interruption() {
            return Ok(AttemptKind::Aborted(interruption));
        }
        if candidate.is_clarification() {
            let question = candidate.body_text().unwrap_or_default().to_string();
            return Ok(AttemptKind::Clarified(question));
        }
        if !self.verifier.requires_verification(action) {
            return Ok(AttemptKind::Accepted {
                answer: candidate,
                verification: None,
            });
        }

        Ok(match self.verifier.verify(&candidate, lease).await? {
            VerificationOutcome::Verified(result) if self.verifier.accepts(action, &result) => {
                AttemptKind::Accepted {
                    answer: candidate,
                    verification: Some(result),
                }
            }
            VerificationOutcome::Verified(result) => AttemptKind::Rejected(result),
            VerificationOutcome::Skipped(interruption) => {
                AttemptKind::VerificationSkipped(interruption)
            }
            VerificationOutcome::Unavailable(detail) => AttemptKind::VerificationUnavailable(detail),
        })
    }

    /// Write one attempt to the trace and decide what follows.
    fn apply(&self, run: &mut Run<'_>, report: AttemptReport) -> DomainResult<Step> {
        let AttemptReport { action, cost, kind } = report;
        if !matches!(kind, AttemptKind::DispatchRefused(_)) && action != ActionKind::Escalate {
            run.attempted.insert(action);
        }

        match kind {
            AttemptKind::DispatchRefused(interruption) => {
                self.escalate(run, EscalationReason::from(interruption))
            }
            AttemptKind::Abstained(answer) => {
                let reason = answer
                    .escalation_reason()
                    .unwrap_or(EscalationReason::PolicyEscalation);
                run.transition(ResolutionState::Escalated);
                run.record(action, AttemptOutcome::Escalated { reason }, cost, None)?;
                Ok(Step::Finish(answer))
            }
            AttemptKind::Aborted(interruption) => {
                run.record(action, AttemptOutcome::Aborted { interruption }, cost, None)?;
                self.escalate(run, EscalationReason::from(interruption))
            }
            AttemptKind::Clarified(question) => {
                run.record(action, AttemptOutcome::Clarified, cost, None)?;
                Ok(Step::Finish(FinalAnswer::Clarification {
                    question,
                    language: run.features.language,
                }))
            }
            AttemptKind::Accepted {
                answer,
                verification,
            } => {
                run.transition(ResolutionState::Verifying);
                run.transition(ResolutionState::Accepted);
                run.record(action, AttemptOutcome::Accepted, cost, verification.clone())?;
                Ok(Step::Finish(FinalAnswer::Accepted {
                    answer,
                    verification,
                }))
            }
            AttemptKind::Rejected(result) => {
                run.transition(ResolutionState::Verifying);
                info!(
                    query_id = %run.query.id(),
                    %action,
                    truthfulness = result.truthfulness,
                    citation_precision = result.citation_precision,
                    "Candidate rejected"
                );
                run.record(action, AttemptOutcome::Rejected, cost, Some(result))?;
                self.retry_or_escalate(run, EscalationReason::VerificationFailed)
            }
            AttemptKind::Failed(failure) => {
                let detail = failure.cause.to_string();
                run.record(action, AttemptOutcome::ExecutorFailed { detail }, cost, None)?;
                self.retry_or_escalate(run, EscalationReason::ExecutorFailure)
            }
            AttemptKind::VerificationSkipped(interruption) => {
                run.transition(ResolutionState::Verifying);
                run.record(
                    action,
                    AttemptOutcome::VerificationSkipped { interruption },
                    cost,
                    None,
                )?;
                self.escalate(run, EscalationReason::from(interruption))
            }
            AttemptKind::VerificationUnavailable(detail) => {
                run.transition(ResolutionState::Verifying);
                run.record(
                    action,
                    AttemptOutcome::VerificationUnavailable { detail },
                    cost,
                    None,
                )?;
                self.escalate(run, EscalationReason::VerificationUnavailable)
            }
        }
    }

    /// Follow the ranking to the next untried affordable action, or escalate
    /// with `reason`. An `Escalate` entry ranked ahead of every remaining
    /// affordable action ends the resolution.
    fn retry_or_escalate(&self, run: &mut Run<'_>, reason: EscalationReason) -> DomainResult<Step> {
        if run.budget.expired() {
            let reason = exhaustion_reason(&run.budget);
            return self.escalate(run, reason);
        }
        if run.retries_used >= self.settings.max_retries {
            debug!(query_id = %run.query.id(), retries = run.retries_used, "Retry limit reached");
            return self.escalate(run, reason);
        }

        let snapshot = run.budget.snapshot();
        let mut passed_over = run.attempted.clone();
        let mut unaffordable = false;
        let next = loop {
            match run.decision.next_untried(&passed_over).map(|entry| entry.action) {
                Some(ActionKind::Escalate) | None => {
                    let reason = if unaffordable {
                        EscalationReason::BudgetExhausted
                    } else {
                        reason
                    };
                    return self.escalate(run, reason);
                }
                Some(action) if self.policy.affordable(action, &snapshot) => break action,
                Some(action) => {
                    debug!(query_id = %run.query.id(), %action, "Skipping unaffordable retry");
                    unaffordable = true;
                    passed_over.insert(action);
                }
            }
        };

        run.retries_used += 1;
        run.transition(ResolutionState::Retrying);
        info!(
            query_id = %run.query.id(),
            next_action = %next,
            retry = run.retries_used,
            "Retrying with next-ranked action"
        );
        Ok(Step::Execute(next))
    }

    fn escalate(&self, run: &mut Run<'_>, reason: EscalationReason) -> DomainResult<Step> {
        run.transition(ResolutionState::Escalated);
        info!(query_id = %run.query.id(), reason = %reason, "Escalating");
        run.record(
            ActionKind::Escalate,
            AttemptOutcome::Escalated { reason },
            Cost::ZERO,
            None,
        )?;
        Ok(Step::Finish(FinalAnswer::escalated(
            reason,
            messages::escalation_message(run.features.language, reason),
        )))
    }
}
