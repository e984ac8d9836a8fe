//! Budget accounting for one query resolution.
//!
//! [`BudgetController`] is the only handle through which a [`Budget`] is
//! mutated. Executors receive an [`ExecutionBudget`] lease that adds a
//! cooperative cancellation flag and tracks what that executor committed;
//! every unit of external work goes through [`ExecutionBudget::checkpoint`]
//! first.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::models::{Budget, BudgetSnapshot, Cost, Interruption};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to the budget of one resolution.
///
/// Clones refer to the same counters. Reservations are atomic, so the
/// speculative path can let two executors draw from one budget.
#[derive(Debug, Clone)]
pub struct BudgetController {
    budget: Arc<Mutex<Budget>>,
}

impl BudgetController {
    pub fn new(latency: Duration, tokens: u64, deadline: DateTime<Utc>) -> Self {
        Self::from_budget(Budget::new(latency, tokens, deadline))
    }

    pub fn from_budget(budget: Budget) -> Self {
        Self {
            budget: Arc::new(Mutex::new(budget)),
        }
    }

    /// Deduct `cost`, or return `false` and deduct nothing.
    pub fn reserve(&self, cost: &Cost) -> bool {
        let mut budget = lock(&self.budget);
        let granted = budget.reserve(cost);
        if !granted {
            let (latency, tokens) = budget.remaining();
            tracing::debug!(
                requested = %cost,
                remaining_tokens = tokens,
                remaining_latency_ms = latency.as_millis() as u64,
                "Budget reservation refused"
            );
        }
        granted
    }

    pub fn remaining(&self) -> (Duration, u64) {
        lock(&self.budget).remaining()
    }

    /// Deadline passed, or either quantity is zero.
    pub fn expired(&self) -> bool {
        lock(&self.budget).is_expired_at(Utc::now())
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        lock(&self.budget).deadline()
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        lock(&self.budget).snapshot_at(Utc::now())
    }

    pub fn consumed(&self) -> Cost {
        lock(&self.budget).consumed()
    }

    /// Issue a lease for one executor invocation.
    pub fn lease(&self, cancel: CancellationFlag) -> ExecutionBudget {
        ExecutionBudget {
            controller: self.clone(),
            cancel,
            committed: Arc::new(Mutex::new(Cost::ZERO)),
        }
    }
}

/// Cooperative stop signal shared between the orchestrator and an executor.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Budget lease held by one executor invocation.
#[derive(Debug, Clone)]
pub struct ExecutionBudget {
    controller: BudgetController,
    cancel: CancellationFlag,
    committed: Arc<Mutex<Cost>>,
}

impl ExecutionBudget {
    /// Gate one unit of external work.
    ///
    /// Checks cancellation, then expiry, then reserves `cost`. Committed
    /// reservations are never refunded.
    pub fn checkpoint(&self, cost: &Cost) -> Result<(), Interruption> {
        if self.cancel.is_cancelled() {
            return Err(Interruption::Cancelled);
        }
        let snapshot = self.controller.snapshot();
        if Utc::now() >= snapshot.deadline {
            return Err(Interruption::DeadlineExpired);
        }
        if snapshot.expired || !self.controller.reserve(cost) {
            return Err(Interruption::BudgetExhausted);
        }
        let mut committed = lock(&self.committed);
        *committed = committed.saturating_add(*cost);
        Ok(())
    }

    /// Total reserved through this lease so far.
    pub fn committed(&self) -> Cost {
        *lock(&self.committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn controller(latency_ms: u64, tokens: u64) -> BudgetController {
        BudgetController::new(
            Duration::from_millis(latency_ms),
            tokens,
            Utc::now() + chrono::Duration::hours(1),
        )
    }

    #[test]
    fn test_clones_share_counters() {
        let budget = controller(1000, 100);
        let other = budget.clone();
        assert!(other.reserve(&Cost::from_millis(40, 400)));
        assert_eq!(budget.remaining(), (Duration::from_millis(600), 60));
        assert_eq!(budget.consumed(), Cost::from_millis(40, 400));
    }

    #[test]
    fn test_checkpoint_tracks_committed_cost() {
        let budget = controller(1000, 100);
        let lease = budget.lease(CancellationFlag::new());
        lease.checkpoint(&Cost::from_millis(10, 100)).expect("fits");
        lease.checkpoint(&Cost::from_millis(20, 100)).expect("fits");
        assert_eq!(lease.committed(), Cost::from_millis(30, 200));
        assert_eq!(
            lease.checkpoint(&Cost::from_millis(500, 1)),
            Err(Interruption::BudgetExhausted)
        );
        assert_eq!(lease.committed(), Cost::from_millis(30, 200));
    }

    #[test]
    fn test_checkpoint_honours_cancellation() {
        let budget = controller(1000, 100);
        let flag = CancellationFlag::new();
        let lease = budget.lease(flag.clone());
        flag.cancel();
        assert_eq!(lease.checkpoint(&Cost::ZERO), Err(Interruption::Cancelled));
        assert_eq!(budget.consumed(), Cost::ZERO);
    }

    #[test]
    fn test_checkpoint_reports_deadline() {
        let budget = BudgetController::new(
            Duration::from_secs(5),
            100,
            Utc::now() - chrono::Duration::seconds(1),
        );
        let lease = budget.lease(CancellationFlag::new());
        assert_eq!(
            lease.checkpoint(&Cost::ZERO),
            Err(Interruption::DeadlineExpired)
        );
    }

    #[test]
    fn test_zero_tokens_is_expired() {
        let budget = controller(1000, 0);
        assert!(budget.expired());
        let lease = budget.lease(CancellationFlag::new());
        assert_eq!(
            lease.checkpoint(&Cost::ZERO),
            Err(Interruption::BudgetExhausted)
        );
    }

    proptest! {
        #[test]
        fn prop_remaining_is_monotone(
            requests in proptest::collection::vec((0u64..300, 0u64..800), 0..40)
        ) {
            let budget = controller(5000, 2000);
            let mut previous = budget.remaining();
            for (tokens, latency_ms) in requests {
                let cost = Cost::from_millis(tokens, latency_ms);
                let granted = budget.reserve(&cost);
                let current = budget.remaining();
                prop_assert!(current.0 <= previous.0);
                prop_assert!(current.1 <= previous.1);
                if !granted {
                    prop_assert_eq!(current, previous);
                }
                previous = current;
            }
            let consumed = budget.consumed();
            prop_assert_eq!(consumed.tokens + previous.1, 2000);
        }
    }
}
