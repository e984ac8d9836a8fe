//! Resource accounting for one query resolution.
//!
//! A [`Budget`] holds the remaining latency and token allowance plus a
//! wall-clock deadline. It only ever shrinks: [`Budget::reserve`] deducts a
//! [`Cost`] or refuses without touching the counters, so neither quantity can
//! go below zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Serialize a `Duration` as whole milliseconds.
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Latency and token cost of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cost {
    pub tokens: u64,
    #[serde(rename = "latency_ms", with = "duration_ms")]
    pub latency: Duration,
}

impl Cost {
    pub const ZERO: Self = Self {
        tokens: 0,
        latency: Duration::ZERO,
    };

    pub const fn new(tokens: u64, latency: Duration) -> Self {
        Self { tokens, latency }
    }

    pub const fn from_millis(tokens: u64, latency_ms: u64) -> Self {
        Self::new(tokens, Duration::from_millis(latency_ms))
    }

    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self {
            tokens: self.tokens.saturating_add(other.tokens),
            latency: self.latency.saturating_add(other.latency),
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tok / {} ms", self.tokens, self.latency.as_millis())
    }
}

/// Why a unit of work was not allowed to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interruption {
    /// Reservation refused: remaining tokens or latency too low.
    BudgetExhausted,
    /// The resolution's deadline has passed.
    DeadlineExpired,
    /// A speculative sibling won and this branch was told to stop.
    Cancelled,
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BudgetExhausted => "budget exhausted",
            Self::DeadlineExpired => "deadline expired",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Read-only view of a budget at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    #[serde(rename = "remaining_latency_ms", with = "duration_ms")]
    pub remaining_latency: Duration,
    pub remaining_tokens: u64,
    pub deadline: DateTime<Utc>,
    /// Deadline passed or a quantity hit zero when the snapshot was taken.
    pub expired: bool,
}

impl BudgetSnapshot {
    /// Whether `cost` fits in what remains.
    pub fn covers(&self, cost: &Cost) -> bool {
        !self.expired
            && cost.tokens <= self.remaining_tokens
            && cost.latency <= self.remaining_latency
    }
}

/// Mutable allowance for one query resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budget {
    remaining_latency: Duration,
    remaining_tokens: u64,
    deadline: DateTime<Utc>,
    initial: Cost,
}

impl Budget {
    pub const fn new(latency: Duration, tokens: u64, deadline: DateTime<Utc>) -> Self {
        Self {
            remaining_latency: latency,
            remaining_tokens: tokens,
            deadline,
            initial: Cost::new(tokens, latency),
        }
    }

    /// Deduct `cost` if both quantities stay non-negative. Returns `false`
    /// and leaves the counters untouched otherwise.
    pub fn reserve(&mut self, cost: &Cost) -> bool {
        if cost.tokens > self.remaining_tokens || cost.latency > self.remaining_latency {
            return false;
        }
        self.remaining_tokens -= cost.tokens;
        self.remaining_latency -= cost.latency;
        true
    }

    pub const fn remaining(&self) -> (Duration, u64) {
        (self.remaining_latency, self.remaining_tokens)
    }

    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline || self.remaining_latency.is_zero() || self.remaining_tokens == 0
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> BudgetSnapshot {
        BudgetSnapshot {
            remaining_latency: self.remaining_latency,
            remaining_tokens: self.remaining_tokens,
            deadline: self.deadline,
            expired: self.is_expired_at(now),
        }
    }

    /// Everything reserved so far.
    pub fn consumed(&self) -> Cost {
        Cost {
            tokens: self.initial.tokens - self.remaining_tokens,
            latency: self.initial.latency.saturating_sub(self.remaining_latency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn far_deadline() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::hours(1)
    }

    #[test]
    fn test_reserve_deducts_both_quantities() {
        let mut budget = Budget::new(Duration::from_millis(1000), 500, far_deadline());
        assert!(budget.reserve(&Cost::from_millis(200, 300)));
        assert_eq!(budget.remaining(), (Duration::from_millis(700), 300));
        assert_eq!(budget.consumed(), Cost::from_millis(200, 300));
    }

    #[test]
    fn test_reserve_refuses_without_deducting() {
        let mut budget = Budget::new(Duration::from_millis(1000), 100, far_deadline());
        assert!(!budget.reserve(&Cost::from_millis(101, 10)));
        assert!(!budget.reserve(&Cost::from_millis(10, 1001)));
        assert_eq!(budget.remaining(), (Duration::from_millis(1000), 100));
    }

    #[test]
    fn test_exact_reservation_empties_and_expires() {
        let mut budget = Budget::new(Duration::from_millis(100), 10, far_deadline());
        assert!(budget.reserve(&Cost::from_millis(10, 50)));
        assert!(budget.is_expired_at(Utc::now()));
        assert!(!budget.snapshot_at(Utc::now()).covers(&Cost::ZERO));
    }

    #[test]
    fn test_deadline_expiry() {
        let past = Utc::now() - chrono::Duration::seconds(1);
        let budget = Budget::new(Duration::from_secs(5), 1000, past);
        assert!(budget.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_cost_serializes_in_millis() {
        let json = serde_json::to_value(Cost::from_millis(12, 340)).expect("serialize");
        assert_eq!(json, serde_json::json!({"tokens": 12, "latency_ms": 340}));
    }
}
