//! Token budget ledger: rolling daily/hourly counters with atomic admission.
//!
//! The ledger tracks token consumption against two caps over a single
//! persisted counter row. Counters reset exactly when their bucket key (the
//! current UTC day or hour) no longer matches the stored key; reset, cap
//! check, and increment are one atomic check-and-update operation.
//!
//! The ledger is invoked twice per answered request: an admission check with
//! zero tokens before the provider call, and a settlement with the actual
//! usage after it. Neither operation holds its lock across the network call.

mod postgres;
mod store;

pub use postgres::PostgresBudgetStore;
pub use store::{BudgetCounters, BudgetStore, MemoryBudgetStore, StoreError};

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Reason returned when the daily cap blocks admission.
pub const DAILY_BUDGET_EXCEEDED: &str = "Daily token budget exceeded";
/// Reason returned when the hourly cap blocks admission.
pub const HOURLY_BUDGET_EXCEEDED: &str = "Hourly token budget exceeded";

/// Default daily token cap.
pub const DEFAULT_DAILY_BUDGET: u64 = 150_000;
/// Default hourly token cap.
pub const DEFAULT_HOURLY_BUDGET: u64 = 15_000;

/// Result of one check-and-update call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Whether a cap blocked this request.
    pub exceeded: bool,
    /// Which cap blocked it, when `exceeded`.
    pub reason: Option<&'static str>,
}

impl Admission {
    pub(crate) fn granted() -> Self {
        Self {
            exceeded: false,
            reason: None,
        }
    }

    pub(crate) fn denied(reason: &'static str) -> Self {
        Self {
            exceeded: true,
            reason: Some(reason),
        }
    }
}

/// Bucket key for the current UTC day.
pub(crate) fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Bucket key for the current UTC hour.
pub(crate) fn hour_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H").to_string()
}

/// Ledger enforcing the daily and hourly caps over a [`BudgetStore`].
pub struct BudgetLedger {
    store: Arc<dyn BudgetStore>,
    daily_cap: u64,
    hourly_cap: u64,
}

impl BudgetLedger {
    pub fn new(store: Arc<dyn BudgetStore>, daily_cap: u64, hourly_cap: u64) -> Self {
        Self {
            store,
            daily_cap,
            hourly_cap,
        }
    }

    /// Atomically reset stale buckets, test the caps, and add
    /// `tokens_to_add` to both counters.
    ///
    /// A denied admission adds nothing; there is no partial increment. With
    /// `tokens_to_add == 0` this is a pure admission check and never changes
    /// stored counters.
    pub async fn check_and_update(&self, tokens_to_add: u64) -> Result<Admission, StoreError> {
        self.check_and_update_at(tokens_to_add, Utc::now()).await
    }

    /// [`check_and_update`](Self::check_and_update) with an explicit clock,
    /// for tests exercising the bucket reset law.
    pub async fn check_and_update_at(
        &self,
        tokens_to_add: u64,
        now: DateTime<Utc>,
    ) -> Result<Admission, StoreError> {
        self.store
            .check_and_update(self.daily_cap, self.hourly_cap, tokens_to_add, now)
            .await
    }

    /// Current counters, for inspection.
    pub async fn snapshot(&self) -> Result<BudgetCounters, StoreError> {
        self.store.snapshot().await
    }
}
