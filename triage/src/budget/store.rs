//! Budget store contract and the in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{day_key, hour_key, Admission, DAILY_BUDGET_EXCEEDED, HOURLY_BUDGET_EXCEEDED};

/// Error type for budget store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("budget counter row missing")]
    MissingRow,
}

/// The singleton counter row.
///
/// Initialized to zero counters and empty bucket keys before first use; the
/// empty keys never match a real bucket, so the first check-and-update
/// adopts the current day and hour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCounters {
    pub daily_tokens: u64,
    pub hourly_tokens: u64,
    pub day_key: String,
    pub hour_key: String,
}

/// Pure transition function for one check-and-update: bucket resets, cap
/// check, increment. Must run under the store's serialization.
///
/// The two resets are independent; a stale day and a stale hour each reset
/// their own counter. A denied admission leaves the counters untouched
/// apart from the resets.
pub(crate) fn apply(
    counters: &mut BudgetCounters,
    daily_cap: u64,
    hourly_cap: u64,
    tokens_to_add: u64,
    now: DateTime<Utc>,
) -> Admission {
    let today = day_key(now);
    let hour = hour_key(now);

    if counters.day_key != today {
        counters.daily_tokens = 0;
        counters.day_key = today;
    }
    if counters.hour_key != hour {
        counters.hourly_tokens = 0;
        counters.hour_key = hour;
    }

    if counters.daily_tokens >= daily_cap {
        return Admission::denied(DAILY_BUDGET_EXCEEDED);
    }
    if counters.hourly_tokens >= hourly_cap {
        return Admission::denied(HOURLY_BUDGET_EXCEEDED);
    }

    counters.daily_tokens += tokens_to_add;
    counters.hourly_tokens += tokens_to_add;
    Admission::granted()
}

/// Persistence seam for the budget counters.
///
/// Implementations must serialize concurrent check-and-update calls so the
/// read-check-write sequence is one unit: two concurrent callers must never
/// both observe counters under the cap and both be admitted when their
/// combined increment would exceed it.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Execute one atomic check-and-update against the counter row.
    async fn check_and_update(
        &self,
        daily_cap: u64,
        hourly_cap: u64,
        tokens_to_add: u64,
        now: DateTime<Utc>,
    ) -> Result<Admission, StoreError>;

    /// Current counters, for inspection.
    async fn snapshot(&self) -> Result<BudgetCounters, StoreError>;
}

/// In-memory store: a single mutex guards the counters, making the
/// read-check-write one critical section. Suits tests and single-process
/// deployments; cluster deployments use [`super::PostgresBudgetStore`].
pub struct MemoryBudgetStore {
    counters: Mutex<BudgetCounters>,
}

impl MemoryBudgetStore {
    pub fn new() -> Self {
        Self::with_counters(BudgetCounters::default())
    }

    pub fn with_counters(counters: BudgetCounters) -> Self {
        Self {
            counters: Mutex::new(counters),
        }
    }
}

impl Default for MemoryBudgetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BudgetStore for MemoryBudgetStore {
    async fn check_and_update(
        &self,
        daily_cap: u64,
        hourly_cap: u64,
        tokens_to_add: u64,
        now: DateTime<Utc>,
    ) -> Result<Admission, StoreError> {
        let mut counters = self.counters.lock().await;
        Ok(apply(&mut counters, daily_cap, hourly_cap, tokens_to_add, now))
    }

    async fn snapshot(&self) -> Result<BudgetCounters, StoreError> {
        Ok(self.counters.lock().await.clone())
    }
}
