//! Concurrency properties of the budget ledger.
//!
//! The check-and-update operation is one unit: concurrent callers must
//! never both pass the cap check when their combined increment would exceed
//! it.

use std::sync::Arc;

use chrono::Utc;

use triage::budget::{BudgetCounters, BudgetLedger, MemoryBudgetStore};

fn current_counters(daily: u64, hourly: u64) -> BudgetCounters {
    let now = Utc::now();
    BudgetCounters {
        daily_tokens: daily,
        hourly_tokens: hourly,
        day_key: now.format("%Y-%m-%d").to_string(),
        hour_key: now.format("%Y-%m-%dT%H").to_string(),
    }
}

#[tokio::test]
async fn concurrent_calls_near_the_cap_admit_at_most_one() {
    // Daily counter starts at cap - 10; eight concurrent 10-token calls.
    // Exactly one can be admitted before the cap is reached.
    let store = Arc::new(MemoryBudgetStore::with_counters(current_counters(90, 0)));
    let ledger = Arc::new(BudgetLedger::new(store, 100, 100_000));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(
            async move { ledger.check_and_update(10).await },
        ));
    }

    let mut admitted = 0;
    for handle in handles {
        let admission = handle.await.unwrap().unwrap();
        if !admission.exceeded {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 1, "no double-admission past the cap");

    let counters = ledger.snapshot().await.unwrap();
    assert_eq!(counters.daily_tokens, 100);
}

#[tokio::test]
async fn concurrent_settlements_sum_exactly() {
    let store = Arc::new(MemoryBudgetStore::new());
    let ledger = Arc::new(BudgetLedger::new(store, 1_000_000, 1_000_000));

    let mut handles = Vec::new();
    for _ in 0..20 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move { ledger.check_and_update(5).await }));
    }
    for handle in handles {
        assert!(!handle.await.unwrap().unwrap().exceeded);
    }

    let counters = ledger.snapshot().await.unwrap();
    assert_eq!(counters.daily_tokens, 100);
    assert_eq!(counters.hourly_tokens, 100);
}
