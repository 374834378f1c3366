//! Postgres-backed budget store for cluster deployments.
//!
//! One singleton row (`id = 1`) holds the counters. Check-and-update runs
//! inside a transaction with `SELECT ... FOR UPDATE`, so concurrent callers
//! from any process serialize on the row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};
use tracing::error;

use super::store::{apply, BudgetCounters, BudgetStore, StoreError};
use super::Admission;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS usage_counters (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    daily_tokens BIGINT NOT NULL DEFAULT 0,
    hourly_tokens BIGINT NOT NULL DEFAULT 0,
    day TEXT NOT NULL DEFAULT '',
    hour TEXT NOT NULL DEFAULT ''
);
INSERT INTO usage_counters (id, daily_tokens, hourly_tokens, day, hour)
VALUES (1, 0, 0, '', '')
ON CONFLICT (id) DO NOTHING;";

/// Budget store backed by a Postgres row.
pub struct PostgresBudgetStore {
    // Transactions need exclusive access to the client; the row lock in
    // Postgres serializes across processes.
    client: Mutex<Client>,
}

impl PostgresBudgetStore {
    /// Connect and make sure the counter row exists.
    pub async fn connect(conn_str: &str) -> Result<Self, StoreError> {
        let (client, connection) = tokio_postgres::connect(conn_str, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("budget store connection error: {e}");
            }
        });

        client.batch_execute(SCHEMA).await?;
        Ok(Self {
            client: Mutex::new(client),
        })
    }

    fn row_to_counters(row: &tokio_postgres::Row) -> BudgetCounters {
        BudgetCounters {
            daily_tokens: row.get::<_, i64>(0).max(0) as u64,
            hourly_tokens: row.get::<_, i64>(1).max(0) as u64,
            day_key: row.get(2),
            hour_key: row.get(3),
        }
    }
}

#[async_trait]
impl BudgetStore for PostgresBudgetStore {
    async fn check_and_update(
        &self,
        daily_cap: u64,
        hourly_cap: u64,
        tokens_to_add: u64,
        now: DateTime<Utc>,
    ) -> Result<Admission, StoreError> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(
                "SELECT daily_tokens, hourly_tokens, day, hour \
                 FROM usage_counters WHERE id = 1 FOR UPDATE",
                &[],
            )
            .await?
            .ok_or(StoreError::MissingRow)?;

        let mut counters = Self::row_to_counters(&row);
        let admission = apply(&mut counters, daily_cap, hourly_cap, tokens_to_add, now);

        if !admission.exceeded {
            tx.execute(
                "UPDATE usage_counters \
                 SET daily_tokens = $1, hourly_tokens = $2, day = $3, hour = $4 \
                 WHERE id = 1",
                &[
                    &(counters.daily_tokens as i64),
                    &(counters.hourly_tokens as i64),
                    &counters.day_key,
                    &counters.hour_key,
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(admission)
    }

    async fn snapshot(&self) -> Result<BudgetCounters, StoreError> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                "SELECT daily_tokens, hourly_tokens, day, hour \
                 FROM usage_counters WHERE id = 1",
                &[],
            )
            .await?
            .ok_or(StoreError::MissingRow)?;
        Ok(Self::row_to_counters(&row))
    }
}
