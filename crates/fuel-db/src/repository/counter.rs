//! # Counter Repository
//!
//! The singleton `counter_state` row (id = 1) behind [`CounterStore`].
//!
//! ```text
//! save               INSERT .. ON CONFLICT(id) DO UPDATE   (upsert)
//! compare_and_swap   UPDATE .. WHERE id = 1 AND current_value = ?expected
//!                    rows_affected == 1 → applied
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use fuel_core::store::CounterStore;
use fuel_core::{CounterState, StoreResult};

#[derive(Debug, sqlx::FromRow)]
struct CounterRow {
    current_value: i64,
    updated_at: DateTime<Utc>,
}

/// Repository for the dispenser counter.
#[derive(Debug, Clone)]
pub struct CounterRepository {
    pool: SqlitePool,
}

impl CounterRepository {
    /// Creates a new CounterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CounterRepository { pool }
    }

    /// Gets the counter, or `None` before the first write.
    pub async fn get(&self) -> DbResult<Option<CounterState>> {
        let row: Option<CounterRow> =
            sqlx::query_as("SELECT current_value, updated_at FROM counter_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|r| CounterState {
            current_value: r.current_value,
            updated_at: r.updated_at,
        }))
    }

    /// Writes the counter unconditionally.
    pub async fn upsert(&self, state: &CounterState) -> DbResult<()> {
        debug!(value = state.current_value, "Saving counter");

        sqlx::query(
            r#"
            INSERT INTO counter_state (id, current_value, updated_at)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                current_value = excluded.current_value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(state.current_value)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes the counter only if it still holds `expected`.
    pub async fn swap(&self, expected: i64, state: &CounterState) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE counter_state SET
                current_value = ?2,
                updated_at = ?3
            WHERE id = 1 AND current_value = ?1
            "#,
        )
        .bind(expected)
        .bind(state.current_value)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(expected, value = state.current_value, applied, "Counter swap");
        Ok(applied)
    }
}

#[async_trait]
impl CounterStore for CounterRepository {
    async fn get_current(&self) -> StoreResult<Option<CounterState>> {
        Ok(self.get().await?)
    }

    async fn save(&self, state: &CounterState) -> StoreResult<()> {
        Ok(self.upsert(state).await?)
    }

    async fn compare_and_swap(&self, expected: i64, state: &CounterState) -> StoreResult<bool> {
        Ok(self.swap(expected, state).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use fuel_core::StoreError;

    async fn repo() -> CounterRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().counter()
    }

    #[tokio::test]
    async fn test_counter_starts_empty() {
        let repo = repo().await;
        assert!(repo.get().await.unwrap().is_none());
        assert!(!repo.swap(0, &CounterState::at_now(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_and_swap() {
        let repo = repo().await;
        repo.upsert(&CounterState::at_now(1000)).await.unwrap();
        repo.upsert(&CounterState::at_now(900)).await.unwrap();
        assert_eq!(repo.get().await.unwrap().unwrap().current_value, 900);

        assert!(!repo.swap(1000, &CounterState::at_now(1100)).await.unwrap());
        assert!(repo.swap(900, &CounterState::at_now(1000)).await.unwrap());
        assert_eq!(repo.get().await.unwrap().unwrap().current_value, 1000);
    }

    #[tokio::test]
    async fn test_negative_value_rejected_by_schema() {
        let repo = repo().await;
        let err = CounterStore::save(&repo, &CounterState::at_now(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
