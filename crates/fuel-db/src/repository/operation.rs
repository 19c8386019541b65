//! # Refuel Operation Repository
//!
//! `refuel_operations` behind [`OperationStore`].
//!
//! ## Status Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE refuel_operations SET status = ?to, ...                         │
//! │  WHERE id = ?id AND status = ?from                                      │
//! │                                                                         │
//! │  Two callers racing to confirm (or cancel) the same operation both     │
//! │  pass the status check in the workflow, but only one UPDATE matches.   │
//! │  The loser sees rows_affected == 0.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use fuel_core::store::OperationStore;
use fuel_core::{Money, RefuelFilter, RefuelOperation, RefuelStatus, StoreResult};

use super::{push_page, push_window};

#[derive(Debug, sqlx::FromRow)]
struct OperationRow {
    id: String,
    amount_paid_cents: i64,
    calculated_liters: f64,
    price_per_liter_cents: i64,
    counter_before: i64,
    counter_after: i64,
    status: RefuelStatus,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    cancel_reason: Option<String>,
}

impl From<OperationRow> for RefuelOperation {
    fn from(row: OperationRow) -> Self {
        RefuelOperation {
            id: row.id,
            amount_paid: Money::from_cents(row.amount_paid_cents),
            calculated_liters: row.calculated_liters,
            price_per_liter: Money::from_cents(row.price_per_liter_cents),
            counter_before: row.counter_before,
            counter_after: row.counter_after,
            status: row.status,
            created_at: row.created_at,
            cancelled_at: row.cancelled_at,
            cancel_reason: row.cancel_reason,
        }
    }
}

const SELECT_OPERATION: &str = r#"
    SELECT
        id,
        amount_paid_cents,
        calculated_liters,
        price_per_liter_cents,
        counter_before,
        counter_after,
        status,
        created_at,
        cancelled_at,
        cancel_reason
    FROM refuel_operations
"#;

/// Repository for refuel operations.
#[derive(Debug, Clone)]
pub struct OperationRepository {
    pool: SqlitePool,
}

impl OperationRepository {
    /// Creates a new OperationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OperationRepository { pool }
    }

    /// Inserts a new operation.
    ///
    /// ## Snapshot Pattern
    /// Price and counter readings are copied into the row and never updated.
    pub async fn insert(&self, op: &RefuelOperation) -> DbResult<()> {
        debug!(id = %op.id, amount = %op.amount_paid, "Inserting refuel operation");

        sqlx::query(
            r#"
            INSERT INTO refuel_operations (
                id, amount_paid_cents, calculated_liters, price_per_liter_cents,
                counter_before, counter_after, status,
                created_at, cancelled_at, cancel_reason
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10
            )
            "#,
        )
        .bind(&op.id)
        .bind(op.amount_paid.cents())
        .bind(op.calculated_liters)
        .bind(op.price_per_liter.cents())
        .bind(op.counter_before)
        .bind(op.counter_after)
        .bind(op.status)
        .bind(op.created_at)
        .bind(op.cancelled_at)
        .bind(&op.cancel_reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an operation by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RefuelOperation>> {
        let row: Option<OperationRow> =
            sqlx::query_as(&format!("{SELECT_OPERATION} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(RefuelOperation::from))
    }

    /// Operations matching `filter`, oldest first.
    pub async fn find(&self, filter: &RefuelFilter) -> DbResult<Vec<RefuelOperation>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_OPERATION);
        query.push(" WHERE 1 = 1");

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        push_window(&mut query, filter.date_from, filter.date_to);
        query.push(" ORDER BY created_at, rowid");
        push_page(&mut query, filter.limit, filter.offset);

        let rows: Vec<OperationRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(RefuelOperation::from).collect())
    }

    /// Moves `id` from `from` to `to`.
    ///
    /// `cancelled_at` and `cancel_reason` are written only when `to` is
    /// Cancelled.
    ///
    /// ## Returns
    /// `false` if the operation is missing or no longer in `from`.
    pub async fn update_status(
        &self,
        id: &str,
        from: RefuelStatus,
        to: RefuelStatus,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let cancelled = to == RefuelStatus::Cancelled;

        let result = sqlx::query(
            r#"
            UPDATE refuel_operations SET
                status = ?3,
                cancelled_at = CASE WHEN ?4 THEN ?5 ELSE cancelled_at END,
                cancel_reason = CASE WHEN ?4 THEN ?6 ELSE cancel_reason END
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(cancelled)
        .bind(at)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(id, %from, %to, applied, "Refuel status transition");
        Ok(applied)
    }
}

#[async_trait]
impl OperationStore for OperationRepository {
    async fn create(&self, operation: &RefuelOperation) -> StoreResult<()> {
        Ok(self.insert(operation).await?)
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<RefuelOperation>> {
        Ok(OperationRepository::get_by_id(self, id).await?)
    }

    async fn find(&self, filter: &RefuelFilter) -> StoreResult<Vec<RefuelOperation>> {
        Ok(OperationRepository::find(self, filter).await?)
    }

    async fn transition_status(
        &self,
        id: &str,
        from: RefuelStatus,
        to: RefuelStatus,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(self.update_status(id, from, to, reason, at).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use uuid::Uuid;

    async fn repo() -> OperationRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().operations()
    }

    fn operation(amount_cents: i64, before: i64, created_at: DateTime<Utc>) -> RefuelOperation {
        let amount = Money::from_cents(amount_cents);
        let price = Money::from_cents(5000);
        RefuelOperation {
            id: Uuid::new_v4().to_string(),
            amount_paid: amount,
            calculated_liters: amount.liters_at(price),
            price_per_liter: price,
            counter_before: before,
            counter_after: before + amount.counter_units_at(price),
            status: RefuelStatus::Created,
            created_at,
            cancelled_at: None,
            cancel_reason: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let op = operation(50_000, 1000, Utc::now());
        repo.insert(&op).await.unwrap();

        let stored = repo.get_by_id(&op.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_paid, op.amount_paid);
        assert_eq!(stored.calculated_liters, 10.0);
        assert_eq!(stored.counter_after, 1100);
        assert_eq!(stored.status, RefuelStatus::Created);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transition_is_conditional() {
        let repo = repo().await;
        let op = operation(10_000, 0, Utc::now());
        repo.insert(&op).await.unwrap();
        let now = Utc::now();

        assert!(repo
            .update_status(&op.id, RefuelStatus::Created, RefuelStatus::Confirmed, None, now)
            .await
            .unwrap());
        // Second confirm loses: the row is no longer Created.
        assert!(!repo
            .update_status(&op.id, RefuelStatus::Created, RefuelStatus::Confirmed, None, now)
            .await
            .unwrap());

        let stored = repo.get_by_id(&op.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RefuelStatus::Confirmed);
        assert!(stored.cancelled_at.is_none());

        assert!(repo
            .update_status(
                &op.id,
                RefuelStatus::Confirmed,
                RefuelStatus::Cancelled,
                Some("customer dispute"),
                now,
            )
            .await
            .unwrap());

        let stored = repo.get_by_id(&op.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RefuelStatus::Cancelled);
        assert_eq!(stored.cancel_reason.as_deref(), Some("customer dispute"));
        assert!(stored.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn test_find_by_status_and_window() {
        let repo = repo().await;
        let base = Utc::now() - Duration::hours(5);

        let mut ids = Vec::new();
        for hour in 0..5 {
            let op = operation(1_000 * (hour + 1), 0, base + Duration::hours(hour));
            repo.insert(&op).await.unwrap();
            ids.push(op.id);
        }
        repo.update_status(
            &ids[1],
            RefuelStatus::Created,
            RefuelStatus::Confirmed,
            None,
            Utc::now(),
        )
        .await
        .unwrap();

        let pending = repo
            .find(&RefuelFilter {
                status: Some(RefuelStatus::Created),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 4);

        let window = repo
            .find(&RefuelFilter::in_window(
                None,
                base + Duration::hours(1),
                base + Duration::hours(3),
            ))
            .await
            .unwrap();
        assert_eq!(
            window.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(),
            [ids[1].as_str(), ids[2].as_str()]
        );

        let page = repo
            .find(&RefuelFilter {
                limit: Some(1),
                offset: Some(4),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page[0].id, ids[4]);
    }
}
