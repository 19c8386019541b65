//! # Price Repository
//!
//! `fuel_prices` table behind the [`PriceStore`] trait.
//!
//! ## Single Active Price
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  change_active(new)                                                     │
//! │    BEGIN                                                                │
//! │      UPDATE fuel_prices SET is_active = 0 ... WHERE is_active = 1       │
//! │      (0 rows → ROLLBACK, NoActivePrice)                                 │
//! │      INSERT new row with is_active = 1                                  │
//! │    COMMIT                                                               │
//! │                                                                         │
//! │  idx_fuel_prices_single_active rejects any second active row, so two   │
//! │  racing writers can never both commit an active price.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use fuel_core::store::PriceStore;
use fuel_core::{FuelPrice, Money, PriceFilter, StoreError, StoreResult};

use super::{push_page, push_window};

/// Row shape of `fuel_prices`.
#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    id: String,
    price_per_liter_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl From<PriceRow> for FuelPrice {
    fn from(row: PriceRow) -> Self {
        FuelPrice {
            id: row.id,
            price_per_liter: Money::from_cents(row.price_per_liter_cents),
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_active: row.is_active,
        }
    }
}

const SELECT_PRICE: &str = r#"
    SELECT id, price_per_liter_cents, created_at, updated_at, is_active
    FROM fuel_prices
"#;

/// Repository for fuel price database operations.
#[derive(Debug, Clone)]
pub struct PriceRepository {
    pool: SqlitePool,
}

impl PriceRepository {
    /// Creates a new PriceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PriceRepository { pool }
    }

    /// Gets the active price, if any.
    pub async fn get_active(&self) -> DbResult<Option<FuelPrice>> {
        let row: Option<PriceRow> =
            sqlx::query_as(&format!("{SELECT_PRICE} WHERE is_active = 1"))
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(FuelPrice::from))
    }

    /// Gets a price by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<FuelPrice>> {
        let row: Option<PriceRow> = sqlx::query_as(&format!("{SELECT_PRICE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(FuelPrice::from))
    }

    /// Prices matching `filter`, oldest first.
    pub async fn find(&self, filter: &PriceFilter) -> DbResult<Vec<FuelPrice>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_PRICE);
        query.push(" WHERE 1 = 1");

        if let Some(is_active) = filter.is_active {
            query.push(" AND is_active = ").push_bind(is_active);
        }
        push_window(&mut query, filter.date_from, filter.date_to);
        query.push(" ORDER BY created_at, rowid");
        push_page(&mut query, filter.limit, filter.offset);

        let rows: Vec<PriceRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(FuelPrice::from).collect())
    }

    /// Inserts `price` as the first active price.
    ///
    /// The partial unique index turns a concurrent second insert into
    /// `UniqueViolation` on `fuel_prices.is_active`.
    pub async fn insert_active(&self, price: &FuelPrice) -> DbResult<()> {
        debug!(id = %price.id, price = %price.price_per_liter, "Inserting active price");

        sqlx::query(
            r#"
            INSERT INTO fuel_prices (
                id, price_per_liter_cents, created_at, updated_at, is_active
            ) VALUES (?1, ?2, ?3, ?4, 1)
            "#,
        )
        .bind(&price.id)
        .bind(price.price_per_liter.cents())
        .bind(price.created_at)
        .bind(price.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deactivates the active price and inserts `price` in one transaction.
    ///
    /// ## Returns
    /// The deactivated row, or `None` (nothing written) if no price was active.
    pub async fn replace_active(&self, price: &FuelPrice) -> DbResult<Option<FuelPrice>> {
        debug!(id = %price.id, price = %price.price_per_liter, "Replacing active price");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let previous: Option<PriceRow> = sqlx::query_as(
            r#"
            UPDATE fuel_prices
            SET is_active = 0, updated_at = ?1
            WHERE is_active = 1
            RETURNING id, price_per_liter_cents, created_at, updated_at, is_active
            "#,
        )
        .bind(price.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(previous) = previous else {
            tx.rollback()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO fuel_prices (
                id, price_per_liter_cents, created_at, updated_at, is_active
            ) VALUES (?1, ?2, ?3, ?4, 1)
            "#,
        )
        .bind(&price.id)
        .bind(price.price_per_liter.cents())
        .bind(price.created_at)
        .bind(price.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(Some(previous.into()))
    }
}

#[async_trait]
impl PriceStore for PriceRepository {
    async fn get_active(&self) -> StoreResult<Option<FuelPrice>> {
        Ok(PriceRepository::get_active(self).await?)
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<FuelPrice>> {
        Ok(PriceRepository::get_by_id(self, id).await?)
    }

    async fn find(&self, filter: &PriceFilter) -> StoreResult<Vec<FuelPrice>> {
        Ok(PriceRepository::find(self, filter).await?)
    }

    async fn init_active(&self, price: &FuelPrice) -> StoreResult<()> {
        Ok(self.insert_active(price).await?)
    }

    async fn change_active(&self, price: &FuelPrice) -> StoreResult<FuelPrice> {
        self.replace_active(price)
            .await?
            .ok_or(StoreError::NoActivePrice)
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

    async fn repo() -> PriceRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().prices()
    }

    #[tokio::test]
    async fn test_init_and_get_active() {
        let repo = repo().await;
        assert!(repo.get_active().await.unwrap().is_none());

        let price = FuelPrice::new_active(Money::from_major_minor(52, 40));
        PriceStore::init_active(&repo, &price).await.unwrap();

        let active = repo.get_active().await.unwrap().unwrap();
        assert_eq!(active.id, price.id);
        assert_eq!(active.price_per_liter, Money::from_cents(5240));
        assert!(active.is_active);
    }

    #[tokio::test]
    async fn test_second_active_price_rejected_by_index() {
        let repo = repo().await;
        PriceStore::init_active(&repo, &FuelPrice::new_active(Money::from_cents(6000)))
            .await
            .unwrap();

        let err = PriceStore::init_active(&repo, &FuelPrice::new_active(Money::from_cents(7000)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ActivePriceExists));
    }

    #[tokio::test]
    async fn test_change_active_swaps_rows() {
        let repo = repo().await;
        let first = FuelPrice::new_active(Money::from_cents(6000));
        PriceStore::init_active(&repo, &first).await.unwrap();

        let second = FuelPrice::new_active(Money::from_cents(7000));
        let previous = PriceStore::change_active(&repo, &second).await.unwrap();
        assert_eq!(previous.id, first.id);
        assert!(!previous.is_active);
        assert!(previous.updated_at.is_some());

        let active = repo
            .find(&PriceFilter {
                is_active: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);

        let all = repo.find(&PriceFilter::default()).await.unwrap();
        assert_eq!(
            all.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            [first.id.as_str(), second.id.as_str()]
        );
    }

    #[tokio::test]
    async fn test_change_active_without_active() {
        let repo = repo().await;
        let err = PriceStore::change_active(&repo, &FuelPrice::new_active(Money::from_cents(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoActivePrice));
        assert!(repo.find(&PriceFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_window_and_page() {
        let repo = repo().await;
        let base = Utc::now() - Duration::days(10);

        let mut first = FuelPrice::new_active(Money::from_cents(5000));
        first.created_at = base;
        PriceStore::init_active(&repo, &first).await.unwrap();

        for day in 1..=4 {
            let mut next = FuelPrice::new_active(Money::from_cents(5000 + day * 10));
            next.created_at = base + Duration::days(day);
            PriceStore::change_active(&repo, &next).await.unwrap();
        }

        let window = repo
            .find(&PriceFilter {
                date_from: Some(base + Duration::days(1)),
                date_to: Some(base + Duration::days(3)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            window.iter().map(|p| p.price_per_liter.cents()).collect::<Vec<_>>(),
            [5010, 5020]
        );

        let page = repo
            .find(&PriceFilter {
                limit: Some(2),
                offset: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            page.iter().map(|p| p.price_per_liter.cents()).collect::<Vec<_>>(),
            [5030, 5040]
        );

        let offset_only = repo
            .find(&PriceFilter {
                offset: Some(4),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(offset_only.len(), 1);
    }
}
