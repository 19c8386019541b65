//! # Event Repository
//!
//! The `event_log` journal behind [`EventStore`]. Rows are only appended and
//! purged by age.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use fuel_core::store::EventStore;
use fuel_core::{EventFilter, EventLevel, EventRecord, EventType, StoreResult};

use super::{push_page, push_window};

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: String,
    device_id: String,
    level: EventLevel,
    event_type: EventType,
    message: String,
    meta: String,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for EventRecord {
    fn from(row: EventRow) -> Self {
        EventRecord {
            id: row.id,
            device_id: row.device_id,
            level: row.level,
            event_type: row.event_type,
            message: row.message,
            meta: row.meta,
            created_at: row.created_at,
        }
    }
}

/// Repository for the event journal.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    /// Creates a new EventRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EventRepository { pool }
    }

    pub async fn insert(&self, event: &EventRecord) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO event_log (
                id, device_id, level, event_type, message, meta, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&event.id)
        .bind(&event.device_id)
        .bind(event.level)
        .bind(event.event_type)
        .bind(&event.message)
        .bind(&event.meta)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Events matching `filter`, newest first.
    pub async fn find(&self, filter: &EventFilter) -> DbResult<Vec<EventRecord>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT id, device_id, level, event_type, message, meta, created_at
            FROM event_log
            WHERE 1 = 1
            "#,
        );

        if let Some(device_id) = &filter.device_id {
            query.push(" AND device_id = ").push_bind(device_id.clone());
        }
        if let Some(level) = filter.level {
            query.push(" AND level = ").push_bind(level);
        }
        if let Some(event_type) = filter.event_type {
            query.push(" AND event_type = ").push_bind(event_type);
        }
        push_window(&mut query, filter.date_from, filter.date_to);
        query.push(" ORDER BY created_at DESC, rowid DESC");
        push_page(&mut query, filter.limit, filter.offset);

        let rows: Vec<EventRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(EventRecord::from).collect())
    }

    /// Deletes events created before `before`.
    pub async fn delete_before(&self, before: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM event_log WHERE created_at < ?1")
            .bind(before)
            .execute(&self.pool)
            .await?;

        debug!(removed = result.rows_affected(), %before, "Purged events");
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn append(&self, event: &EventRecord) -> StoreResult<()> {
        Ok(self.insert(event).await?)
    }

    async fn find(&self, filter: &EventFilter) -> StoreResult<Vec<EventRecord>> {
        Ok(EventRepository::find(self, filter).await?)
    }

    async fn delete_before(&self, before: DateTime<Utc>) -> StoreResult<u64> {
        Ok(EventRepository::delete_before(self, before).await?)
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

    async fn repo() -> EventRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().events()
    }

    fn event(device: &str, level: EventLevel, kind: EventType, at: DateTime<Utc>) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4().to_string(),
            device_id: device.to_string(),
            level,
            event_type: kind,
            message: format!("{kind}"),
            meta: "{}".to_string(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_filters_and_order() {
        let repo = repo().await;
        let now = Utc::now();

        repo.insert(&event("pump-1", EventLevel::Info, EventType::RefuelCreated, now - Duration::minutes(3)))
            .await
            .unwrap();
        repo.insert(&event("pump-1", EventLevel::Warning, EventType::CounterResynced, now - Duration::minutes(2)))
            .await
            .unwrap();
        repo.insert(&event("pump-2", EventLevel::Info, EventType::RefuelConfirmed, now - Duration::minutes(1)))
            .await
            .unwrap();

        let all = repo.find(&EventFilter::default()).await.unwrap();
        assert_eq!(
            all.iter().map(|e| e.event_type).collect::<Vec<_>>(),
            [
                EventType::RefuelConfirmed,
                EventType::CounterResynced,
                EventType::RefuelCreated
            ]
        );

        let pump_one = repo
            .find(&EventFilter {
                device_id: Some("pump-1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pump_one.len(), 2);

        let warnings = repo
            .find(&EventFilter {
                level: Some(EventLevel::Warning),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].event_type, EventType::CounterResynced);

        let confirmed = repo
            .find(&EventFilter {
                event_type: Some(EventType::RefuelConfirmed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(confirmed[0].device_id, "pump-2");
    }

    #[tokio::test]
    async fn test_delete_before() {
        let repo = repo().await;
        let now = Utc::now();
        for days in [1, 10, 40] {
            repo.insert(&event("pump-1", EventLevel::Info, EventType::PriceChanged, now - Duration::days(days)))
                .await
                .unwrap();
        }

        let removed = repo.delete_before(now - Duration::days(30)).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.find(&EventFilter::default()).await.unwrap().len(), 2);
    }
}
