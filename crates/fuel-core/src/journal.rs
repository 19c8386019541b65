//! # Event Journal
//!
//! Append-only record of business events (price changes, counter overrides,
//! refuel transitions), tagged with the device that produced them.
//!
//! Recording is best-effort: the event is written after the business change
//! has committed, and a failed write is logged, never returned.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::store::EventStore;
use crate::types::{EventFilter, EventLevel, EventRecord, EventType};

#[derive(Clone)]
pub struct EventJournal {
    store: Arc<dyn EventStore>,
    device_id: String,
}

impl EventJournal {
    pub fn new(store: Arc<dyn EventStore>, device_id: impl Into<String>) -> Self {
        EventJournal {
            store,
            device_id: device_id.into(),
        }
    }

    /// Appends an event. Failures are logged with `warn!` and swallowed.
    pub async fn record(
        &self,
        level: EventLevel,
        event_type: EventType,
        message: impl Into<String>,
        meta: Value,
    ) {
        let event = EventRecord {
            id: Uuid::new_v4().to_string(),
            device_id: self.device_id.clone(),
            level,
            event_type,
            message: message.into(),
            meta: meta.to_string(),
            created_at: Utc::now(),
        };

        match self.store.append(&event).await {
            Ok(()) => debug!(event_id = %event.id, %event_type, "Event recorded"),
            Err(e) => warn!(%event_type, error = %e, "Failed to record event"),
        }
    }

    /// Events matching `filter`, newest first.
    pub async fn events(&self, filter: &EventFilter) -> CoreResult<Vec<EventRecord>> {
        self.store
            .find(filter)
            .await
            .map_err(|e| CoreError::store("find events", e))
    }

    /// Deletes events created before `before`.
    ///
    /// ## Returns
    /// Number of events removed.
    pub async fn purge(&self, before: DateTime<Utc>) -> CoreResult<u64> {
        let removed = self
            .store
            .delete_before(before)
            .await
            .map_err(|e| CoreError::store("purge events", e))?;
        debug!(removed, %before, "Events purged");
        Ok(removed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::memory::MemoryEventStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::json;

    struct BrokenEventStore;

    #[async_trait]
    impl EventStore for BrokenEventStore {
        async fn append(&self, _event: &EventRecord) -> StoreResult<()> {
            Err(StoreError::Backend("disk full".to_string()))
        }

        async fn find(&self, _filter: &EventFilter) -> StoreResult<Vec<EventRecord>> {
            Err(StoreError::Backend("disk full".to_string()))
        }

        async fn delete_before(&self, _before: DateTime<Utc>) -> StoreResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_record_and_filter() {
        let journal = EventJournal::new(Arc::new(MemoryEventStore::new()), "pump-1");

        journal
            .record(
                EventLevel::Info,
                EventType::PriceInitialized,
                "price set",
                json!({ "price": "50.00" }),
            )
            .await;
        journal
            .record(
                EventLevel::Warning,
                EventType::CounterResynced,
                "counter resynced",
                json!({ "previous": 10, "current": 12 }),
            )
            .await;

        let all = journal.events(&EventFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|e| e.device_id == "pump-1"));

        let warnings = journal
            .events(&EventFilter {
                level: Some(EventLevel::Warning),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].event_type, EventType::CounterResynced);

        let meta: Value = serde_json::from_str(&warnings[0].meta).unwrap();
        assert_eq!(meta["current"], 12);
    }

    #[tokio::test]
    async fn test_record_failure_is_swallowed() {
        let journal = EventJournal::new(Arc::new(BrokenEventStore), "pump-1");
        journal
            .record(EventLevel::Info, EventType::RefuelCreated, "x", json!({}))
            .await;
        assert!(journal.events(&EventFilter::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_purge() {
        let journal = EventJournal::new(Arc::new(MemoryEventStore::new()), "pump-1");
        journal
            .record(EventLevel::Info, EventType::RefuelCreated, "x", json!({}))
            .await;

        assert_eq!(journal.purge(Utc::now() - Duration::hours(1)).await.unwrap(), 0);
        assert_eq!(journal.purge(Utc::now() + Duration::hours(1)).await.unwrap(), 1);
    }
}
