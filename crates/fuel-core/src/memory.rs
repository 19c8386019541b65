//! # In-Memory Stores
//!
//! Store implementations backed by `tokio::sync::Mutex`. Each call holds the
//! lock for its whole read-modify-write, which gives the same atomicity the
//! SQLite adapter gets from transactions and conditional updates.
//!
//! ## Usage
//! ```rust
//! use std::sync::Arc;
//! use fuel_core::memory::{MemoryCounterStore, MemoryOperationStore, MemoryPriceStore};
//! use fuel_core::station::FuelStation;
//!
//! let station = FuelStation::builder(
//!     Arc::new(MemoryPriceStore::new()),
//!     Arc::new(MemoryCounterStore::new()),
//!     Arc::new(MemoryOperationStore::new()),
//! )
//! .build();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::store::{CounterStore, EventStore, OperationStore, PriceStore};
use crate::types::{
    within, CounterState, EventFilter, EventRecord, FuelPrice, PriceFilter, RefuelFilter,
    RefuelOperation, RefuelStatus,
};

/// Applies `offset`/`limit` to an already ordered list.
///
/// Rows are kept in insertion order, so a stable sort on `created_at` breaks
/// ties the same way the SQLite adapter does with `rowid`.
fn paginate<T>(rows: Vec<T>, limit: Option<u32>, offset: Option<u32>) -> Vec<T> {
    let offset = offset.unwrap_or(0) as usize;
    let rows = rows.into_iter().skip(offset);
    match limit {
        Some(limit) => rows.take(limit as usize).collect(),
        None => rows.collect(),
    }
}

// =============================================================================
// Prices
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryPriceStore {
    rows: Mutex<Vec<FuelPrice>>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn get_active(&self) -> StoreResult<Option<FuelPrice>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|p| p.is_active).cloned())
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<FuelPrice>> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|p| p.id == id).cloned())
    }

    async fn find(&self, filter: &PriceFilter) -> StoreResult<Vec<FuelPrice>> {
        let rows = self.rows.lock().await;
        let mut matched: Vec<FuelPrice> = rows
            .iter()
            .filter(|p| filter.is_active.map_or(true, |a| p.is_active == a))
            .filter(|p| within(p.created_at, filter.date_from, filter.date_to))
            .cloned()
            .collect();
        matched.sort_by_key(|row| row.created_at);
        Ok(paginate(matched, filter.limit, filter.offset))
    }

    async fn init_active(&self, price: &FuelPrice) -> StoreResult<()> {
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|p| p.is_active) {
            return Err(StoreError::ActivePriceExists);
        }
        if rows.iter().any(|p| p.id == price.id) {
            return Err(StoreError::Duplicate(format!("price id {}", price.id)));
        }
        rows.push(price.clone());
        Ok(())
    }

    async fn change_active(&self, price: &FuelPrice) -> StoreResult<FuelPrice> {
        let mut rows = self.rows.lock().await;
        let previous = rows
            .iter_mut()
            .find(|p| p.is_active)
            .ok_or(StoreError::NoActivePrice)?;

        previous.is_active = false;
        previous.updated_at = Some(price.created_at);
        let previous = previous.clone();

        rows.push(price.clone());
        Ok(previous)
    }
}

// =============================================================================
// Counter
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    state: Mutex<Option<CounterState>>,
    fail_writes: AtomicBool,
}

impl MemoryCounterStore {
    /// An uninitialized counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// A counter already holding `value`.
    pub fn with_value(value: i64) -> Self {
        MemoryCounterStore {
            state: Mutex::new(Some(CounterState::at_now(value))),
            ..Default::default()
        }
    }

    /// Makes every following `save` and `compare_and_swap` fail with a
    /// backend error. Reads keep working.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected counter write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get_current(&self) -> StoreResult<Option<CounterState>> {
        Ok(*self.state.lock().await)
    }

    async fn save(&self, state: &CounterState) -> StoreResult<()> {
        self.check_writable()?;
        *self.state.lock().await = Some(*state);
        Ok(())
    }

    async fn compare_and_swap(&self, expected: i64, state: &CounterState) -> StoreResult<bool> {
        self.check_writable()?;
        let mut current = self.state.lock().await;
        match current.as_ref() {
            Some(c) if c.current_value == expected => {
                *current = Some(*state);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// =============================================================================
// Operations
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryOperationStore {
    rows: Mutex<Vec<RefuelOperation>>,
    fail_transitions: AtomicBool,
    fail_creates: AtomicBool,
    yield_on_reads: AtomicBool,
}

impl MemoryOperationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `transition_status` call fail with a backend
    /// error. Used to exercise partial-failure handling.
    pub fn fail_transitions(&self, fail: bool) {
        self.fail_transitions.store(fail, Ordering::SeqCst);
    }

    /// Makes every following `create` fail with a backend error.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Makes `get_by_id` yield to the scheduler before answering, so
    /// callers joined on one task interleave between read and write.
    pub fn yield_on_reads(&self, enabled: bool) {
        self.yield_on_reads.store(enabled, Ordering::SeqCst);
    }
}

#[async_trait]
impl OperationStore for MemoryOperationStore {
    async fn create(&self, operation: &RefuelOperation) -> StoreResult<()> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected create failure".to_string()));
        }
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|o| o.id == operation.id) {
            return Err(StoreError::Duplicate(format!("operation id {}", operation.id)));
        }
        rows.push(operation.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<RefuelOperation>> {
        if self.yield_on_reads.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|o| o.id == id).cloned())
    }

    async fn find(&self, filter: &RefuelFilter) -> StoreResult<Vec<RefuelOperation>> {
        let rows = self.rows.lock().await;
        let mut matched: Vec<RefuelOperation> = rows
            .iter()
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .filter(|o| within(o.created_at, filter.date_from, filter.date_to))
            .cloned()
            .collect();
        matched.sort_by_key(|row| row.created_at);
        Ok(paginate(matched, filter.limit, filter.offset))
    }

    async fn transition_status(
        &self,
        id: &str,
        from: RefuelStatus,
        to: RefuelStatus,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        if self.fail_transitions.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected transition failure".to_string()));
        }

        let mut rows = self.rows.lock().await;
        let Some(operation) = rows.iter_mut().find(|o| o.id == id && o.status == from) else {
            return Ok(false);
        };

        operation.status = to;
        if to == RefuelStatus::Cancelled {
            operation.cancelled_at = Some(at);
            operation.cancel_reason = reason.map(str::to_string);
        }
        Ok(true)
    }
}

// =============================================================================
// Journal
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryEventStore {
    rows: Mutex<Vec<EventRecord>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: &EventRecord) -> StoreResult<()> {
        self.rows.lock().await.push(event.clone());
        Ok(())
    }

    async fn find(&self, filter: &EventFilter) -> StoreResult<Vec<EventRecord>> {
        let rows = self.rows.lock().await;
        let mut matched: Vec<EventRecord> = rows
            .iter()
            .filter(|e| filter.device_id.as_ref().map_or(true, |d| &e.device_id == d))
            .filter(|e| filter.level.map_or(true, |l| e.level == l))
            .filter(|e| filter.event_type.map_or(true, |t| e.event_type == t))
            .filter(|e| within(e.created_at, filter.date_from, filter.date_to))
            .cloned()
            .collect();
        matched.reverse();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(matched, filter.limit, filter.offset))
    }

    async fn delete_before(&self, before: DateTime<Utc>) -> StoreResult<u64> {
        let mut rows = self.rows.lock().await;
        let initial = rows.len();
        rows.retain(|e| e.created_at >= before);
        Ok((initial - rows.len()) as u64)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use chrono::Duration;

    #[tokio::test]
    async fn test_price_store_single_active() {
        let store = MemoryPriceStore::new();
        let first = FuelPrice::new_active(Money::from_major_minor(50, 0));
        store.init_active(&first).await.unwrap();

        let again = FuelPrice::new_active(Money::from_major_minor(60, 0));
        assert!(matches!(
            store.init_active(&again).await,
            Err(StoreError::ActivePriceExists)
        ));

        let previous = store.change_active(&again).await.unwrap();
        assert_eq!(previous.id, first.id);
        assert!(!previous.is_active);

        let filter = PriceFilter {
            is_active: Some(true),
            ..Default::default()
        };
        assert_eq!(store.find(&filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_counter_compare_and_swap() {
        let store = MemoryCounterStore::new();
        assert!(!store
            .compare_and_swap(0, &CounterState::at_now(5))
            .await
            .unwrap());

        store.save(&CounterState::at_now(10)).await.unwrap();
        assert!(!store
            .compare_and_swap(9, &CounterState::at_now(20))
            .await
            .unwrap());
        assert!(store
            .compare_and_swap(10, &CounterState::at_now(20))
            .await
            .unwrap());
        assert_eq!(store.get_current().await.unwrap().unwrap().current_value, 20);
    }

    #[tokio::test]
    async fn test_paginate_and_delete() {
        let store = MemoryEventStore::new();
        let now = Utc::now();
        for i in 0..5 {
            store
                .append(&EventRecord {
                    id: format!("e{i}"),
                    device_id: "pump-1".to_string(),
                    level: crate::types::EventLevel::Info,
                    event_type: crate::types::EventType::RefuelCreated,
                    message: String::new(),
                    meta: "{}".to_string(),
                    created_at: now - Duration::days(i),
                })
                .await
                .unwrap();
        }

        let page = store
            .find(&EventFilter {
                limit: Some(2),
                offset: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), ["e1", "e2"]);

        let removed = store.delete_before(now - Duration::hours(36)).await.unwrap();
        assert_eq!(removed, 3);
    }
}
