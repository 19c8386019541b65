//! # Store Traits
//!
//! The contracts the core needs from persistence. Implementations live in
//! `fuel-db` (SQLite) and in [`crate::memory`] (tests, tooling).
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PriceStore      ◄── PriceLedger only                                   │
//! │  CounterStore    ◄── CounterLedger (RefuelWorkflow decides when)        │
//! │  OperationStore  ◄── RefuelWorkflow, read by ReportingView              │
//! │  EventStore      ◄── EventJournal                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity Contract
//! - `change_active` deactivates the old price and inserts the new one as one
//!   unit. Two concurrent calls never leave two active rows.
//! - `compare_and_swap` writes the counter only if it still holds `expected`.
//! - `transition_status` updates an operation only if it is still in `from`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::types::{
    CounterState, EventFilter, EventRecord, FuelPrice, PriceFilter, RefuelFilter,
    RefuelOperation, RefuelStatus,
};

/// Persistence for [`FuelPrice`] rows.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// The row with `is_active = true`, if any.
    async fn get_active(&self) -> StoreResult<Option<FuelPrice>>;

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<FuelPrice>>;

    /// Rows matching `filter`, oldest first (ties in insertion order).
    async fn find(&self, filter: &PriceFilter) -> StoreResult<Vec<FuelPrice>>;

    /// Inserts `price` as the first active price.
    ///
    /// Fails with `StoreError::ActivePriceExists` if one is already active.
    async fn init_active(&self, price: &FuelPrice) -> StoreResult<()>;

    /// Atomically deactivates the current active price and inserts `price`.
    ///
    /// Returns the deactivated row. Fails with `StoreError::NoActivePrice`
    /// if nothing was active.
    async fn change_active(&self, price: &FuelPrice) -> StoreResult<FuelPrice>;
}

/// Persistence for the singleton [`CounterState`] row.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// The reading, or `None` if the counter was never written.
    async fn get_current(&self) -> StoreResult<Option<CounterState>>;

    /// Unconditional overwrite (creates the row on first write).
    async fn save(&self, state: &CounterState) -> StoreResult<()>;

    /// Writes `state` only if the stored value is still `expected`.
    ///
    /// Returns `false` when the row is missing or holds another value.
    async fn compare_and_swap(&self, expected: i64, state: &CounterState) -> StoreResult<bool>;
}

/// Persistence for [`RefuelOperation`] rows.
#[async_trait]
pub trait OperationStore: Send + Sync {
    async fn create(&self, operation: &RefuelOperation) -> StoreResult<()>;

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<RefuelOperation>>;

    /// Rows matching `filter`, oldest first (ties in insertion order).
    async fn find(&self, filter: &RefuelFilter) -> StoreResult<Vec<RefuelOperation>>;

    /// Moves operation `id` from `from` to `to`.
    ///
    /// `cancelled_at` and `reason` are recorded when `to` is Cancelled.
    /// Returns `false` when the operation is missing or no longer in `from`.
    async fn transition_status(
        &self,
        id: &str,
        from: RefuelStatus,
        to: RefuelStatus,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;
}

/// Persistence for the event journal.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: &EventRecord) -> StoreResult<()>;

    /// Rows matching `filter`, newest first (ties newest-inserted first).
    async fn find(&self, filter: &EventFilter) -> StoreResult<Vec<EventRecord>>;

    /// Deletes entries created before `before`; returns how many were removed.
    async fn delete_before(&self, before: DateTime<Utc>) -> StoreResult<u64>;
}
