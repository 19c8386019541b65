//! # Fuel Station Facade
//!
//! The single boundary entry points call. Wires the ledgers, the refuel
//! workflow, reporting and the journal over one set of stores.
//!
//! ## Wiring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FuelStation                                                            │
//! │  ├── PriceLedger      ◄── Arc<dyn PriceStore>                           │
//! │  ├── CounterLedger    ◄── Arc<dyn CounterStore>                         │
//! │  ├── RefuelWorkflow   ◄── both ledgers + Arc<dyn OperationStore>        │
//! │  ├── ReportingView    ◄── RefuelWorkflow                                │
//! │  └── EventJournal?    ◄── Arc<dyn EventStore> + device id               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation is journaled after it commits. Without a journal the
//! event calls return nothing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::counter::CounterLedger;
use crate::error::CoreResult;
use crate::journal::EventJournal;
use crate::money::Money;
use crate::price::PriceLedger;
use crate::refuel::{RefuelPolicy, RefuelWorkflow};
use crate::reporting::{RefuelStatistics, ReportingView};
use crate::store::{CounterStore, EventStore, OperationStore, PriceStore};
use crate::types::{
    CounterState, EventFilter, EventLevel, EventRecord, EventType, FuelPrice, PriceFilter,
    RefuelOperation, RefuelStatus,
};
use crate::validation::validate_window;

// =============================================================================
// Builder
// =============================================================================

pub struct FuelStationBuilder {
    prices: Arc<dyn PriceStore>,
    counter: Arc<dyn CounterStore>,
    operations: Arc<dyn OperationStore>,
    journal: Option<EventJournal>,
    policy: RefuelPolicy,
}

impl FuelStationBuilder {
    /// Journals events to `store`, tagged with `device_id`.
    pub fn journal(mut self, store: Arc<dyn EventStore>, device_id: impl Into<String>) -> Self {
        self.journal = Some(EventJournal::new(store, device_id));
        self
    }

    pub fn policy(mut self, policy: RefuelPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> FuelStation {
        let prices = PriceLedger::new(self.prices);
        let counter = CounterLedger::new(self.counter);
        let workflow =
            RefuelWorkflow::new(prices.clone(), counter.clone(), self.operations, self.policy);
        let reporting = ReportingView::new(workflow.clone());

        FuelStation {
            prices,
            counter,
            workflow,
            reporting,
            journal: self.journal,
        }
    }
}

// =============================================================================
// Facade
// =============================================================================

#[derive(Clone)]
pub struct FuelStation {
    prices: PriceLedger,
    counter: CounterLedger,
    workflow: RefuelWorkflow,
    reporting: ReportingView,
    journal: Option<EventJournal>,
}

impl FuelStation {
    pub fn builder(
        prices: Arc<dyn PriceStore>,
        counter: Arc<dyn CounterStore>,
        operations: Arc<dyn OperationStore>,
    ) -> FuelStationBuilder {
        FuelStationBuilder {
            prices,
            counter,
            operations,
            journal: None,
            policy: RefuelPolicy::default(),
        }
    }

    async fn journal(
        &self,
        level: EventLevel,
        event_type: EventType,
        message: String,
        meta: serde_json::Value,
    ) {
        if let Some(journal) = &self.journal {
            journal.record(level, event_type, message, meta).await;
        }
    }

    // =========================================================================
    // Price
    // =========================================================================

    pub async fn get_price(&self) -> CoreResult<FuelPrice> {
        self.prices.get_active().await
    }

    pub async fn get_price_by_id(&self, id: &str) -> CoreResult<FuelPrice> {
        self.prices.get_by_id(id).await
    }

    pub async fn init_price(&self, price: Money) -> CoreResult<FuelPrice> {
        let row = self.prices.init_price(price).await?;
        self.journal(
            EventLevel::Info,
            EventType::PriceInitialized,
            format!("Price initialized at {}", row.price_per_liter),
            json!({ "price_id": row.id, "price": row.price_per_liter.to_string() }),
        )
        .await;
        Ok(row)
    }

    /// Replaces the active price; returns the new active row.
    pub async fn change_price(&self, price: Money) -> CoreResult<FuelPrice> {
        let (previous, row) = self.prices.change_price(price).await?;
        self.journal(
            EventLevel::Info,
            EventType::PriceChanged,
            format!(
                "Price changed from {} to {}",
                previous.price_per_liter, row.price_per_liter
            ),
            json!({
                "previous_id": previous.id,
                "previous_price": previous.price_per_liter.to_string(),
                "price_id": row.id,
                "price": row.price_per_liter.to_string(),
            }),
        )
        .await;
        Ok(row)
    }

    /// Prices set within `[from, to)`, oldest first.
    pub async fn price_history(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<FuelPrice>> {
        validate_window(from, to)?;
        self.prices
            .find(&PriceFilter {
                date_from: Some(from),
                date_to: Some(to),
                ..Default::default()
            })
            .await
    }

    // =========================================================================
    // Counter
    // =========================================================================

    pub async fn get_counter(&self) -> CoreResult<CounterState> {
        self.counter.get_current().await
    }

    /// Administrative override of the counter reading. Accepts any
    /// non-negative value, including a lower one.
    pub async fn set_counter(&self, value: i64) -> CoreResult<CounterState> {
        let previous = self.counter.read().await?.map(|c| c.current_value);
        let state = self.counter.save(value).await?;
        self.journal(
            EventLevel::Warning,
            EventType::CounterOverridden,
            format!("Counter set to {value}"),
            json!({ "previous": previous, "current": value }),
        )
        .await;
        Ok(state)
    }

    /// Moves the counter forward; rejects a lower reading.
    pub async fn advance_counter(&self, value: i64) -> CoreResult<CounterState> {
        let previous = self.counter.read().await?.map(|c| c.current_value);
        let state = self.counter.advance(value).await?;
        self.journal(
            EventLevel::Info,
            EventType::CounterAdvanced,
            format!("Counter advanced to {value}"),
            json!({ "previous": previous, "current": state.current_value }),
        )
        .await;
        Ok(state)
    }

    // =========================================================================
    // Refuel
    // =========================================================================

    pub async fn create_refuel(
        &self,
        amount_paid: Money,
        counter_before: i64,
    ) -> CoreResult<RefuelOperation> {
        let prepared = self
            .workflow
            .prepare_refuel(amount_paid, counter_before)
            .await?;

        // Journaled before the insert: the overwrite stands even if it fails.
        if let Some(resync) = prepared.resync {
            let op_id = &prepared.operation.id;
            self.journal(
                EventLevel::Warning,
                EventType::CounterResynced,
                format!("Counter resynced to {} on refuel {}", resync.current, op_id),
                json!({
                    "operation_id": op_id,
                    "previous": resync.previous,
                    "current": resync.current,
                }),
            )
            .await;
        }

        let op = self.workflow.commit_refuel(prepared).await?;

        self.journal(
            EventLevel::Info,
            EventType::RefuelCreated,
            format!("Refuel {} created for {}", op.id, op.amount_paid),
            json!({
                "operation_id": op.id,
                "amount_paid": op.amount_paid.to_string(),
                "price_per_liter": op.price_per_liter.to_string(),
                "liters": op.calculated_liters,
                "counter_before": op.counter_before,
                "counter_after": op.counter_after,
            }),
        )
        .await;
        Ok(op)
    }

    pub async fn confirm_refuel(&self, id: &str) -> CoreResult<RefuelOperation> {
        let op = self.workflow.confirm_refuel(id).await?;
        self.journal(
            EventLevel::Info,
            EventType::RefuelConfirmed,
            format!("Refuel {} confirmed", op.id),
            json!({ "operation_id": op.id, "counter": op.counter_after }),
        )
        .await;
        Ok(op)
    }

    pub async fn cancel_refuel(&self, id: &str, reason: &str) -> CoreResult<RefuelOperation> {
        let cancelled = self.workflow.cancel_refuel(id, reason).await?;
        let op = cancelled.operation;
        self.journal(
            EventLevel::Info,
            EventType::RefuelCancelled,
            format!("Refuel {} cancelled", op.id),
            json!({
                "operation_id": op.id,
                "reason": op.cancel_reason,
                "counter_from": cancelled.reversal.map(|r| r.from),
                "counter_to": cancelled.reversal.map(|r| r.to),
            }),
        )
        .await;
        Ok(op)
    }

    pub async fn get_operation(&self, id: &str) -> CoreResult<RefuelOperation> {
        self.workflow.get_operation(id).await
    }

    pub async fn pending_operations(&self) -> CoreResult<Vec<RefuelOperation>> {
        self.workflow.pending_operations().await
    }

    pub async fn has_pending_operations(&self) -> CoreResult<bool> {
        self.workflow.has_pending_operations().await
    }

    pub async fn operation_history(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        status: Option<RefuelStatus>,
    ) -> CoreResult<Vec<RefuelOperation>> {
        self.workflow.operation_history(from, to, status).await
    }

    /// Operations in every status created within `[from, to)`.
    pub async fn all_operations(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<RefuelOperation>> {
        self.workflow.operation_history(from, to, None).await
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    pub async fn total_revenue(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> CoreResult<Money> {
        self.workflow.total_revenue(from, to).await
    }

    pub async fn total_liters(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> CoreResult<f64> {
        self.workflow.total_liters(from, to).await
    }

    pub async fn statistics(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<RefuelStatistics> {
        self.reporting.statistics(from, to).await
    }

    // =========================================================================
    // Journal
    // =========================================================================

    pub async fn events(&self, filter: &EventFilter) -> CoreResult<Vec<EventRecord>> {
        match &self.journal {
            Some(journal) => journal.events(filter).await,
            None => Ok(Vec::new()),
        }
    }

    /// Deletes journal entries older than `before`; returns how many.
    pub async fn purge_events(&self, before: DateTime<Utc>) -> CoreResult<u64> {
        match &self.journal {
            Some(journal) => journal.purge(before).await,
            None => Ok(0),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
