//! # Refuel Workflow
//!
//! The refuel state machine and its interaction with the counter.
//!
//! ## Refuel Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_refuel(amount, counter_before)                                  │
//! │    ├── validate amount                                                  │
//! │    ├── read active price (frozen into the operation)                    │
//! │    ├── counter != counter_before?  → resync (or CounterDrift)           │
//! │    └── insert Created operation     (counter NOT moved)                 │
//! │        (prepare_refuel / commit_refuel when the caller needs the        │
//! │         resync before the insert)                                       │
//! │                                                                         │
//! │  confirm_refuel(id)                                                     │
//! │    ├── status must be Created                                           │
//! │    ├── CAS counter: counter_before → counter_after                      │
//! │    └── status Created → Confirmed   (conditional)                       │
//! │                                                                         │
//! │  cancel_refuel(id, reason)                                              │
//! │    ├── status must not be Cancelled                                     │
//! │    ├── status → Cancelled           (conditional, claims the cancel)    │
//! │    └── if was Confirmed: CAS counter: live → live - dispensed           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Partial Failures
//! Confirm and cancel are two dependent writes. Confirm moves the counter,
//! then the status; cancel claims the status, then moves the counter. If the
//! second write does not apply, the call returns `CoreError::Inconsistent`.
//! Nothing is retried or compensated.
//!
//! ## Reversal
//! Cancelling a confirmed operation subtracts its dispensed units from the
//! *live* counter, not from the frozen `counter_after`. Any counter movement
//! since the confirmation is carried into the reversed reading.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::counter::CounterLedger;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::price::PriceLedger;
use crate::store::OperationStore;
use crate::types::{RefuelFilter, RefuelOperation, RefuelStatus};
use crate::validation::{
    validate_amount, validate_counter_value, validate_reason, validate_window,
};

// =============================================================================
// Policy & Outcomes
// =============================================================================

/// Knobs for [`RefuelWorkflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefuelPolicy {
    /// When the stored counter disagrees with the `counter_before` keyed in
    /// by the operator, overwrite the stored counter (`true`) or reject the
    /// refuel with `CounterDrift` (`false`).
    pub reconcile_counter: bool,
}

impl Default for RefuelPolicy {
    fn default() -> Self {
        RefuelPolicy {
            reconcile_counter: true,
        }
    }
}

/// A counter overwrite performed while creating a refuel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterResync {
    /// Stored reading before the overwrite (`None` if never written).
    pub previous: Option<i64>,
    pub current: i64,
}

/// A validated refuel not yet stored. See [`RefuelWorkflow::prepare_refuel`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRefuel {
    pub operation: RefuelOperation,
    pub resync: Option<CounterResync>,
}

/// Result of [`RefuelWorkflow::create_refuel`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedRefuel {
    pub operation: RefuelOperation,
    pub resync: Option<CounterResync>,
}

/// Counter movement performed while cancelling a confirmed refuel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterReversal {
    pub from: i64,
    pub to: i64,
}

/// Result of [`RefuelWorkflow::cancel_refuel`].
#[derive(Debug, Clone, PartialEq)]
pub struct CancelledRefuel {
    pub operation: RefuelOperation,
    /// Set when the operation had been confirmed.
    pub reversal: Option<CounterReversal>,
}

// =============================================================================
// Workflow
// =============================================================================

#[derive(Clone)]
pub struct RefuelWorkflow {
    prices: PriceLedger,
    counter: CounterLedger,
    operations: Arc<dyn OperationStore>,
    policy: RefuelPolicy,
}

impl RefuelWorkflow {
    pub fn new(
        prices: PriceLedger,
        counter: CounterLedger,
        operations: Arc<dyn OperationStore>,
        policy: RefuelPolicy,
    ) -> Self {
        RefuelWorkflow {
            prices,
            counter,
            operations,
            policy,
        }
    }

    pub fn policy(&self) -> RefuelPolicy {
        self.policy
    }

    /// Records a paid refuel at the active price.
    ///
    /// Shorthand for [`prepare_refuel`](Self::prepare_refuel) followed by
    /// [`commit_refuel`](Self::commit_refuel).
    ///
    /// ## Arguments
    /// * `amount_paid` - Money handed over by the customer
    /// * `counter_before` - Dispenser reading keyed in by the operator
    pub async fn create_refuel(
        &self,
        amount_paid: Money,
        counter_before: i64,
    ) -> CoreResult<CreatedRefuel> {
        let prepared = self.prepare_refuel(amount_paid, counter_before).await?;
        let resync = prepared.resync;
        let operation = self.commit_refuel(prepared).await?;
        Ok(CreatedRefuel { operation, resync })
    }

    /// Validates a refuel, freezes the active price into it and resyncs the
    /// counter when the operator reading disagrees with the stored one.
    ///
    /// A resync is committed here, before the operation exists. It stays
    /// applied even if [`commit_refuel`](Self::commit_refuel) later fails.
    ///
    /// ## Errors
    /// - `InvalidAmount` if `amount_paid` is outside `(0, 100000.00]`
    /// - `InvalidCounterValue` if `counter_before` is negative
    /// - `NoActivePrice` if no price was ever set
    /// - `CounterDrift` if the stored counter disagrees and reconciliation
    ///   is disabled
    pub async fn prepare_refuel(
        &self,
        amount_paid: Money,
        counter_before: i64,
    ) -> CoreResult<PreparedRefuel> {
        validate_amount(amount_paid)?;
        let price = self.prices.get_active().await?;
        validate_counter_value(counter_before)?;

        let units = amount_paid.counter_units_at(price.price_per_liter);
        let counter_after = counter_before.checked_add(units).ok_or_else(|| {
            ValidationError::InvalidFormat {
                field: "counter_before".to_string(),
                reason: "counter would overflow".to_string(),
            }
        })?;

        let id = Uuid::new_v4().to_string();

        let stored = self.counter.read().await?.map(|c| c.current_value);
        let resync = if stored == Some(counter_before) {
            None
        } else if self.policy.reconcile_counter {
            self.counter.save(counter_before).await?;
            warn!(
                operation_id = %id,
                stored = ?stored,
                counter_before,
                "Counter resynced to operator reading"
            );
            Some(CounterResync {
                previous: stored,
                current: counter_before,
            })
        } else {
            return Err(CoreError::CounterDrift {
                operation_id: id,
                expected: counter_before,
                actual: stored,
            });
        };

        let operation = RefuelOperation {
            id,
            amount_paid,
            calculated_liters: amount_paid.liters_at(price.price_per_liter),
            price_per_liter: price.price_per_liter,
            counter_before,
            counter_after,
            status: RefuelStatus::Created,
            created_at: Utc::now(),
            cancelled_at: None,
            cancel_reason: None,
        };

        Ok(PreparedRefuel { operation, resync })
    }

    /// Inserts a prepared operation in status Created.
    pub async fn commit_refuel(&self, prepared: PreparedRefuel) -> CoreResult<RefuelOperation> {
        let operation = prepared.operation;
        self.operations
            .create(&operation)
            .await
            .map_err(|e| CoreError::store("create refuel: insert operation", e))?;

        info!(
            operation_id = %operation.id,
            amount = %operation.amount_paid,
            price = %operation.price_per_liter,
            counter_before = operation.counter_before,
            counter_after = operation.counter_after,
            "Refuel created"
        );
        Ok(operation)
    }

    /// Confirms a Created refuel and advances the counter to `counter_after`.
    ///
    /// ## Errors
    /// - `OperationNotFound`
    /// - `InvalidOperationStatus` unless the operation is Created
    /// - `CounterDrift` if the live counter is not `counter_before`
    ///   (the counter is left untouched)
    /// - `Inconsistent` if the counter moved but the status did not
    pub async fn confirm_refuel(&self, id: &str) -> CoreResult<RefuelOperation> {
        let mut operation = self.get_operation(id).await?;

        if !operation.status.can_transition_to(RefuelStatus::Confirmed) {
            return Err(CoreError::InvalidOperationStatus {
                operation_id: operation.id,
                current: operation.status,
                attempted: "confirm",
            });
        }

        let live = self.counter.read().await?.map(|c| c.current_value);
        if live != Some(operation.counter_before) {
            return Err(CoreError::CounterDrift {
                operation_id: operation.id,
                expected: operation.counter_before,
                actual: live,
            });
        }

        let swapped = self
            .counter
            .compare_and_swap(operation.counter_before, operation.counter_after)
            .await?;
        if !swapped {
            let actual = self.counter.read().await?.map(|c| c.current_value);
            return Err(CoreError::CounterDrift {
                operation_id: operation.id,
                expected: operation.counter_before,
                actual,
            });
        }

        let transitioned = self
            .operations
            .transition_status(
                &operation.id,
                RefuelStatus::Created,
                RefuelStatus::Confirmed,
                None,
                Utc::now(),
            )
            .await;

        match transitioned {
            Ok(true) => {}
            Ok(false) => {
                return Err(self.inconsistent(
                    &operation.id,
                    format!(
                        "counter advanced to {} but status was changed concurrently",
                        operation.counter_after
                    ),
                ))
            }
            Err(e) => {
                return Err(self.inconsistent(
                    &operation.id,
                    format!(
                        "counter advanced to {} but status update failed: {e}",
                        operation.counter_after
                    ),
                ))
            }
        }

        operation.status = RefuelStatus::Confirmed;
        info!(
            operation_id = %operation.id,
            counter = operation.counter_after,
            "Refuel confirmed"
        );
        Ok(operation)
    }

    /// Cancels a Created or Confirmed refuel.
    ///
    /// A Confirmed operation has its dispensed units subtracted from the live
    /// counter. A Created one leaves the counter alone.
    ///
    /// The status is claimed first with a conditional update, so of two
    /// concurrent cancels only one reaches the counter.
    ///
    /// ## Errors
    /// - `Validation` if `reason` is blank or longer than 500 characters
    /// - `OperationNotFound`
    /// - `InvalidOperationStatus` if already Cancelled
    /// - `InvalidCounterValue` if the reversal would go below zero
    /// - `Inconsistent` if the status was claimed but the counter could not
    ///   be reversed
    pub async fn cancel_refuel(&self, id: &str, reason: &str) -> CoreResult<CancelledRefuel> {
        let reason = validate_reason(reason)?;
        let mut operation = self.get_operation(id).await?;

        if !operation.status.can_transition_to(RefuelStatus::Cancelled) {
            return Err(CoreError::InvalidOperationStatus {
                operation_id: operation.id,
                current: operation.status,
                attempted: "cancel",
            });
        }

        let confirmed = operation.status == RefuelStatus::Confirmed;
        if confirmed {
            // Reject an impossible reversal before the status is touched.
            let live = self.counter.get_current().await?.current_value;
            validate_counter_value(live - operation.dispensed_units())?;
        }

        let now = Utc::now();
        let claimed = self
            .operations
            .transition_status(
                &operation.id,
                operation.status,
                RefuelStatus::Cancelled,
                Some(reason.as_str()),
                now,
            )
            .await
            .map_err(|e| CoreError::store("cancel refuel: update status", e))?;

        if !claimed {
            let current = self.get_operation(&operation.id).await?.status;
            return Err(CoreError::InvalidOperationStatus {
                operation_id: operation.id,
                current,
                attempted: "cancel",
            });
        }

        let reversal = if confirmed {
            match self.reverse_counter(&operation).await {
                Ok(reversal) => Some(reversal),
                Err(e) => {
                    return Err(self.inconsistent(
                        &operation.id,
                        format!("status set to cancelled but counter was not reversed: {e}"),
                    ))
                }
            }
        } else {
            None
        };

        operation.status = RefuelStatus::Cancelled;
        operation.cancelled_at = Some(now);
        operation.cancel_reason = Some(reason);

        info!(
            operation_id = %operation.id,
            reversed = reversal.is_some(),
            "Refuel cancelled"
        );
        Ok(CancelledRefuel {
            operation,
            reversal,
        })
    }

    /// Subtracts the operation's dispensed units from the live counter.
    async fn reverse_counter(&self, operation: &RefuelOperation) -> CoreResult<CounterReversal> {
        let live = self.counter.get_current().await?.current_value;
        let target = live - operation.dispensed_units();
        validate_counter_value(target)?;

        if live != operation.counter_after {
            warn!(
                operation_id = %operation.id,
                live,
                counter_after = operation.counter_after,
                "Reversing against a counter that moved since confirmation"
            );
        }

        if !self.counter.compare_and_swap(live, target).await? {
            let actual = self.counter.read().await?.map(|c| c.current_value);
            return Err(CoreError::CounterDrift {
                operation_id: operation.id.clone(),
                expected: live,
                actual,
            });
        }

        Ok(CounterReversal {
            from: live,
            to: target,
        })
    }

    fn inconsistent(&self, operation_id: &str, detail: String) -> CoreError {
        error!(operation_id, %detail, "Refuel left inconsistent, needs manual reconciliation");
        CoreError::Inconsistent {
            operation_id: operation_id.to_string(),
            detail,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// ## Errors
    /// - `OperationNotFound`
    pub async fn get_operation(&self, id: &str) -> CoreResult<RefuelOperation> {
        self.operations
            .get_by_id(id)
            .await
            .map_err(|e| CoreError::store("get refuel operation", e))?
            .ok_or_else(|| CoreError::OperationNotFound(id.to_string()))
    }

    /// Operations matching `filter`, oldest first.
    pub async fn find_operations(&self, filter: &RefuelFilter) -> CoreResult<Vec<RefuelOperation>> {
        debug!(?filter, "Finding refuel operations");
        self.operations
            .find(filter)
            .await
            .map_err(|e| CoreError::store("find refuel operations", e))
    }

    /// Operations created within `[from, to)`, optionally in one status.
    pub async fn operation_history(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        status: Option<RefuelStatus>,
    ) -> CoreResult<Vec<RefuelOperation>> {
        validate_window(from, to)?;
        self.find_operations(&RefuelFilter::in_window(status, from, to))
            .await
    }

    /// Operations still waiting for confirm or cancel.
    pub async fn pending_operations(&self) -> CoreResult<Vec<RefuelOperation>> {
        self.find_operations(&RefuelFilter {
            status: Some(RefuelStatus::Created),
            ..Default::default()
        })
        .await
    }

    pub async fn has_pending_operations(&self) -> CoreResult<bool> {
        let page = self
            .find_operations(&RefuelFilter {
                status: Some(RefuelStatus::Created),
                limit: Some(1),
                ..Default::default()
            })
            .await?;
        Ok(!page.is_empty())
    }

    /// Sum of `amount_paid` over Confirmed operations in `[from, to)`.
    pub async fn total_revenue(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> CoreResult<Money> {
        let confirmed = self
            .operation_history(from, to, Some(RefuelStatus::Confirmed))
            .await?;
        Ok(confirmed.iter().map(|o| o.amount_paid).sum())
    }

    /// Sum of `calculated_liters` over Confirmed operations in `[from, to)`.
    pub async fn total_liters(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> CoreResult<f64> {
        let confirmed = self
            .operation_history(from, to, Some(RefuelStatus::Confirmed))
            .await?;
        Ok(confirmed.iter().map(|o| o.calculated_liters).sum())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCounterStore, MemoryOperationStore, MemoryPriceStore};
    use chrono::Duration;

    struct Fixture {
        workflow: RefuelWorkflow,
        prices: PriceLedger,
        counter: CounterLedger,
        counter_store: Arc<MemoryCounterStore>,
        operations: Arc<MemoryOperationStore>,
    }

    async fn fixture(price: Money, counter: Option<i64>, policy: RefuelPolicy) -> Fixture {
        let prices = PriceLedger::new(Arc::new(MemoryPriceStore::new()));
        prices.init_price(price).await.unwrap();

        let counter_store = Arc::new(match counter {
            Some(v) => MemoryCounterStore::with_value(v),
            None => MemoryCounterStore::new(),
        });
        let counter = CounterLedger::new(counter_store.clone());
        let operations = Arc::new(MemoryOperationStore::new());

        let workflow =
            RefuelWorkflow::new(prices.clone(), counter.clone(), operations.clone(), policy);
        Fixture {
            workflow,
            prices,
            counter,
            counter_store,
            operations,
        }
    }

    fn rub(major: i64) -> Money {
        Money::from_major_minor(major, 0)
    }

    async fn live(f: &Fixture) -> i64 {
        f.counter.get_current().await.unwrap().current_value
    }

    #[tokio::test]
    async fn test_create_freezes_price_and_leaves_counter() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;

        let created = f.workflow.create_refuel(rub(500), 1000).await.unwrap();
        let op = created.operation;

        assert!(created.resync.is_none());
        assert_eq!(op.status, RefuelStatus::Created);
        assert_eq!(op.calculated_liters, 10.0);
        assert_eq!(op.counter_after, 1100);
        assert_eq!(live(&f).await, 1000);

        f.prices.change_price(rub(60)).await.unwrap();
        let stored = f.workflow.get_operation(&op.id).await.unwrap();
        assert_eq!(stored.price_per_liter, rub(50));
    }

    #[tokio::test]
    async fn test_counter_after_formula() {
        let cases = [
            (Money::from_cents(5_000), Money::from_cents(5_240), 0, 9),
            (rub(100), rub(30), 77, 110),
            (Money::from_cents(70), Money::from_cents(7), 5, 105),
            (Money::from_cents(1), rub(10_000), 12, 12),
            (rub(100_000), Money::from_cents(1), 0, 100_000_000),
        ];

        for (amount, price, before, expected_after) in cases {
            let f = fixture(price, Some(before), RefuelPolicy::default()).await;
            let op = f.workflow.create_refuel(amount, before).await.unwrap().operation;

            assert_eq!(op.counter_after, expected_after, "{amount} at {price}");
            assert!(op.counter_after >= op.counter_before);
        }
    }

    #[tokio::test]
    async fn test_create_validation() {
        let f = fixture(rub(50), Some(0), RefuelPolicy::default()).await;

        assert!(matches!(
            f.workflow.create_refuel(Money::zero(), 0).await,
            Err(CoreError::InvalidAmount { .. })
        ));
        assert!(matches!(
            f.workflow.create_refuel(Money::from_major_minor(100_000, 1), 0).await,
            Err(CoreError::InvalidAmount { .. })
        ));
        assert!(matches!(
            f.workflow.create_refuel(rub(10), -1).await,
            Err(CoreError::InvalidCounterValue { value: -1 })
        ));
        assert!(!f.workflow.has_pending_operations().await.unwrap());
    }

    #[tokio::test]
    async fn test_create_without_price() {
        let workflow = RefuelWorkflow::new(
            PriceLedger::new(Arc::new(MemoryPriceStore::new())),
            CounterLedger::new(Arc::new(MemoryCounterStore::with_value(0))),
            Arc::new(MemoryOperationStore::new()),
            RefuelPolicy::default(),
        );
        assert!(matches!(
            workflow.create_refuel(rub(100), 0).await,
            Err(CoreError::NoActivePrice)
        ));
    }

    #[tokio::test]
    async fn test_create_resyncs_counter() {
        let f = fixture(rub(50), None, RefuelPolicy::default()).await;

        let created = f.workflow.create_refuel(rub(100), 400).await.unwrap();
        assert_eq!(
            created.resync,
            Some(CounterResync {
                previous: None,
                current: 400
            })
        );
        assert_eq!(live(&f).await, 400);

        let created = f.workflow.create_refuel(rub(100), 350).await.unwrap();
        assert_eq!(created.resync.unwrap().previous, Some(400));
        assert_eq!(live(&f).await, 350);
    }

    #[tokio::test]
    async fn test_create_rejects_drift_without_reconcile() {
        let policy = RefuelPolicy {
            reconcile_counter: false,
        };
        let f = fixture(rub(50), Some(1000), policy).await;

        assert!(matches!(
            f.workflow.create_refuel(rub(100), 900).await,
            Err(CoreError::CounterDrift {
                expected: 900,
                actual: Some(1000),
                ..
            })
        ));
        assert_eq!(live(&f).await, 1000);
        assert!(f.workflow.pending_operations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_advances_counter() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;
        let op = f.workflow.create_refuel(rub(500), 1000).await.unwrap().operation;

        let confirmed = f.workflow.confirm_refuel(&op.id).await.unwrap();
        assert_eq!(confirmed.status, RefuelStatus::Confirmed);
        assert_eq!(live(&f).await, 1100);

        assert!(matches!(
            f.workflow.confirm_refuel(&op.id).await,
            Err(CoreError::InvalidOperationStatus {
                current: RefuelStatus::Confirmed,
                ..
            })
        ));
        assert_eq!(live(&f).await, 1100);
    }

    #[tokio::test]
    async fn test_confirm_with_drift_leaves_counter() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;
        let op = f.workflow.create_refuel(rub(500), 1000).await.unwrap().operation;

        f.counter.save(1005).await.unwrap();

        assert!(matches!(
            f.workflow.confirm_refuel(&op.id).await,
            Err(CoreError::CounterDrift {
                expected: 1000,
                actual: Some(1005),
                ..
            })
        ));
        assert_eq!(live(&f).await, 1005);
        assert_eq!(
            f.workflow.get_operation(&op.id).await.unwrap().status,
            RefuelStatus::Created
        );
    }

    #[tokio::test]
    async fn test_confirm_unknown_operation() {
        let f = fixture(rub(50), Some(0), RefuelPolicy::default()).await;
        assert!(matches!(
            f.workflow.confirm_refuel("nope").await,
            Err(CoreError::OperationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_confirm_reports_inconsistent_state() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;
        let op = f.workflow.create_refuel(rub(500), 1000).await.unwrap().operation;

        f.operations.fail_transitions(true);
        assert!(matches!(
            f.workflow.confirm_refuel(&op.id).await,
            Err(CoreError::Inconsistent { .. })
        ));

        // The counter write committed; the status did not.
        assert_eq!(live(&f).await, 1100);
        f.operations.fail_transitions(false);
        assert_eq!(
            f.workflow.get_operation(&op.id).await.unwrap().status,
            RefuelStatus::Created
        );
    }

    #[tokio::test]
    async fn test_cancel_created_leaves_counter() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;
        let op = f.workflow.create_refuel(rub(500), 1000).await.unwrap().operation;

        let cancelled = f.workflow.cancel_refuel(&op.id, "driver left").await.unwrap();
        assert!(cancelled.reversal.is_none());
        assert_eq!(cancelled.operation.status, RefuelStatus::Cancelled);
        assert_eq!(live(&f).await, 1000);

        let stored = f.workflow.get_operation(&op.id).await.unwrap();
        assert_eq!(stored.cancel_reason.as_deref(), Some("driver left"));
        assert!(stored.cancelled_at.is_some());

        assert!(matches!(
            f.workflow.confirm_refuel(&op.id).await,
            Err(CoreError::InvalidOperationStatus { .. })
        ));
        assert!(matches!(
            f.workflow.cancel_refuel(&op.id, "again").await,
            Err(CoreError::InvalidOperationStatus { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_confirmed_reverses_dispensed_units() {
        let f = fixture(rub(30), Some(77), RefuelPolicy::default()).await;
        let op = f.workflow.create_refuel(rub(100), 77).await.unwrap().operation;
        f.workflow.confirm_refuel(&op.id).await.unwrap();
        assert_eq!(live(&f).await, 110);

        let cancelled = f.workflow.cancel_refuel(&op.id, "pump fault").await.unwrap();
        assert_eq!(
            cancelled.reversal,
            Some(CounterReversal { from: 110, to: 77 })
        );
        assert_eq!(live(&f).await, 77);
    }

    #[tokio::test]
    async fn test_cancel_requires_reason() {
        let f = fixture(rub(50), Some(0), RefuelPolicy::default()).await;
        let op = f.workflow.create_refuel(rub(50), 0).await.unwrap().operation;

        let err = f.workflow.cancel_refuel(&op.id, "   ").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            f.workflow.get_operation(&op.id).await.unwrap().status,
            RefuelStatus::Created
        );
    }

    #[tokio::test]
    async fn test_cancel_rejects_negative_reversal() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;
        let op = f.workflow.create_refuel(rub(500), 1000).await.unwrap().operation;
        f.workflow.confirm_refuel(&op.id).await.unwrap();

        f.counter.save(40).await.unwrap();

        assert!(matches!(
            f.workflow.cancel_refuel(&op.id, "dispute").await,
            Err(CoreError::InvalidCounterValue { value: -60 })
        ));
        assert_eq!(live(&f).await, 40);
        assert_eq!(
            f.workflow.get_operation(&op.id).await.unwrap().status,
            RefuelStatus::Confirmed
        );
    }

    /// Reversal works on the live reading, so any movement since the
    /// confirmation survives the cancel.
    #[tokio::test]
    async fn test_cancel_reverses_live_counter_not_snapshot() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;

        let first = f.workflow.create_refuel(rub(500), 1000).await.unwrap().operation;
        f.workflow.confirm_refuel(&first.id).await.unwrap();

        let second = f.workflow.create_refuel(rub(250), 1100).await.unwrap().operation;
        f.workflow.confirm_refuel(&second.id).await.unwrap();
        assert_eq!(live(&f).await, 1150);

        let cancelled = f.workflow.cancel_refuel(&first.id, "dispute").await.unwrap();
        let reversal = cancelled.reversal.unwrap();

        assert_eq!(reversal.from, 1150);
        assert_eq!(reversal.to, 1050);
        assert_ne!(reversal.from, first.counter_after);
        assert_ne!(reversal.to, first.counter_before);
        assert_eq!(live(&f).await, 1050);
    }

    #[tokio::test]
    async fn test_cancel_status_failure_leaves_counter() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;
        let op = f.workflow.create_refuel(rub(500), 1000).await.unwrap().operation;
        f.workflow.confirm_refuel(&op.id).await.unwrap();

        f.operations.fail_transitions(true);
        assert!(matches!(
            f.workflow.cancel_refuel(&op.id, "dispute").await,
            Err(CoreError::Store { .. })
        ));
        assert_eq!(live(&f).await, 1100);

        f.operations.fail_transitions(false);
        assert_eq!(
            f.workflow.get_operation(&op.id).await.unwrap().status,
            RefuelStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn test_cancel_reports_inconsistent_when_reversal_fails() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;
        let op = f.workflow.create_refuel(rub(500), 1000).await.unwrap().operation;
        f.workflow.confirm_refuel(&op.id).await.unwrap();

        f.counter_store.fail_writes(true);
        assert!(matches!(
            f.workflow.cancel_refuel(&op.id, "dispute").await,
            Err(CoreError::Inconsistent { .. })
        ));

        // The status write committed; the counter did not.
        assert_eq!(live(&f).await, 1100);
        assert_eq!(
            f.workflow.get_operation(&op.id).await.unwrap().status,
            RefuelStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_concurrent_confirms_advance_once() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;
        let op = f.workflow.create_refuel(rub(500), 1000).await.unwrap().operation;
        f.operations.yield_on_reads(true);

        let (a, b) = tokio::join!(
            f.workflow.confirm_refuel(&op.id),
            f.workflow.confirm_refuel(&op.id)
        );

        assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(CoreError::CounterDrift { .. })));

        assert_eq!(live(&f).await, op.counter_after);
        assert_eq!(
            f.workflow.get_operation(&op.id).await.unwrap().status,
            RefuelStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn test_concurrent_cancels_reverse_once() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;
        let op = f.workflow.create_refuel(rub(500), 1000).await.unwrap().operation;
        f.workflow.confirm_refuel(&op.id).await.unwrap();
        assert_eq!(live(&f).await, 1100);
        f.operations.yield_on_reads(true);

        let (a, b) = tokio::join!(
            f.workflow.cancel_refuel(&op.id, "dispute"),
            f.workflow.cancel_refuel(&op.id, "dispute")
        );

        assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(
            loser,
            Err(CoreError::InvalidOperationStatus {
                current: RefuelStatus::Cancelled,
                ..
            })
        ));

        assert_eq!(live(&f).await, 1000);
    }

    #[tokio::test]
    async fn test_resync_survives_failed_insert() {
        let f = fixture(rub(50), Some(1000), RefuelPolicy::default()).await;
        f.operations.fail_creates(true);

        let prepared = f.workflow.prepare_refuel(rub(100), 900).await.unwrap();
        assert_eq!(
            prepared.resync,
            Some(CounterResync {
                previous: Some(1000),
                current: 900
            })
        );
        assert!(matches!(
            f.workflow.commit_refuel(prepared).await,
            Err(CoreError::Store { .. })
        ));

        assert_eq!(live(&f).await, 900);
        assert!(f.workflow.pending_operations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revenue_and_liters_count_confirmed_only() {
        let f = fixture(rub(50), Some(0), RefuelPolicy::default()).await;
        let start = Utc::now() - Duration::seconds(1);

        let a = f.workflow.create_refuel(rub(500), 0).await.unwrap().operation;
        f.workflow.confirm_refuel(&a.id).await.unwrap();
        let b = f.workflow.create_refuel(rub(100), 100).await.unwrap().operation;
        f.workflow.confirm_refuel(&b.id).await.unwrap();
        let c = f.workflow.create_refuel(rub(250), 120).await.unwrap().operation;
        f.workflow.cancel_refuel(&c.id, "changed mind").await.unwrap();
        f.workflow.create_refuel(rub(75), 120).await.unwrap();

        let end = Utc::now() + Duration::seconds(1);

        assert_eq!(f.workflow.total_revenue(start, end).await.unwrap(), rub(600));
        assert_eq!(f.workflow.total_liters(start, end).await.unwrap(), 12.0);
        assert_eq!(f.workflow.pending_operations().await.unwrap().len(), 1);
        assert!(f.workflow.has_pending_operations().await.unwrap());

        let history = f.workflow.operation_history(start, end, None).await.unwrap();
        assert_eq!(history.len(), 4);

        assert!(f.workflow.total_revenue(end, start).await.is_err());
    }
}
