//! # Reporting View
//!
//! Read-only aggregation of refuel operations over a time window.
//!
//! Every call recomputes from the stored operations with three scans over
//! the same half-open window `[start, end)`:
//!
//! ```text
//! Confirmed ──► confirmed_count, total_revenue, total_liters, averages
//! Cancelled ──► cancelled_count
//! Created   ──► pending_count
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreResult;
use crate::money::Money;
use crate::refuel::RefuelWorkflow;
use crate::types::{RefuelOperation, RefuelStatus};

/// Totals for one reporting window.
///
/// Revenue, liters and averages cover Confirmed operations only. Averages
/// are zero when nothing was confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefuelStatistics {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// `confirmed_count + cancelled_count + pending_count`.
    pub total_operations: u64,
    pub confirmed_count: u64,
    pub cancelled_count: u64,
    pub pending_count: u64,
    pub total_revenue: Money,
    pub total_liters: f64,
    pub average_liters: f64,
    pub average_amount: Money,
}

#[derive(Clone)]
pub struct ReportingView {
    workflow: RefuelWorkflow,
}

impl ReportingView {
    pub fn new(workflow: RefuelWorkflow) -> Self {
        ReportingView { workflow }
    }

    /// Statistics for operations created within `[start, end)`.
    ///
    /// ## Errors
    /// - `Validation(InvalidRange)` if `start >= end`
    pub async fn statistics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<RefuelStatistics> {
        let confirmed = self.scan(start, end, RefuelStatus::Confirmed).await?;
        let cancelled = self.scan(start, end, RefuelStatus::Cancelled).await?;
        let pending = self.scan(start, end, RefuelStatus::Created).await?;

        let stats = fold(start, end, &confirmed, cancelled.len(), pending.len());
        debug!(
            %start,
            %end,
            total = stats.total_operations,
            revenue = %stats.total_revenue,
            "Refuel statistics computed"
        );
        Ok(stats)
    }

    async fn scan(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: RefuelStatus,
    ) -> CoreResult<Vec<RefuelOperation>> {
        self.workflow
            .operation_history(start, end, Some(status))
            .await
    }
}

fn fold(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    confirmed: &[RefuelOperation],
    cancelled_count: usize,
    pending_count: usize,
) -> RefuelStatistics {
    let confirmed_count = confirmed.len() as u64;
    let total_revenue: Money = confirmed.iter().map(|o| o.amount_paid).sum();
    let total_liters: f64 = confirmed.iter().map(|o| o.calculated_liters).sum();

    let average_liters = if confirmed_count == 0 {
        0.0
    } else {
        total_liters / confirmed_count as f64
    };

    RefuelStatistics {
        start,
        end,
        total_operations: confirmed_count + cancelled_count as u64 + pending_count as u64,
        confirmed_count,
        cancelled_count: cancelled_count as u64,
        pending_count: pending_count as u64,
        total_revenue,
        total_liters,
        average_liters,
        average_amount: total_revenue.average_over(confirmed_count as i64),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::CounterLedger;
    use crate::error::CoreError;
    use crate::memory::{MemoryCounterStore, MemoryOperationStore, MemoryPriceStore};
    use crate::price::PriceLedger;
    use crate::refuel::RefuelPolicy;
    use chrono::Duration;
    use std::sync::Arc;

    async fn setup() -> (RefuelWorkflow, ReportingView) {
        let prices = PriceLedger::new(Arc::new(MemoryPriceStore::new()));
        prices.init_price(Money::from_major_minor(50, 0)).await.unwrap();

        let workflow = RefuelWorkflow::new(
            prices,
            CounterLedger::new(Arc::new(MemoryCounterStore::with_value(0))),
            Arc::new(MemoryOperationStore::new()),
            RefuelPolicy::default(),
        );
        let view = ReportingView::new(workflow.clone());
        (workflow, view)
    }

    #[tokio::test]
    async fn test_statistics_counts_add_up() {
        let (workflow, view) = setup().await;
        let start = Utc::now() - Duration::seconds(1);

        let mut counter = 0;
        for (amount, action) in [(500, "confirm"), (150, "confirm"), (100, "cancel"), (80, "keep")] {
            let op = workflow
                .create_refuel(Money::from_major_minor(amount, 0), counter)
                .await
                .unwrap()
                .operation;
            match action {
                "confirm" => {
                    workflow.confirm_refuel(&op.id).await.unwrap();
                    counter = op.counter_after;
                }
                "cancel" => {
                    workflow.cancel_refuel(&op.id, "customer left").await.unwrap();
                }
                _ => {}
            }
        }

        let end = Utc::now() + Duration::seconds(1);
        let stats = view.statistics(start, end).await.unwrap();

        assert_eq!(stats.confirmed_count, 2);
        assert_eq!(stats.cancelled_count, 1);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(
            stats.total_operations,
            stats.confirmed_count + stats.cancelled_count + stats.pending_count
        );
        assert_eq!(stats.total_revenue, Money::from_major_minor(650, 0));
        assert_eq!(stats.total_liters, 13.0);
        assert_eq!(stats.average_liters, 6.5);
        assert_eq!(stats.average_amount, Money::from_major_minor(325, 0));
    }

    #[tokio::test]
    async fn test_statistics_empty_window() {
        let (_, view) = setup().await;
        let end = Utc::now() - Duration::days(1);
        let stats = view.statistics(end - Duration::days(1), end).await.unwrap();

        assert_eq!(stats.total_operations, 0);
        assert_eq!(stats.total_revenue, Money::zero());
        assert_eq!(stats.average_liters, 0.0);
        assert_eq!(stats.average_amount, Money::zero());
    }

    #[tokio::test]
    async fn test_statistics_rejects_inverted_window() {
        let (_, view) = setup().await;
        let now = Utc::now();
        assert!(matches!(
            view.statistics(now, now).await,
            Err(CoreError::Validation(_))
        ));
    }
}
