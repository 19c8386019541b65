//! # Price Ledger
//!
//! Owns the "currently active price" fact and its history.
//!
//! ## Price Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  fresh system ──init_price(60)──► [60 active]                           │
//! │                                        │                                │
//! │                                 change_price(70)                        │
//! │                                        ▼                                │
//! │                          [60 inactive] [70 active]                      │
//! │                                                                         │
//! │  init_price on a system with an active price → AlreadyActivePrice       │
//! │  change_price on a fresh system              → NoActivePrice            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never deleted. The store swaps the active row in one unit.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CoreError, CoreResult, StoreError};
use crate::money::Money;
use crate::store::PriceStore;
use crate::types::{FuelPrice, PriceFilter};
use crate::validation::validate_price;

/// The active price and its history.
#[derive(Clone)]
pub struct PriceLedger {
    store: Arc<dyn PriceStore>,
}

impl PriceLedger {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        PriceLedger { store }
    }

    /// The price new refuels are charged at.
    ///
    /// ## Errors
    /// - `NoActivePrice` if no price was ever set
    pub async fn get_active(&self) -> CoreResult<FuelPrice> {
        self.store
            .get_active()
            .await
            .map_err(|e| CoreError::store("get active price", e))?
            .ok_or(CoreError::NoActivePrice)
    }

    /// Sets the first price on a fresh system.
    ///
    /// ## Errors
    /// - `InvalidPrice` if `price` is outside `(0, 10000.00]`
    /// - `AlreadyActivePrice` if a price is already active
    pub async fn init_price(&self, price: Money) -> CoreResult<FuelPrice> {
        validate_price(price)?;

        if self
            .store
            .get_active()
            .await
            .map_err(|e| CoreError::store("init price: read active", e))?
            .is_some()
        {
            return Err(CoreError::AlreadyActivePrice);
        }

        let row = FuelPrice::new_active(price);
        self.store.init_active(&row).await.map_err(|e| match e {
            // Another caller initialized between our read and the insert.
            StoreError::ActivePriceExists => CoreError::AlreadyActivePrice,
            other => CoreError::store("init price: insert", other),
        })?;

        info!(price_id = %row.id, price = %row.price_per_liter, "Fuel price initialized");
        Ok(row)
    }

    /// Replaces the active price.
    ///
    /// ## Returns
    /// `(previous, current)`; the previous row keeps its id and is now inactive.
    ///
    /// ## Errors
    /// - `InvalidPrice` if `price` is outside `(0, 10000.00]`
    /// - `NoActivePrice` if no price was ever set
    pub async fn change_price(&self, price: Money) -> CoreResult<(FuelPrice, FuelPrice)> {
        validate_price(price)?;

        let row = FuelPrice::new_active(price);
        let previous = self.store.change_active(&row).await.map_err(|e| match e {
            StoreError::NoActivePrice => CoreError::NoActivePrice,
            other => CoreError::store("change price", other),
        })?;

        info!(
            previous_id = %previous.id,
            previous_price = %previous.price_per_liter,
            price_id = %row.id,
            price = %row.price_per_liter,
            "Fuel price changed"
        );
        Ok((previous, row))
    }

    pub async fn get_by_id(&self, id: &str) -> CoreResult<FuelPrice> {
        self.store
            .get_by_id(id)
            .await
            .map_err(|e| CoreError::store("get price by id", e))?
            .ok_or_else(|| CoreError::PriceNotFound(id.to_string()))
    }

    /// Price rows matching `filter`, oldest first.
    pub async fn find(&self, filter: &PriceFilter) -> CoreResult<Vec<FuelPrice>> {
        debug!(?filter, "Finding fuel prices");
        self.store
            .find(filter)
            .await
            .map_err(|e| CoreError::store("find prices", e))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
