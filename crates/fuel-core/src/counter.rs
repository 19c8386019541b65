//! # Counter Ledger
//!
//! Owns the dispenser counter reading (tenths of a liter).
//!
//! ## Write Paths
//! ```text
//! save(v)                  unconditional overwrite (operator override, resync)
//! advance(v)               overwrite, but never below the current reading
//! compare_and_swap(e, v)   write only if the reading is still `e`
//!                          (what confirm and cancel use)
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::store::CounterStore;
use crate::types::CounterState;
use crate::validation::validate_counter_value;

#[derive(Clone)]
pub struct CounterLedger {
    store: Arc<dyn CounterStore>,
}

impl CounterLedger {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        CounterLedger { store }
    }

    /// The current reading, or `None` if nothing was ever written.
    pub async fn read(&self) -> CoreResult<Option<CounterState>> {
        self.store
            .get_current()
            .await
            .map_err(|e| CoreError::store("read counter", e))
    }

    /// The current reading.
    ///
    /// ## Errors
    /// - `CounterUninitialized` if nothing was ever written
    pub async fn get_current(&self) -> CoreResult<CounterState> {
        self.read().await?.ok_or(CoreError::CounterUninitialized)
    }

    /// Overwrites the reading. No monotonicity check.
    ///
    /// ## Errors
    /// - `InvalidCounterValue` if `value` is negative
    pub async fn save(&self, value: i64) -> CoreResult<CounterState> {
        validate_counter_value(value)?;

        let state = CounterState::at_now(value);
        self.store
            .save(&state)
            .await
            .map_err(|e| CoreError::store("save counter", e))?;

        info!(value, "Counter saved");
        Ok(state)
    }

    /// Moves the reading forward to `value`.
    ///
    /// An uninitialized counter accepts any non-negative value.
    ///
    /// ## Errors
    /// - `InvalidCounterValue` if `value` is negative
    /// - `CounterWouldDecrease` if `value` is below the current reading
    pub async fn advance(&self, value: i64) -> CoreResult<CounterState> {
        validate_counter_value(value)?;

        let state = CounterState::at_now(value);

        // A lost swap means someone wrote between the read and the write;
        // re-check against the new reading.
        loop {
            let written = match self.read().await? {
                Some(current) if value < current.current_value => {
                    return Err(CoreError::CounterWouldDecrease {
                        current: current.current_value,
                        requested: value,
                    });
                }
                Some(current) => self
                    .store
                    .compare_and_swap(current.current_value, &state)
                    .await
                    .map_err(|e| CoreError::store("advance counter", e))?,
                None => {
                    self.store
                        .save(&state)
                        .await
                        .map_err(|e| CoreError::store("advance counter", e))?;
                    true
                }
            };

            if written {
                info!(value, "Counter advanced");
                return Ok(state);
            }
        }
    }

    /// Writes `value` only if the reading is still `expected`.
    ///
    /// ## Returns
    /// `true` if the write applied.
    ///
    /// ## Errors
    /// - `InvalidCounterValue` if `value` is negative
    pub async fn compare_and_swap(&self, expected: i64, value: i64) -> CoreResult<bool> {
        validate_counter_value(value)?;

        let applied = self
            .store
            .compare_and_swap(expected, &CounterState::at_now(value))
            .await
            .map_err(|e| CoreError::store("compare and swap counter", e))?;

        debug!(expected, value, applied, "Counter compare-and-swap");
        Ok(applied)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
