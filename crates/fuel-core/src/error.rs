//! # Error Types
//!
//! Domain-specific error types for fuel-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fuel-core errors (this file)                                          │
//! │  ├── CoreError        - What every ledger/workflow call returns        │
//! │  ├── ValidationError  - Input rejected before any write                │
//! │  └── StoreError       - What a store adapter reports                   │
//! │                                                                         │
//! │  fuel-db errors (separate crate)                                       │
//! │  └── DbError          - sqlx failures, converted into StoreError       │
//! │                                                                         │
//! │  Flow: DbError → StoreError → CoreError::Store { context, .. }         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, values)
//! 3. Errors are enum variants, never String
//! 4. Callers match on the variant, never on the message

use thiserror::Error;

use crate::money::Money;
use crate::types::RefuelStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Errors returned by the ledgers, the refuel workflow and the station facade.
///
/// ## Kinds
/// ```text
/// Validation      InvalidAmount, InvalidPrice, InvalidCounterValue,
///                 CounterWouldDecrease, Validation
/// State conflict  AlreadyActivePrice, NoActivePrice, InvalidOperationStatus,
///                 CounterDrift, CounterUninitialized
/// Not found       PriceNotFound, OperationNotFound
/// Collaborator    Store
/// Partial write   Inconsistent
/// ```
///
/// None of these are retried by the core. After a failed confirm or cancel
/// the operation state is unknown to the caller; re-read before acting.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Amount paid is outside `(0, MAX_AMOUNT_PAID]`.
    #[error("Invalid amount paid {amount}: must be greater than 0 and at most {max}")]
    InvalidAmount { amount: Money, max: Money },

    /// Price per liter is outside `(0, MAX_PRICE_PER_LITER]`.
    #[error("Invalid price per liter {price}: must be greater than 0 and at most {max}")]
    InvalidPrice { price: Money, max: Money },

    /// Counter readings are never negative.
    #[error("Invalid counter value {value}: counter cannot be negative")]
    InvalidCounterValue { value: i64 },

    /// A validated counter update tried to move the reading backward.
    #[error("Counter cannot move backward: current {current}, requested {requested}")]
    CounterWouldDecrease { current: i64, requested: i64 },

    /// Other input validation failure.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// `init_price` was called while a price is active; use `change_price`.
    #[error("An active price already exists; use change_price instead")]
    AlreadyActivePrice,

    /// No price is active yet; use `init_price` first.
    #[error("No active fuel price")]
    NoActivePrice,

    /// The operation is not in a state that allows the requested transition.
    ///
    /// ## When This Occurs
    /// - Confirming an operation that is already Confirmed or Cancelled
    /// - Cancelling an operation that is already Cancelled
    /// - Another caller transitioned the operation first
    #[error("Refuel operation {operation_id} is {current}, cannot {attempted}")]
    InvalidOperationStatus {
        operation_id: String,
        current: RefuelStatus,
        attempted: &'static str,
    },

    /// The live counter no longer matches what the operation expects.
    #[error("Counter drift on operation {operation_id}: expected {expected}, found {actual:?}")]
    CounterDrift {
        operation_id: String,
        expected: i64,
        actual: Option<i64>,
    },

    /// The counter has never been written.
    #[error("Counter has not been initialized")]
    CounterUninitialized,

    #[error("Fuel price not found: {0}")]
    PriceNotFound(String),

    #[error("Refuel operation not found: {0}")]
    OperationNotFound(String),

    /// A store call failed. `context` names the step that was running.
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    /// A dependent write failed after an earlier one committed.
    ///
    /// ## When This Occurs
    /// - Counter advanced on confirm, but the status update did not apply
    /// - Counter reversed on cancel, but the status update did not apply
    ///
    /// Needs manual reconciliation.
    #[error("Operation {operation_id} left inconsistent: {detail}")]
    Inconsistent { operation_id: String, detail: String },
}

impl CoreError {
    /// Wraps a store failure with the name of the step that was running.
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        CoreError::Store {
            context: context.into(),
            source,
        }
    }

    /// True for input that was rejected before any write.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidAmount { .. }
                | CoreError::InvalidPrice { .. }
                | CoreError::InvalidCounterValue { .. }
                | CoreError::CounterWouldDecrease { .. }
                | CoreError::Validation(_)
        )
    }

    /// True when the caller's view of the state is stale and a fresh read
    /// is needed before deciding to retry.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CoreError::AlreadyActivePrice
                | CoreError::NoActivePrice
                | CoreError::InvalidOperationStatus { .. }
                | CoreError::CounterDrift { .. }
                | CoreError::CounterUninitialized
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors that do not have a dedicated [`CoreError`] variant.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Date window with `from` not before `to`.
    #[error("Invalid date range: from must be before to")]
    InvalidRange,
}

// =============================================================================
// Store Error
// =============================================================================

/// Failures reported by a store implementation.
///
/// Adapters convert their own errors into this type; the ledgers translate
/// the conflict variants into the matching [`CoreError`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Inserting an active price while another is active.
    #[error("an active price already exists")]
    ActivePriceExists,

    /// Replacing the active price while none is active.
    #[error("no active price to replace")]
    NoActivePrice,

    /// Unique key collision other than the active price.
    #[error("duplicate {0}")]
    Duplicate(String),

    /// The backend could not be reached or the query failed.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for store trait results.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
