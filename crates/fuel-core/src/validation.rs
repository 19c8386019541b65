//! # Validation Module
//!
//! Input validation for the fuel station ledger.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Entry point (CLI, handler)                                   │
//! │  └── Parsing ("50.5" → Money)                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledgers / workflow                                           │
//! │  └── THIS MODULE: business range checks, before any write              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store                                                        │
//! │  ├── CHECK constraints                                                 │
//! │  └── Partial unique index (one active price)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::{MAX_AMOUNT_PAID, MAX_PRICE_PER_LITER};

/// Validates a price per liter.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_PRICE_PER_LITER (10000.00)
///
/// ## Example
/// ```rust
/// use fuel_core::money::Money;
/// use fuel_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_major_minor(52, 40)).is_ok());
/// assert!(validate_price(Money::zero()).is_err());
/// assert!(validate_price(Money::from_major_minor(10_000, 1)).is_err());
/// ```
pub fn validate_price(price: Money) -> CoreResult<()> {
    if !price.is_positive() || price > MAX_PRICE_PER_LITER {
        return Err(CoreError::InvalidPrice {
            price,
            max: MAX_PRICE_PER_LITER,
        });
    }
    Ok(())
}

/// Validates the amount a customer paid.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_AMOUNT_PAID (100000.00)
pub fn validate_amount(amount: Money) -> CoreResult<()> {
    if !amount.is_positive() || amount > MAX_AMOUNT_PAID {
        return Err(CoreError::InvalidAmount {
            amount,
            max: MAX_AMOUNT_PAID,
        });
    }
    Ok(())
}

/// Validates a counter reading (tenths of a liter).
///
/// ## Rules
/// - Must be non-negative
pub fn validate_counter_value(value: i64) -> CoreResult<()> {
    if value < 0 {
        return Err(CoreError::InvalidCounterValue { value });
    }
    Ok(())
}

/// Validates a half-open reporting window `[from, to)`.
pub fn validate_window(from: DateTime<Utc>, to: DateTime<Utc>) -> CoreResult<()> {
    if from >= to {
        return Err(ValidationError::InvalidRange.into());
    }
    Ok(())
}

/// Validates a cancellation reason.
///
/// ## Rules
/// - Must not be blank
/// - Must be at most 500 characters
///
/// ## Returns
/// The trimmed reason.
pub fn validate_reason(reason: &str) -> CoreResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        }
        .into());
    }

    if reason.chars().count() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        }
        .into());
    }

    Ok(reason.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
