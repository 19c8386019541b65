//! # fuel-core: Transactional Logic for a Fuel Station Ledger
//!
//! This crate holds the rules that tie the station's three mutable facts
//! together: the active price, the dispenser counter and the refuel
//! operations that turn money into dispensed liters.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Fuel Station Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Entry points (seed binary, CLI, handlers)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fuel-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │                     FuelStation (facade)                        │   │
//! │  │                             │                                   │   │
//! │  │   ┌───────────┐  ┌──────────▼─┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │PriceLedger│◄─┤  Refuel    ├─►│ Counter   │  │  Event    │  │   │
//! │  │   │           │  │  Workflow  │  │ Ledger    │  │  Journal  │  │   │
//! │  │   └───────────┘  └──────▲─────┘  └───────────┘  └───────────┘  │   │
//! │  │                         │ reads                                 │   │
//! │  │                  ┌──────┴──────┐                                │   │
//! │  │                  │ReportingView│                                │   │
//! │  │                  └─────────────┘                                │   │
//! │  │                                                                 │   │
//! │  │   Persistence only through the traits in `store`               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    fuel-db (SQLite adapter)                     │   │
//! │  │              sqlx pool, migrations, repositories               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (FuelPrice, CounterState, RefuelOperation, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`store`] - Async persistence traits
//! - [`memory`] - In-memory store implementations
//! - [`price`], [`counter`], [`refuel`], [`reporting`], [`journal`] - Components
//! - [`station`] - The facade entry points call
//!
//! ## Design Principles
//!
//! 1. **Integer Money**: Amounts are minor units (i64); counter units are
//!    derived with integer division, never from a float
//! 2. **Conditional Writes**: Counter and status changes only apply if the
//!    stored value is still the one that was checked
//! 3. **Explicit Errors**: All errors are typed, never strings or panics
//! 4. **No Retries**: A failure between dependent writes is reported, not hidden
//!
//! ## Example Usage
//!
//! ```rust
//! use fuel_core::money::Money;
//!
//! let price = Money::from_major_minor(50, 0);
//! let paid = Money::from_major_minor(500, 0);
//!
//! // 10 liters = 100 counter units (tenths of a liter)
//! assert_eq!(paid.counter_units_at(price), 100);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod counter;
pub mod error;
pub mod journal;
pub mod memory;
pub mod money;
pub mod price;
pub mod refuel;
pub mod reporting;
pub mod station;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use fuel_core::Money` instead of
// `use fuel_core::money::Money`

pub use error::{CoreError, CoreResult, StoreError, StoreResult, ValidationError};
pub use money::Money;
pub use reporting::RefuelStatistics;
pub use station::{FuelStation, FuelStationBuilder};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Counter units per liter.
///
/// The dispenser shows tenths of a liter with no decimal point, so a reading
/// of 1100 means 110.0 liters.
pub const COUNTER_UNITS_PER_LITER: i64 = 10;

/// Highest accepted price per liter (10000.00).
pub const MAX_PRICE_PER_LITER: Money = Money::from_major_minor(10_000, 0);

/// Highest accepted amount for one refuel (100000.00).
///
/// ## Business Reason
/// Catches a mistyped amount (an extra zero) before it reaches the counter.
pub const MAX_AMOUNT_PAID: Money = Money::from_major_minor(100_000, 0);
