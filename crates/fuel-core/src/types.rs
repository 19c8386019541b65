//! # Domain Types
//!
//! Core domain types used throughout the fuel station ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │   FuelPrice     │   │  CounterState   │   │  RefuelOperation    │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  id (UUID)      │   │  current_value  │   │  id (UUID)          │   │
//! │  │  price_per_liter│   │  (tenths of l)  │   │  amount_paid        │   │
//! │  │  is_active      │   │  updated_at     │   │  price_per_liter ❄  │   │
//! │  └─────────────────┘   └─────────────────┘   │  counter_before  ❄  │   │
//! │                          singleton row       │  counter_after   ❄  │   │
//! │                                              │  status             │   │
//! │  ┌─────────────────┐   ┌─────────────────┐   └─────────────────────┘   │
//! │  │  RefuelStatus   │   │  EventRecord    │                             │
//! │  │  Created        │   │  journal entry  │   ❄ = frozen at creation    │
//! │  │  Confirmed      │   └─────────────────┘                             │
//! │  │  Cancelled      │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Fuel Price
// =============================================================================

/// A price per liter. At most one row is active at any time; older rows stay
/// as history with `is_active = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelPrice {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Price of one liter.
    pub price_per_liter: Money,

    /// When the price was set.
    pub created_at: DateTime<Utc>,

    /// When the row was last touched (deactivation stamps this).
    pub updated_at: Option<DateTime<Utc>>,

    /// Whether this is the price new refuels are charged at.
    pub is_active: bool,
}

impl FuelPrice {
    /// Builds a new active price with a fresh id.
    pub fn new_active(price_per_liter: Money) -> Self {
        FuelPrice {
            id: Uuid::new_v4().to_string(),
            price_per_liter,
            created_at: Utc::now(),
            updated_at: None,
            is_active: true,
        }
    }
}

// =============================================================================
// Counter State
// =============================================================================

/// The dispenser counter reading, in tenths of a liter.
///
/// Exactly one logical instance exists per station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    /// Reading in tenths of a liter (no decimal point on the dispenser).
    pub current_value: i64,

    /// When the reading was last written.
    pub updated_at: DateTime<Utc>,
}

impl CounterState {
    /// A reading stamped with the current time.
    pub fn at_now(current_value: i64) -> Self {
        CounterState {
            current_value,
            updated_at: Utc::now(),
        }
    }
}

// =============================================================================
// Refuel Status
// =============================================================================

/// Lifecycle of a refuel operation.
///
/// ```text
///              confirm               cancel
///   Created ───────────► Confirmed ──────────► Cancelled
///      │                                           ▲
///      └───────────────────────────────────────────┘
///                        cancel
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum RefuelStatus {
    /// Money accepted, liters computed, counter not yet advanced.
    Created,
    /// Counter advanced to `counter_after`.
    Confirmed,
    /// Terminal. Counter reversed if the operation had been confirmed.
    Cancelled,
}

impl RefuelStatus {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: RefuelStatus) -> bool {
        matches!(
            (self, next),
            (RefuelStatus::Created, RefuelStatus::Confirmed)
                | (RefuelStatus::Created, RefuelStatus::Cancelled)
                | (RefuelStatus::Confirmed, RefuelStatus::Cancelled)
        )
    }

    /// Lowercase name, as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            RefuelStatus::Created => "created",
            RefuelStatus::Confirmed => "confirmed",
            RefuelStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for RefuelStatus {
    fn default() -> Self {
        RefuelStatus::Created
    }
}

impl fmt::Display for RefuelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Refuel Operation
// =============================================================================

/// A refuel transaction.
/// Uses snapshot pattern to freeze the price and counter at time of refuel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefuelOperation {
    pub id: String,
    /// Money handed over by the customer.
    pub amount_paid: Money,
    /// `amount_paid / price_per_liter`, for display and reporting.
    pub calculated_liters: f64,
    /// Price at time of refuel (frozen).
    pub price_per_liter: Money,
    /// Counter reading the operator keyed in before dispensing (frozen).
    pub counter_before: i64,
    /// Counter reading once the fuel is dispensed (frozen).
    pub counter_after: i64,
    pub status: RefuelStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
}

impl RefuelOperation {
    /// Counter units this operation moves the dispenser by.
    ///
    /// Derived from the frozen amount and price, so it always equals
    /// `counter_after - counter_before` for operations built by the workflow.
    pub fn dispensed_units(&self) -> i64 {
        self.amount_paid.counter_units_at(self.price_per_liter)
    }
}

// =============================================================================
// Event Journal
// =============================================================================

/// Severity of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventLevel::Info => f.write_str("info"),
            EventLevel::Warning => f.write_str("warning"),
            EventLevel::Error => f.write_str("error"),
        }
    }
}

/// What happened, for journal filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PriceInitialized,
    PriceChanged,
    CounterOverridden,
    CounterAdvanced,
    CounterResynced,
    RefuelCreated,
    RefuelConfirmed,
    RefuelCancelled,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::PriceInitialized => "price_initialized",
            EventType::PriceChanged => "price_changed",
            EventType::CounterOverridden => "counter_overridden",
            EventType::CounterAdvanced => "counter_advanced",
            EventType::CounterResynced => "counter_resynced",
            EventType::RefuelCreated => "refuel_created",
            EventType::RefuelConfirmed => "refuel_confirmed",
            EventType::RefuelCancelled => "refuel_cancelled",
        };
        f.write_str(name)
    }
}

/// An entry in the station's event journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    /// Device that produced the event.
    pub device_id: String,
    pub level: EventLevel,
    pub event_type: EventType,
    /// Short human-readable description.
    pub message: String,
    /// Extra data as a JSON document (may be `{}`).
    pub meta: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Query Filters
// =============================================================================

/// Filter for price history queries. Date range is half-open: `[from, to)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceFilter {
    pub is_active: Option<bool>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Filter for refuel operation queries. Date range is half-open: `[from, to)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefuelFilter {
    pub status: Option<RefuelStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl RefuelFilter {
    /// Operations in `status` created within `[from, to)`.
    pub fn in_window(status: Option<RefuelStatus>, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        RefuelFilter {
            status,
            date_from: Some(from),
            date_to: Some(to),
            ..Default::default()
        }
    }
}

/// Filter for journal queries. Date range is half-open: `[from, to)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub device_id: Option<String>,
    pub level: Option<EventLevel>,
    pub event_type: Option<EventType>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Returns true when `at` falls inside the optional half-open window.
pub(crate) fn within(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.map_or(true, |f| at >= f) && to.map_or(true, |t| at < t)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_refuel_status_default() {
        assert_eq!(RefuelStatus::default(), RefuelStatus::Created);
    }

    #[test]
    fn test_refuel_status_transitions() {
        use RefuelStatus::*;

        assert!(Created.can_transition_to(Confirmed));
        assert!(Created.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));

        assert!(!Confirmed.can_transition_to(Confirmed));
        assert!(!Cancelled.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Created));
    }

    #[test]
    fn test_status_serde_names() {
        let json = serde_json::to_string(&RefuelStatus::Confirmed).unwrap();
        assert_eq!(json, "\"confirmed\"");
        assert_eq!(RefuelStatus::Cancelled.to_string(), "cancelled");
        assert_eq!(EventType::RefuelCreated.to_string(), "refuel_created");
    }

    #[test]
    fn test_within_is_half_open() {
        let from = Utc::now();
        let to = from + Duration::hours(1);

        assert!(within(from, Some(from), Some(to)));
        assert!(!within(to, Some(from), Some(to)));
        assert!(!within(from - Duration::seconds(1), Some(from), Some(to)));
        assert!(within(from - Duration::days(9), None, None));
    }

    #[test]
    fn test_dispensed_units_from_snapshot() {
        let op = RefuelOperation {
            id: "op".to_string(),
            amount_paid: Money::from_major_minor(500, 0),
            calculated_liters: 10.0,
            price_per_liter: Money::from_major_minor(50, 0),
            counter_before: 1000,
            counter_after: 1100,
            status: RefuelStatus::Created,
            created_at: Utc::now(),
            cancelled_at: None,
            cancel_reason: None,
        };
        assert_eq!(op.dispensed_units(), op.counter_after - op.counter_before);
    }
}
