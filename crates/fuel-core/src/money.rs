//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats:                                                           │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  At the pump:                                                           │
//! │    0.70 / 0.07 * 10 = 99.99999999999999 → truncates to 99 tenths       │
//! │    The customer loses a tenth of a liter to rounding noise.            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    70 * 10 / 7 = 100 tenths, exactly                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fuel_core::money::Money;
//!
//! let price = Money::from_major_minor(50, 0); // 50.00 per liter
//! let paid = Money::from_cents(50_000);       // 500.00
//!
//! assert_eq!(paid.counter_units_at(price), 100); // 10.0 liters
//! assert_eq!(paid.liters_at(price), 10.0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use crate::COUNTER_UNITS_PER_LITER;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (kopecks, cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences and reversals can go negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// FuelPrice.price_per_liter ──► RefuelOperation.price_per_liter (frozen)
///                                        │
/// RefuelOperation.amount_paid ───────────┴──► liters, counter units
///                                        │
///                                        ▼
///                          RefuelStatistics.total_revenue
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from the smallest currency unit.
    ///
    /// ## Example
    /// ```rust
    /// use fuel_core::money::Money;
    ///
    /// let price = Money::from_cents(5099); // 50.99
    /// assert_eq!(price.cents(), 5099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use fuel_core::money::Money;
    ///
    /// let price = Money::from_major_minor(50, 99);
    /// assert_eq!(price.cents(), 5099);
    ///
    /// let negative = Money::from_major_minor(-5, 50);
    /// assert_eq!(negative.cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in the smallest currency unit.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Liters bought with this amount at `price_per_liter`.
    ///
    /// The result is for display and reporting. Counter arithmetic uses
    /// [`Money::counter_units_at`], which never goes through a float.
    pub fn liters_at(&self, price_per_liter: Money) -> f64 {
        if price_per_liter.is_zero() {
            return 0.0;
        }
        self.0 as f64 / price_per_liter.0 as f64
    }

    /// Counter units (tenths of a liter) bought with this amount, truncated
    /// toward zero.
    ///
    /// ## Implementation
    /// `amount * 10 / price` in i128, so neither the multiplication can
    /// overflow nor the division pick up float error.
    ///
    /// ## Example
    /// ```rust
    /// use fuel_core::money::Money;
    ///
    /// let price = Money::from_major_minor(70, 0);
    /// let paid = Money::from_major_minor(700, 0);
    /// assert_eq!(paid.counter_units_at(price), 100);
    ///
    /// // 100.00 at 30.00/l = 3.333.. liters → 33 tenths
    /// let paid = Money::from_major_minor(100, 0);
    /// assert_eq!(paid.counter_units_at(Money::from_major_minor(30, 0)), 33);
    /// ```
    pub fn counter_units_at(&self, price_per_liter: Money) -> i64 {
        if price_per_liter.is_zero() {
            return 0;
        }
        let units =
            self.0 as i128 * COUNTER_UNITS_PER_LITER as i128 / price_per_liter.0 as i128;
        units as i64
    }

    /// Mean of `count` values summing to `self`, truncated to the minor unit.
    /// Zero when `count` is zero.
    pub fn average_over(&self, count: i64) -> Money {
        if count == 0 {
            return Money::zero();
        }
        Money(self.0 / count)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.cents_part())
    }
}

/// Error returned when parsing a decimal string into [`Money`] fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid money value '{0}': expected a decimal with at most two fraction digits")]
pub struct ParseMoneyError(pub String);

/// Parses `"50"`, `"50.5"` and `"50.05"`. More than two fraction digits is
/// rejected rather than rounded.
impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let err = || ParseMoneyError(s.to_string());

        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let (major_str, minor_str) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major_str.is_empty() || minor_str.len() > 2 {
            return Err(err());
        }
        if !major_str.chars().all(|c| c.is_ascii_digit())
            || !minor_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(err());
        }

        let major: i64 = major_str.parse().map_err(|_| err())?;
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().map_err(|_| err())? * 10,
            _ => minor_str.parse().map_err(|_| err())?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|m| m.checked_add(minor))
            .ok_or_else(err)?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
