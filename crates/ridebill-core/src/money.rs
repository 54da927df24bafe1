//! # Money Module
//!
//! Provides the `Money` and `Percent` types for handling monetary values
//! safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Tax-included VAT needs a division:                                     │
//! │    175.50 × 21 / 121 = 30.4586776859...                                 │
//! │    Integer cents would round at every step and drift between the       │
//! │    live preview and the persisted invoice.                             │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 decimals (rust_decimal, 28 digits)               │
//! │    Figures are exact through the whole pipeline and only rounded to    │
//! │    two places when displayed or exported.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ridebill_core::money::{Money, Percent};
//! use rust_decimal::Decimal;
//!
//! let fare = Money::from_cents(10_000);            // 100.00
//! let extra = Money::from_cents(2_500);            // 25.00
//! let subtotal = fare + extra;                     // 125.00
//! let vat = subtotal.checked_percent(Percent::new(Decimal::from(21)));
//! assert_eq!(vat, Some(Money::from_cents(2_625)));       // 26.25
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the invoice currency.
///
/// ## Design Decisions
/// - **Decimal (signed)**: negative intermediates are allowed to flow
///   through pricing (e.g. a commission larger than the fare)
/// - **Transparent serde**: serializes as the decimal string `"103.5"`
/// - **No currency field**: a RideBill installation bills in one currency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero money value.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use ridebill_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Returns the exact underlying decimal.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is strictly below zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns `rate` percent of this amount, unrounded.
    ///
    /// `None` when the product does not fit in a decimal.
    ///
    /// ## Example
    /// ```rust
    /// use ridebill_core::money::{Money, Percent};
    /// use rust_decimal::Decimal;
    ///
    /// let base = Money::from_cents(8_000);
    /// let ten = Percent::new(Decimal::from(10));
    /// assert_eq!(base.checked_percent(ten), Some(Money::from_cents(800)));
    /// ```
    pub fn checked_percent(&self, rate: Percent) -> Option<Money> {
        self.0
            .checked_mul(rate.value())?
            .checked_div(Decimal::ONE_HUNDRED)
            .map(Money)
    }

    /// Multiplies the amount by a whole quantity (hours, trips).
    #[inline]
    pub fn checked_times(&self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(Decimal::from(quantity)).map(Money)
    }

    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    #[inline]
    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Sums amounts, `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// Restricts the amount to `[min, max]`.
    pub fn clamp_between(self, min: Money, max: Money) -> Money {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }

    /// Rounds half away from zero to two decimal places.
    ///
    /// Only used for display and export; stored figures stay exact.
    pub fn rounded(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

/// Display shows the amount rounded to two decimals, without a symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded().0)
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Money)
            .map_err(|e| ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: e.to_string(),
            })
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A rate in percentage points (`21` means 21%).
///
/// Used for VAT rates, percentage discounts and percentage commissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    /// Zero percent.
    pub const ZERO: Percent = Percent(Decimal::ZERO);

    /// Creates a rate from percentage points.
    #[inline]
    pub const fn new(points: Decimal) -> Self {
        Percent(points)
    }

    /// Returns the rate in percentage points.
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Checks if the rate is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl FromStr for Percent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('%');
        Decimal::from_str(trimmed)
            .map(Percent)
            .map_err(|e| ValidationError::InvalidFormat {
                field: "rate".to_string(),
                reason: e.to_string(),
            })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
