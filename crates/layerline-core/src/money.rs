//! # Money Module
//!
//! Provides the `Money` type for monetary values and the `Rate` type for the
//! checkout adjustments (gateway surcharge, transfer discount).
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE DRIFT PROBLEM                                                      │
//! │                                                                         │
//! │  The price breakdown is recomputed on every quantity click:             │
//! │    base 19.99 × 3 + accessory 2.10 × 2 × 3 ... in floating point        │
//! │    accumulates tiny errors that leak into the "total" shown to buyers. │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    1999 × 3 + 210 × 2 × 3 = 7257, the same answer every time          │
//! │    Rates are basis points and round once, half-up, at the very end.    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use layerline_core::money::{Money, Rate};
//!
//! let price = Money::from_cents(1099);
//! let doubled = price * 2u32;
//! assert_eq!(doubled.cents(), 2198);
//!
//! let with_fee = Money::from_cents(100_000).apply_surcharge(Rate::from_bps(1000));
//! assert_eq!(with_fee.cents(), 110_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_cents ──► effective unit price ──► PriceBreakdown.total  │
/// │           │                  (bulk tiers)                │              │
/// │           │                                              ▼              │
/// │           └──► Cart.total_amount            CheckoutTotals (± rate)     │
/// │                                                          │              │
/// │                                                          ▼              │
/// │                                         PreferenceRequest / Pending    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use layerline_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
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

    /// Returns the portion of this amount that `rate` represents, rounded half-up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, widened to i128 so large
    /// carts cannot overflow.
    pub fn portion(&self, rate: Rate) -> Money {
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use layerline_core::money::{Money, Rate};
    ///
    /// let total = Money::from_cents(100_000);
    /// let discounted = total.apply_discount(Rate::from_bps(500)); // 5% off
    /// assert_eq!(discounted.cents(), 95_000);
    /// ```
    pub fn apply_discount(&self, rate: Rate) -> Money {
        *self - self.portion(rate)
    }

    /// Applies a percentage surcharge and returns the increased amount.
    ///
    /// ## Example
    /// ```rust
    /// use layerline_core::money::{Money, Rate};
    ///
    /// let total = Money::from_cents(100_000);
    /// let charged = total.apply_surcharge(Rate::from_bps(1000)); // +10%
    /// assert_eq!(charged.cents(), 110_000);
    /// ```
    pub fn apply_surcharge(&self, rate: Rate) -> Money {
        *self + self.portion(rate)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for debugging and logs. The storefront config owns the currency
/// symbol used for buyer-facing text.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
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

/// Multiplication by a cart quantity.
impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        Money(self.0 * i64::from(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Rate
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%. 1000 bps = 10% (gateway surcharge), 500 bps = 5%
/// (transfer discount). Integers keep the adjustment exact until the final
/// half-up rounding in [`Money::portion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3u32).cents(), 3000);
    }

    #[test]
    fn test_quantity_multiplication_matches_repeated_addition() {
        let unit = Money::from_cents(1099);
        let added = unit + unit;
        assert_eq!(unit * 2u32, added);
        assert_eq!(Money::from_cents(-80) * 3u32, Money::from_cents(-240));
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 650].iter().map(|c| Money::from_cents(*c)).sum();
        assert_eq!(total.cents(), 1000);
    }

    #[test]
    fn test_transfer_discount_and_gateway_surcharge() {
        let total = Money::from_cents(1000);
        assert_eq!(total.apply_discount(Rate::from_bps(500)).cents(), 950);
        assert_eq!(total.apply_surcharge(Rate::from_bps(1000)).cents(), 1100);
    }

    #[test]
    fn test_portion_rounds_half_up() {
        // 5% of 10 cents is 0.5 → rounds to 1
        assert_eq!(Money::from_cents(10).portion(Rate::from_bps(500)).cents(), 1);
        // 5% of 9 cents is 0.45 → rounds to 0
        assert_eq!(Money::from_cents(9).portion(Rate::from_bps(500)).cents(), 0);
    }

    #[test]
    fn test_repeated_recomputation_is_stable() {
        let unit = Money::from_cents(1999);
        let first = unit * 3u32 + Money::from_cents(210) * 6u32;
        for _ in 0..1000 {
            assert_eq!(unit * 3u32 + Money::from_cents(210) * 6u32, first);
        }
    }
}
