//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely, plus the
//! `Currency` type used to round request aggregates to the company
//! currency's precision.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In many retail systems:                                                │
//! │    10.00 / 3 = 3.33 (×3 = 9.99)  → Lost 0.01!                          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    1000 cents / 3 = 333 cents (×3 = 999 cents)                         │
//! │    We KNOW we lost 1 cent, and handle it explicitly                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use request_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1099); // 10.99
//!
//! // Arithmetic operations
//! let doubled = price * 2;                     // 21.98
//! let total = price + Money::from_cents(500);  // 15.99
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::tax::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and corrections
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money Flows
/// ```text
/// Product.list_price_cents ──► RequestLine.price_unit_cents
///                                    │
///                                    ▼
///                        compute_line_totals (tax engine)
///                                    │
///                                    ▼
///      Request.untaxed / tax / total ──► amount_due = total − prepaid
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use request_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents 10.99
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

    /// Returns the major unit portion (e.g., euros).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99, absolute value).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates the tax amount for this base at the given rate.
    ///
    /// ## Implementation
    /// Integer math with half-up rounding: `(amount * bps + 5000) / 10000`.
    /// i128 intermediates prevent overflow on large amounts.
    ///
    /// ## Example
    /// ```rust
    /// use request_core::money::Money;
    /// use request_core::tax::TaxRate;
    ///
    /// let base = Money::from_cents(1000); // 10.00
    /// let rate = TaxRate::from_bps(825);  // 8.25%
    ///
    /// // 10.00 × 8.25% = 0.825 → rounds to 0.83 (83 cents)
    /// assert_eq!(base.calculate_tax(rate).cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Extracts the tax amount contained in this tax-inclusive value.
    ///
    /// ## When To Use
    /// For price-included taxes (VAT baked into the shelf price):
    /// `gross = net × (1 + rate)`, so `tax = gross × bps / (10000 + bps)`.
    ///
    /// ## Example
    /// ```rust
    /// use request_core::money::Money;
    /// use request_core::tax::TaxRate;
    ///
    /// let gross = Money::from_cents(1100); // 11.00 including 10% VAT
    /// let rate = TaxRate::from_bps(1000);
    ///
    /// assert_eq!(gross.extract_included_tax(rate).cents(), 100);
    /// ```
    pub fn extract_included_tax(&self, rate: TaxRate) -> Money {
        let divisor = 10000 + rate.bps() as i128;
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + divisor / 2) / divisor;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use request_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // 2.99
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Currency
// =============================================================================

/// A currency with a display precision.
///
/// ## Why This Exists
/// Request aggregate amounts are rounded to the company currency's precision.
/// Amounts are stored in cents (two implicit decimals), so currencies with
/// fewer decimal places round to a coarser step:
///
/// ```text
/// decimal_places  rounding step (cents)
/// 2 (EUR, USD)    1
/// 1               10
/// 0 (JPY, CLP)    100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Currency {
    /// ISO 4217 currency code.
    pub code: String,

    /// Number of decimal places shown for this currency (0-2).
    pub decimal_places: u8,
}

impl Currency {
    /// Creates a currency with the given code and decimal precision.
    pub fn new(code: impl Into<String>, decimal_places: u8) -> Self {
        Currency {
            code: code.into(),
            decimal_places: decimal_places.min(2),
        }
    }

    /// Euro with two decimals, the default company currency.
    pub fn eur() -> Self {
        Currency::new("EUR", 2)
    }

    /// Returns the rounding step in cents for this currency.
    #[inline]
    pub fn rounding_step(&self) -> i64 {
        match self.decimal_places {
            0 => 100,
            1 => 10,
            _ => 1,
        }
    }

    /// Rounds a monetary value to this currency's precision.
    ///
    /// Half-away-from-zero rounding, matching how cash amounts are rounded
    /// on receipts.
    ///
    /// ## Example
    /// ```rust
    /// use request_core::money::{Currency, Money};
    ///
    /// let yen = Currency::new("JPY", 0);
    /// assert_eq!(yen.round(Money::from_cents(1250)).cents(), 1300);
    /// assert_eq!(yen.round(Money::from_cents(1249)).cents(), 1200);
    /// ```
    pub fn round(&self, amount: Money) -> Money {
        let step = self.rounding_step();
        if step == 1 {
            return amount;
        }
        let cents = amount.cents();
        let half = step / 2;
        let rounded = if cents >= 0 {
            (cents + half) / step * step
        } else {
            -((-cents + half) / step * step)
        };
        Money::from_cents(rounded)
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::eur()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for debugging and logs. The front-end formats amounts with the
/// currency symbol and localization.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        let result: Money = a * 3;
        assert_eq!(result.cents(), 3000);
    }

    #[test]
    fn test_tax_calculation_basic() {
        // 10.00 at 10% = 1.00
        let amount = Money::from_cents(1000);
        let rate = TaxRate::from_bps(1000);
        assert_eq!(amount.calculate_tax(rate).cents(), 100);
    }

    #[test]
    fn test_tax_calculation_with_rounding() {
        // 10.00 at 8.25% = 0.825 → 0.83
        let amount = Money::from_cents(1000);
        let rate = TaxRate::from_bps(825);
        assert_eq!(amount.calculate_tax(rate).cents(), 83);
    }

    #[test]
    fn test_extract_included_tax() {
        // 11.00 gross at 10% included → 1.00 tax
        let gross = Money::from_cents(1100);
        let rate = TaxRate::from_bps(1000);
        assert_eq!(gross.extract_included_tax(rate).cents(), 100);

        // 21% Spanish VAT: 12.10 gross → 2.10 tax
        let gross = Money::from_cents(1210);
        let rate = TaxRate::from_bps(2100);
        assert_eq!(gross.extract_included_tax(rate).cents(), 210);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(299);
        assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    }

    #[test]
    fn test_currency_round_two_decimals_is_identity() {
        let eur = Currency::eur();
        assert_eq!(eur.round(Money::from_cents(1234)).cents(), 1234);
    }

    #[test]
    fn test_currency_round_zero_decimals() {
        let yen = Currency::new("JPY", 0);
        assert_eq!(yen.round(Money::from_cents(1250)).cents(), 1300);
        assert_eq!(yen.round(Money::from_cents(1249)).cents(), 1200);
        assert_eq!(yen.round(Money::from_cents(-1250)).cents(), -1300);
    }

    #[test]
    fn test_currency_round_one_decimal() {
        let c = Currency::new("XTS", 1);
        assert_eq!(c.round(Money::from_cents(1234)).cents(), 1230);
        assert_eq!(c.round(Money::from_cents(1235)).cents(), 1240);
    }

    /// Documents the intentional precision loss of integer division.
    #[test]
    fn test_division_precision_loss_documented() {
        let ten = Money::from_cents(1000);
        let one_third = Money::from_cents(1000 / 3); // 333 cents
        let reconstructed: Money = one_third * 3; // 999 cents

        assert_eq!(reconstructed.cents(), 999);
        assert_eq!((ten - reconstructed).cents(), 1);
    }
}
