//! # Money Module
//!
//! Integer-cent money for prices, line totals and invoice figures.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Prices arrive from the catalog as cents and never leave that unit     │
//! │  until they are printed:                                               │
//! │                                                                         │
//! │    Product.price_cents ──► SaleLine.unit_price_cents                   │
//! │                               │ × quantity                              │
//! │                               ▼                                         │
//! │                         line total ──► Σ ──► Sale.total_cents          │
//! │                                              │ × 16% (half up)         │
//! │                                              ▼                          │
//! │                                        IVA ──► invoice TOTAL           │
//! │                                                                         │
//! │  Floating point is only ever produced by Display ("$40.60").           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use factura_core::money::Money;
//!
//! let price = Money::from_cents(1250);
//! let line = price.checked_multiply_quantity(2).unwrap();
//! assert_eq!(line.to_string(), "$25.00");
//! assert!(price.checked_multiply_quantity(i64::MAX).is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// Signed so that subtraction never wraps, though every amount the
/// point of sale stores is non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use factura_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole currency units, truncated toward zero.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// The cents part, always 0-99.
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Calculates tax with round-half-up on the cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, widened to i128 so a
    /// large subtotal cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use factura_core::money::Money;
    /// use factura_core::types::TaxRate;
    ///
    /// // $0.03 at 16% = 0.48 cents → 0 cents
    /// assert_eq!(Money::from_cents(3).calculate_tax(TaxRate::from_bps(1600)).cents(), 0);
    /// // $0.04 at 16% = 0.64 cents → 1 cent
    /// assert_eq!(Money::from_cents(4).calculate_tax(TaxRate::from_bps(1600)).cents(), 1);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Unit price × quantity, `None` past the i64 range.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders as `$x.xx`, the format printed on invoices.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.units().abs(), self.cents_part())
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

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}


// =============================================================================
// Unit Tests
// =============================================================================
