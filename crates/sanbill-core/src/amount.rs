//! # Amount Module
//!
//! Provides the `Amount` and `GstRate` types for handling monetary values.
//!
//! ## Why Decimal, and Why Round Once?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE ROUNDING DRIFT PROBLEM                                             │
//! │                                                                         │
//! │  Three rows, each 33.335 GST:                                           │
//! │    round each row:  33.34 + 33.34 + 33.34 = 100.02                     │
//! │    round the sum:   round(100.005)        = 100.01                     │
//! │                                                                         │
//! │  OUR SOLUTION: exact base-10 decimals everywhere                        │
//! │    rate × qty, GST and totals stay unrounded in memory                 │
//! │    rounding to 2 places happens once, when displaying or printing      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use sanbill_core::amount::{Amount, GstRate};
//!
//! let taxable = Amount::parse_or_zero("1,000.50");
//! let cgst = taxable.percent(GstRate::from_percent(Decimal::from(9)));
//! assert_eq!(cgst.to_string(), "90.05");
//!
//! // Garbage in, zero out
//! assert!(Amount::parse_or_zero("abc").is_zero());
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use std::str::FromStr;
use ts_rs::TS;

/// Number of decimal places shown on screen and on printed documents.
pub const DISPLAY_SCALE: u32 = 2;

// =============================================================================
// Text Parsing
// =============================================================================

/// Parses user-entered numeric text, returning zero for anything unusable.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Thousands separators (`,`) are stripped: `"1,250.50"` → `1250.50`
/// - Empty or non-numeric text is `0`
///
/// This is the parse-or-zero contract the calculator relies on: it never
/// fails, and a zero row is left for validation to reject.
pub fn parse_decimal_or_zero(text: &str) -> Decimal {
    parse_decimal(text).unwrap_or(Decimal::ZERO)
}

/// Parses user-entered numeric text, returning `None` when blank or invalid.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

// =============================================================================
// Amount Type
// =============================================================================

/// A monetary value in rupees, held as an exact decimal.
///
/// ## Design Decisions
/// - **Decimal, not f64**: `0.1 + 0.2` stays `0.3`
/// - **Unrounded**: values keep full precision until [`Amount::rounded`]
/// - **Serialized as a string**: `"2360.00"` survives JSON without loss
///
/// ## Where Amount is Used
/// ```text
/// LineDraft.rate ──► LineItemInput.rate ──► amount ──► taxable_amount
///                                                         │
///                                     cgst_amount ◄───────┤
///                                     sgst_amount ◄───────┘
///                                          │
///                                        total ──► DocumentTotals.grand_total
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Amount(#[ts(type = "string")] Decimal);

impl Amount {
    /// Wraps an exact decimal value.
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Amount(value)
    }

    /// Returns the zero amount.
    #[inline]
    pub const fn zero() -> Self {
        Amount(Decimal::ZERO)
    }

    /// Parses user text with the parse-or-zero contract.
    ///
    /// ## Example
    /// ```rust
    /// use sanbill_core::amount::Amount;
    ///
    /// assert_eq!(Amount::parse_or_zero(" 2,000 ").to_string(), "2000.00");
    /// assert!(Amount::parse_or_zero("").is_zero());
    /// ```
    pub fn parse_or_zero(text: &str) -> Self {
        Amount(parse_decimal_or_zero(text))
    }

    /// Returns the exact, unrounded value.
    #[inline]
    pub const fn value(&self) -> Decimal {
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

    /// Checks if the value is strictly less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns `rate` percent of this amount, unrounded.
    ///
    /// Zero when the product does not fit in a `Decimal`; use
    /// [`Amount::checked_percent`] to tell the two apart.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use sanbill_core::amount::{Amount, GstRate};
    ///
    /// let base = Amount::new(Decimal::from(300));
    /// let gst = base.percent(GstRate::from_percent(Decimal::from(6)));
    /// assert_eq!(gst.value(), Decimal::from(18));
    /// ```
    pub fn percent(&self, rate: GstRate) -> Amount {
        self.checked_percent(rate).unwrap_or_default()
    }

    /// `rate` percent of this amount, or `None` if it does not fit.
    pub fn checked_percent(&self, rate: GstRate) -> Option<Amount> {
        self.0
            .checked_mul(rate.percent())
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
            .map(Amount)
    }

    /// `self × qty`, or `None` on overflow.
    pub fn checked_mul(&self, qty: Decimal) -> Option<Amount> {
        self.0.checked_mul(qty).map(Amount)
    }

    /// `self + other`, or `None` on overflow.
    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Rounds to two places, half away from zero, for display and print.
    ///
    /// The result always carries exactly two decimal places, so
    /// `2360` comes back as `2360.00`.
    pub fn rounded(&self) -> Decimal {
        let mut value = self
            .0
            .round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(DISPLAY_SCALE);
        value
    }
}

/// Shows the value rounded to two decimal places (`%.2f` style).
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.rounded();
        if rounded.is_zero() {
            // Avoid printing "-0.00" for tiny negative remainders
            return write!(f, "0.00");
        }
        write!(f, "{}", rounded)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount(Decimal::from(value))
    }
}

impl Add for Amount {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Amount(self.0 + other.0)
    }
}

impl AddAssign for Amount {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Amount {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Amount(self.0 - other.0)
    }
}

/// Multiplication by a quantity.
impl Mul<Decimal> for Amount {
    type Output = Self;

    #[inline]
    fn mul(self, qty: Decimal) -> Self {
        Amount(self.0 * qty)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, a| acc + *a)
    }
}

// =============================================================================
// GST Rate
// =============================================================================

/// A CGST or SGST rate expressed as a percentage (`9` = 9%).
///
/// The calculator does not clamp rates; range checks live in
/// [`crate::validation::validate_gst_rate`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct GstRate(#[ts(type = "string")] Decimal);

impl GstRate {
    /// Creates a rate from a percentage.
    #[inline]
    pub const fn from_percent(percent: Decimal) -> Self {
        GstRate(percent)
    }

    /// Parses user text with the parse-or-zero contract.
    pub fn parse_or_zero(text: &str) -> Self {
        GstRate(parse_decimal_or_zero(text))
    }

    /// Returns the rate as a percentage.
    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    /// Zero rate (absent GST).
    #[inline]
    pub const fn zero() -> Self {
        GstRate(Decimal::ZERO)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for GstRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
