//! # Line Item Calculator
//!
//! Computes the GST breakdown for one invoice or debit-note row, and the
//! document totals over many rows.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  amount   = rate × qty                                                  │
//! │  taxable  = taxable_override  (when given)                              │
//! │           = amount            (otherwise)                               │
//! │  cgst     = taxable × cgst% / 100                                       │
//! │  sgst     = taxable × sgst% / 100                                       │
//! │  total    = taxable + cgst + sgst                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here rounds. Rows are summed at full precision and the
//! [`Amount`] display rounds once.
//!
//! ## Example
//! ```rust
//! use rust_decimal::Decimal;
//! use sanbill_core::line_item::LineDraft;
//!
//! let draft = LineDraft {
//!     description: "Ocean freight".into(),
//!     rate: "500".into(),
//!     qty: "1".into(),
//!     taxable_override: Some("300".into()),
//!     cgst_rate: "6".into(),
//!     sgst_rate: "6".into(),
//!     ..Default::default()
//! };
//!
//! let line = draft.to_input().compute();
//! assert_eq!(line.amount.value(), Decimal::from(500));
//! assert_eq!(line.total.to_string(), "336.00");
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::amount::{parse_decimal, parse_decimal_or_zero, Amount, GstRate};
use crate::DEFAULT_CURRENCY;

// =============================================================================
// Calculator Input
// =============================================================================

/// Parsed numeric input for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItemInput {
    /// Unit rate.
    pub rate: Amount,

    /// Quantity (may be fractional, e.g. 2.5 CBM).
    #[ts(type = "string")]
    pub qty: Decimal,

    /// Taxable value entered by hand, replacing `rate × qty`.
    pub taxable_override: Option<Amount>,

    /// Central GST percentage.
    pub cgst_rate: GstRate,

    /// State GST percentage.
    pub sgst_rate: GstRate,
}

impl LineItemInput {
    /// Creates an input with no override and zero GST.
    pub fn new(rate: Amount, qty: Decimal) -> Self {
        LineItemInput {
            rate,
            qty,
            taxable_override: None,
            cgst_rate: GstRate::zero(),
            sgst_rate: GstRate::zero(),
        }
    }

    /// Sets the CGST and SGST percentages.
    pub fn with_gst(mut self, cgst_rate: GstRate, sgst_rate: GstRate) -> Self {
        self.cgst_rate = cgst_rate;
        self.sgst_rate = sgst_rate;
        self
    }

    /// Sets a taxable override.
    pub fn with_taxable_override(mut self, taxable: Amount) -> Self {
        self.taxable_override = Some(taxable);
        self
    }

    /// Runs the calculator on this input.
    pub fn compute(&self) -> LineItemAmounts {
        compute_line_item(self)
    }

    /// Runs the calculator, returning `None` on overflow.
    pub fn checked_compute(&self) -> Option<LineItemAmounts> {
        checked_line_item(self)
    }
}

// =============================================================================
// Calculator Output
// =============================================================================

/// Derived amounts for one row, all unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItemAmounts {
    /// `rate × qty`, before any override.
    pub amount: Amount,
    /// Base the GST is charged on.
    pub taxable_amount: Amount,
    pub cgst_amount: Amount,
    pub sgst_amount: Amount,
    /// `taxable + cgst + sgst`.
    pub total: Amount,
}

/// Computes the GST breakdown for a single row.
///
/// Pure and total: every input produces a result. A negative override is
/// passed through unchanged; rejecting it is the validator's job. A row
/// whose amounts do not fit in a `Decimal` computes as all zeros, like any
/// other unusable input, and [`checked_line_item`] reports it.
pub fn compute_line_item(input: &LineItemInput) -> LineItemAmounts {
    checked_line_item(input).unwrap_or_default()
}

/// Computes the GST breakdown, or `None` if any amount overflows.
pub fn checked_line_item(input: &LineItemInput) -> Option<LineItemAmounts> {
    let amount = input.rate.checked_mul(input.qty)?;
    let taxable_amount = input.taxable_override.unwrap_or(amount);
    let cgst_amount = taxable_amount.checked_percent(input.cgst_rate)?;
    let sgst_amount = taxable_amount.checked_percent(input.sgst_rate)?;
    let total = taxable_amount
        .checked_add(cgst_amount)?
        .checked_add(sgst_amount)?;

    Some(LineItemAmounts {
        amount,
        taxable_amount,
        cgst_amount,
        sgst_amount,
        total,
    })
}

// =============================================================================
// Raw Row (as typed by the operator)
// =============================================================================

/// One row exactly as entered in the line-item grid.
///
/// Numeric fields are kept as text so that the host can hand over
/// whatever was typed; [`LineDraft::to_input`] applies parse-or-zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct LineDraft {
    pub description: String,
    pub hsn_sac: String,
    /// Blank means [`DEFAULT_CURRENCY`].
    pub currency: String,
    pub rate: String,
    pub qty: String,
    /// Blank or missing means "use rate × qty".
    pub taxable_override: Option<String>,
    pub cgst_rate: String,
    pub sgst_rate: String,
}

impl LineDraft {
    /// A row with no description is treated as an unused grid row.
    pub fn is_blank(&self) -> bool {
        self.description.trim().is_empty()
    }

    /// Currency code with the default applied.
    pub fn currency_or_default(&self) -> String {
        let code = self.currency.trim();
        if code.is_empty() {
            DEFAULT_CURRENCY.to_string()
        } else {
            code.to_uppercase()
        }
    }

    /// Parses the numeric text into calculator input.
    ///
    /// An override that is blank counts as absent. An override that is
    /// present but not a number counts as zero, like every other field.
    pub fn to_input(&self) -> LineItemInput {
        let taxable_override = self
            .taxable_override
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .map(|text| Amount::new(parse_decimal(text).unwrap_or(Decimal::ZERO)));

        LineItemInput {
            rate: Amount::parse_or_zero(&self.rate),
            qty: parse_decimal_or_zero(&self.qty),
            taxable_override,
            cgst_rate: GstRate::parse_or_zero(&self.cgst_rate),
            sgst_rate: GstRate::parse_or_zero(&self.sgst_rate),
        }
    }
}

// =============================================================================
// Document Totals
// =============================================================================

/// Sums over all rows of a document.
///
/// ```text
/// row 1 ──┐
/// row 2 ──┼──► Σ taxable, Σ cgst, Σ sgst, Σ total  ──► round once
/// row n ──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentTotals {
    pub taxable_total: Amount,
    pub cgst_total: Amount,
    pub sgst_total: Amount,
    pub grand_total: Amount,
    pub line_count: u32,
}

impl DocumentTotals {
    /// Sums computed rows without intermediate rounding.
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a LineItemAmounts>,
    {
        lines
            .into_iter()
            .fold(DocumentTotals::default(), |mut totals, line| {
                totals.add_line(line);
                totals
            })
    }

    /// Like [`DocumentTotals::from_lines`], but `None` if a sum overflows.
    pub fn checked_from_lines<'a, I>(lines: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a LineItemAmounts>,
    {
        lines
            .into_iter()
            .try_fold(DocumentTotals::default(), |totals, line| {
                Some(DocumentTotals {
                    taxable_total: totals.taxable_total.checked_add(line.taxable_amount)?,
                    cgst_total: totals.cgst_total.checked_add(line.cgst_amount)?,
                    sgst_total: totals.sgst_total.checked_add(line.sgst_amount)?,
                    grand_total: totals.grand_total.checked_add(line.total)?,
                    line_count: totals.line_count + 1,
                })
            })
    }

    /// Adds one computed row.
    pub fn add_line(&mut self, line: &LineItemAmounts) {
        self.taxable_total += line.taxable_amount;
        self.cgst_total += line.cgst_amount;
        self.sgst_total += line.sgst_amount;
        self.grand_total += line.total;
        self.line_count += 1;
    }

    /// Combined CGST and SGST.
    pub fn gst_total(&self) -> Amount {
        self.cgst_total + self.sgst_total
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(rate: Decimal, qty: Decimal, cgst: Decimal, sgst: Decimal) -> LineItemInput {
        LineItemInput::new(Amount::new(rate), qty)
            .with_gst(GstRate::from_percent(cgst), GstRate::from_percent(sgst))
    }

    #[test]
    fn test_basic_line_with_gst() {
        let line = input(dec!(1000), dec!(2), dec!(9), dec!(9)).compute();

        assert_eq!(line.amount.value(), dec!(2000));
        assert_eq!(line.taxable_amount.value(), dec!(2000));
        assert_eq!(line.cgst_amount.value(), dec!(180));
        assert_eq!(line.sgst_amount.value(), dec!(180));
        assert_eq!(line.total.value(), dec!(2360));
    }

    #[test]
    fn test_taxable_override_replaces_amount() {
        let line = input(dec!(500), dec!(1), dec!(6), dec!(6))
            .with_taxable_override(Amount::new(dec!(300)))
            .compute();

        assert_eq!(line.amount.value(), dec!(500));
        assert_eq!(line.taxable_amount.value(), dec!(300));
        assert_eq!(line.cgst_amount.value(), dec!(18));
        assert_eq!(line.sgst_amount.value(), dec!(18));
        assert_eq!(line.total.value(), dec!(336));
    }

    #[test]
    fn test_zero_override_is_honoured() {
        let line = input(dec!(500), dec!(1), dec!(9), dec!(9))
            .with_taxable_override(Amount::zero())
            .compute();

        assert!(line.taxable_amount.is_zero());
        assert!(line.total.is_zero());
        assert_eq!(line.amount.value(), dec!(500));
    }

    #[test]
    fn test_no_gst_means_total_equals_taxable() {
        let line = input(dec!(1250.50), dec!(3), dec!(0), dec!(0)).compute();
        assert_eq!(line.total, line.taxable_amount);
        assert_eq!(line.total.value(), dec!(3751.50));
    }

    #[test]
    fn test_garbage_text_computes_as_zero() {
        let draft = LineDraft {
            description: "Handling".into(),
            rate: "abc".into(),
            qty: "".into(),
            cgst_rate: "nine".into(),
            sgst_rate: "9".into(),
            ..Default::default()
        };

        let line = draft.to_input().compute();
        assert!(line.amount.is_zero());
        assert!(line.total.is_zero());
    }

    #[test]
    fn test_blank_override_is_absent() {
        let draft = LineDraft {
            description: "Documentation".into(),
            rate: "1,000".into(),
            qty: "2".into(),
            taxable_override: Some("   ".into()),
            cgst_rate: "9".into(),
            sgst_rate: "9".into(),
            ..Default::default()
        };

        let parsed = draft.to_input();
        assert_eq!(parsed.taxable_override, None);
        assert_eq!(parsed.compute().total.to_string(), "2360.00");
    }

    #[test]
    fn test_non_numeric_override_is_zero() {
        let draft = LineDraft {
            description: "Documentation".into(),
            rate: "100".into(),
            qty: "1".into(),
            taxable_override: Some("n/a".into()),
            ..Default::default()
        };

        assert_eq!(draft.to_input().taxable_override, Some(Amount::zero()));
    }

    #[test]
    fn test_currency_default_and_blank_row() {
        let draft = LineDraft::default();
        assert!(draft.is_blank());
        assert_eq!(draft.currency_or_default(), "INR");

        let draft = LineDraft {
            description: "Freight".into(),
            currency: "usd".into(),
            ..Default::default()
        };
        assert!(!draft.is_blank());
        assert_eq!(draft.currency_or_default(), "USD");
    }

    #[test]
    fn test_totals_sum_unrounded_then_round_once() {
        // 33.335 GST per row: rounding each row first would give 100.02
        let rows: Vec<LineItemAmounts> = (0..3)
            .map(|_| input(dec!(333.35), dec!(1), dec!(10), dec!(0)).compute())
            .collect();

        let totals = DocumentTotals::from_lines(&rows);
        assert_eq!(totals.line_count, 3);
        assert_eq!(totals.cgst_total.value(), dec!(100.005));
        assert_eq!(totals.cgst_total.to_string(), "100.01");
        assert_eq!(totals.taxable_total.value(), dec!(1000.05));
        assert_eq!(totals.grand_total.value(), dec!(1100.055));
        assert_eq!(totals.gst_total(), totals.cgst_total);
    }

    #[test]
    fn test_totals_of_nothing_is_zero() {
        let rows: Vec<LineItemAmounts> = Vec::new();
        let totals = DocumentTotals::from_lines(&rows);
        assert_eq!(totals.line_count, 0);
        assert!(totals.grand_total.is_zero());
    }

    #[test]
    fn test_overflow_computes_as_zero_row() {
        let draft = LineDraft {
            description: "Freight".into(),
            rate: "79228162514264337593543950335".into(),
            qty: "2".into(),
            cgst_rate: "9".into(),
            sgst_rate: "9".into(),
            ..Default::default()
        };

        let parsed = draft.to_input();
        assert_eq!(parsed.checked_compute(), None);
        assert_eq!(parsed.compute(), LineItemAmounts::default());
    }

    #[test]
    fn test_overflow_in_gst_is_caught() {
        let line = input(dec!(1), dec!(1), dec!(100), dec!(0))
            .with_taxable_override(Amount::new(Decimal::MAX));
        assert_eq!(line.checked_compute(), None);
        assert!(line.compute().total.is_zero());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// 0.00 to 100,000,000.00
        fn arb_rate() -> impl Strategy<Value = Decimal> {
            (0i64..=10_000_000_000).prop_map(|paise| Decimal::new(paise, 2))
        }

        /// 0.000 to 10,000.000
        fn arb_qty() -> impl Strategy<Value = Decimal> {
            (0i64..=10_000_000).prop_map(|thousandths| Decimal::new(thousandths, 3))
        }

        /// 0% to 100% in steps of 0.01
        fn arb_gst() -> impl Strategy<Value = Decimal> {
            (0i64..=10_000).prop_map(|basis| Decimal::new(basis, 2))
        }

        fn arb_decimal() -> impl Strategy<Value = Decimal> {
            (any::<u32>(), any::<u32>(), any::<u32>(), any::<bool>(), 0u32..=28)
                .prop_map(|(lo, mid, hi, negative, scale)| {
                    Decimal::from_parts(lo, mid, hi, negative, scale)
                })
        }

        proptest! {
            #[test]
            fn amount_is_rate_times_qty(rate in arb_rate(), qty in arb_qty(), c in arb_gst(), s in arb_gst()) {
                let line = input(rate, qty, c, s).compute();
                prop_assert_eq!(line.amount.value(), rate * qty);
            }

            #[test]
            fn override_wins_over_rate_and_qty(
                rate in arb_rate(),
                qty in arb_qty(),
                taxable in arb_rate(),
                c in arb_gst(),
                s in arb_gst(),
            ) {
                let line = input(rate, qty, c, s)
                    .with_taxable_override(Amount::new(taxable))
                    .compute();
                prop_assert_eq!(line.taxable_amount.value(), taxable);
                prop_assert_eq!(line.amount.value(), rate * qty);
            }

            #[test]
            fn total_is_taxable_plus_both_gst_parts(rate in arb_rate(), qty in arb_qty(), c in arb_gst(), s in arb_gst()) {
                let line = input(rate, qty, c, s).compute();
                let t = line.taxable_amount.value();
                let hundred = Decimal::ONE_HUNDRED;

                prop_assert_eq!(line.cgst_amount.value(), t * c / hundred);
                prop_assert_eq!(line.sgst_amount.value(), t * s / hundred);
                prop_assert_eq!(line.total.value(), t + t * c / hundred + t * s / hundred);
            }

            #[test]
            fn total_never_below_taxable(rate in arb_rate(), qty in arb_qty(), c in arb_gst(), s in arb_gst()) {
                let line = input(rate, qty, c, s).compute();
                prop_assert!(line.total >= line.taxable_amount);
            }

            #[test]
            fn any_decimal_input_computes_without_panicking(
                rate in arb_decimal(),
                qty in arb_decimal(),
                c in arb_decimal(),
                s in arb_decimal(),
            ) {
                let parsed = input(rate, qty, c, s);
                let line = parsed.compute();
                match parsed.checked_compute() {
                    Some(checked) => prop_assert_eq!(line, checked),
                    None => prop_assert_eq!(line, LineItemAmounts::default()),
                }
            }

            #[test]
            fn any_text_computes_without_panicking(
                rate in "[0-9,.-]{0,40}",
                qty in "[0-9,.-]{0,40}",
                c in "[0-9.]{0,6}",
            ) {
                let draft = LineDraft {
                    description: "Freight".into(),
                    rate,
                    qty,
                    cgst_rate: c.clone(),
                    sgst_rate: c,
                    ..Default::default()
                };
                let _ = draft.to_input().compute();
                let _ = crate::validation::prepare_lines(&[draft]);
            }
        }
    }
}
