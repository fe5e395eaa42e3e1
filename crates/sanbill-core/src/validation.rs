//! # Validation Module
//!
//! Input validation for Sanbill documents and master data.
//!
//! ## Line Item Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Before a document is saved                         │
//! │                                                                         │
//! │  grid rows ──► drop rows with blank description                        │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │               none left? ──────────────► NoLineItems                   │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │  every row:  rate > 0 and qty > 0                                      │
//! │              cgst > 0 or sgst > 0                                      │
//! │              0 ≤ cgst, sgst ≤ 100                                      │
//! │                    │                                                    │
//! │              any failures? ────────────► LineItems([Row n: ...])       │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │              Vec<PreparedLine> (numbered 1..n, computed)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The calculator itself never rejects input; this is the only gate.
//!
//! ## Usage
//! ```rust
//! use sanbill_core::line_item::LineDraft;
//! use sanbill_core::validation::prepare_lines;
//!
//! let rows = vec![
//!     LineDraft {
//!         description: "Freight".into(),
//!         rate: "1000".into(),
//!         qty: "2".into(),
//!         cgst_rate: "9".into(),
//!         sgst_rate: "9".into(),
//!         ..Default::default()
//!     },
//!     LineDraft::default(), // unused grid row, dropped
//! ];
//!
//! let prepared = prepare_lines(&rows).unwrap();
//! assert_eq!(prepared.len(), 1);
//! assert_eq!(prepared[0].amounts.total.to_string(), "2360.00");
//! ```

use rust_decimal::Decimal;
use std::fmt;

use crate::amount::GstRate;
use crate::error::ValidationError;
use crate::line_item::{
    checked_line_item, DocumentTotals, LineDraft, LineItemAmounts, LineItemInput,
};
use crate::MAX_GST_PERCENT;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Length of a GST identification number.
pub const GSTIN_LENGTH: usize = 15;

/// Length of a permanent account number.
pub const PAN_LENGTH: usize = 10;

// =============================================================================
// Line Item Issues
// =============================================================================

/// What is wrong with one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineProblem {
    MissingDescription,
    ZeroRateOrQuantity,
    MissingGst,
    GstRateOutOfRange { field: &'static str, value: Decimal },
    /// The computed amounts do not fit in a decimal.
    AmountTooLarge,
}

impl fmt::Display for LineProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineProblem::MissingDescription => f.write_str("description is required"),
            LineProblem::ZeroRateOrQuantity => {
                f.write_str("rate and quantity must be greater than zero")
            }
            LineProblem::MissingGst => f.write_str("enter CGST or SGST"),
            LineProblem::GstRateOutOfRange { field, value } => write!(
                f,
                "{} {}% must be between 0 and {}",
                field,
                value.normalize(),
                MAX_GST_PERCENT
            ),
            LineProblem::AmountTooLarge => f.write_str("amount is too large to compute"),
        }
    }
}

/// A problem tied to a 1-based row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIssue {
    pub row: usize,
    pub problem: LineProblem,
}

impl LineIssue {
    pub fn new(row: usize, problem: LineProblem) -> Self {
        LineIssue { row, problem }
    }
}

impl fmt::Display for LineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row, self.problem)
    }
}

// =============================================================================
// Prepared Line
// =============================================================================

/// A row that passed validation, with its computed amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedLine {
    /// 1-based position after blank rows were dropped.
    pub sr_no: u32,
    pub description: String,
    pub hsn_sac: String,
    pub currency: String,
    pub input: LineItemInput,
    pub amounts: LineItemAmounts,
}

// =============================================================================
// Line Item Validators
// =============================================================================

/// Checks one parsed row against the line policy.
///
/// Returns every problem found, in a stable order.
pub fn check_line(description: &str, input: &LineItemInput) -> Vec<LineProblem> {
    let mut problems = Vec::new();

    if description.trim().is_empty() {
        problems.push(LineProblem::MissingDescription);
    }

    if !input.rate.is_positive() || input.qty <= Decimal::ZERO {
        problems.push(LineProblem::ZeroRateOrQuantity);
    }

    let cgst = input.cgst_rate.percent();
    let sgst = input.sgst_rate.percent();
    if cgst <= Decimal::ZERO && sgst <= Decimal::ZERO {
        problems.push(LineProblem::MissingGst);
    }

    for (field, rate) in [("CGST", input.cgst_rate), ("SGST", input.sgst_rate)] {
        if validate_gst_rate(rate).is_err() {
            problems.push(LineProblem::GstRateOutOfRange {
                field,
                value: rate.percent(),
            });
        }
    }

    if checked_line_item(input).is_none() {
        problems.push(LineProblem::AmountTooLarge);
    }

    problems
}

/// Drops blank rows, computes the rest and applies the line policy.
///
/// ## Errors
/// - [`ValidationError::NoLineItems`] when no row has a description
/// - [`ValidationError::LineItems`] listing every failing row, numbered
///   after blank rows are dropped (the numbers printed on the document)
/// - [`ValidationError::TotalTooLarge`] when the rows are fine but their
///   sum overflows
pub fn prepare_lines(rows: &[LineDraft]) -> ValidationResult<Vec<PreparedLine>> {
    let mut prepared = Vec::new();
    let mut issues = Vec::new();

    for (index, row) in rows.iter().filter(|row| !row.is_blank()).enumerate() {
        let input = row.to_input();
        let row_number = index + 1;

        issues.extend(
            check_line(&row.description, &input)
                .into_iter()
                .map(|problem| LineIssue::new(row_number, problem)),
        );

        prepared.push(PreparedLine {
            sr_no: row_number as u32,
            description: row.description.trim().to_string(),
            hsn_sac: row.hsn_sac.trim().to_string(),
            currency: row.currency_or_default(),
            input,
            amounts: input.compute(),
        });
    }

    if prepared.is_empty() {
        return Err(ValidationError::NoLineItems);
    }

    if !issues.is_empty() {
        return Err(ValidationError::LineItems(issues));
    }

    if DocumentTotals::checked_from_lines(prepared.iter().map(|line| &line.amounts)).is_none() {
        return Err(ValidationError::TotalTooLarge);
    }

    Ok(prepared)
}

/// Validates a GST percentage.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use sanbill_core::amount::GstRate;
/// use sanbill_core::validation::validate_gst_rate;
///
/// assert!(validate_gst_rate(GstRate::from_percent(Decimal::from(9))).is_ok());
/// assert!(validate_gst_rate(GstRate::from_percent(Decimal::from(118))).is_err());
/// ```
pub fn validate_gst_rate(rate: GstRate) -> ValidationResult<()> {
    let percent = rate.percent();
    if percent < Decimal::ZERO || percent > Decimal::from(MAX_GST_PERCENT) {
        return Err(ValidationError::OutOfRange {
            field: "gst_rate".to_string(),
            min: 0,
            max: i64::from(MAX_GST_PERCENT),
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

fn required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a job number.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, `/`, `-` and `_` only (e.g. `SE/1042`)
pub fn validate_job_no(job_no: &str) -> ValidationResult<()> {
    required("job_no", job_no, 50)?;

    if !job_no
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "job_no".to_string(),
            reason: "must contain only letters, numbers, '/', '-' and '_'".to_string(),
        });
    }

    Ok(())
}

/// Validates a consignee (customer) name.
pub fn validate_consignee_name(name: &str) -> ValidationResult<()> {
    required("name", name, 200)
}

/// Validates a charge master name.
pub fn validate_charge_name(name: &str) -> ValidationResult<()> {
    required("charge_name", name, 200)
}

/// Validates an optional GSTIN. Blank is accepted.
///
/// ## Example
/// ```rust
/// use sanbill_core::validation::validate_gstin;
///
/// assert!(validate_gstin("27AAPFU0939F1ZV").is_ok());
/// assert!(validate_gstin("").is_ok());
/// assert!(validate_gstin("27AAPFU0939F1Z").is_err());
/// ```
pub fn validate_gstin(gstin: &str) -> ValidationResult<()> {
    let gstin = gstin.trim();
    if gstin.is_empty() {
        return Ok(());
    }

    if gstin.chars().count() != GSTIN_LENGTH {
        return Err(ValidationError::WrongLength {
            field: "gstin".to_string(),
            expected: GSTIN_LENGTH,
        });
    }

    if !gstin.chars().take(2).all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "gstin".to_string(),
            reason: "must start with a two-digit state code".to_string(),
        });
    }

    if !gstin.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "gstin".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates an optional PAN (`AAAAA9999A`). Blank is accepted.
pub fn validate_pan(pan: &str) -> ValidationResult<()> {
    let pan = pan.trim();
    if pan.is_empty() {
        return Ok(());
    }

    if pan.chars().count() != PAN_LENGTH {
        return Err(ValidationError::WrongLength {
            field: "pan".to_string(),
            expected: PAN_LENGTH,
        });
    }

    let shape_ok = pan.chars().enumerate().all(|(i, c)| match i {
        0..=4 | 9 => c.is_ascii_alphabetic(),
        _ => c.is_ascii_digit(),
    });
    if !shape_ok {
        return Err(ValidationError::InvalidFormat {
            field: "pan".to_string(),
            reason: "expected five letters, four digits, one letter".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
