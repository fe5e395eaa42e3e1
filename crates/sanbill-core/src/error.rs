//! # Error Types
//!
//! Domain-specific error types for sanbill-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  sanbill-core errors (this file)                                       │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  sanbill-db errors (separate crate)                                    │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── NumberingError   - Document number allocation failures            │
//! │                                                                         │
//! │  CLI errors (in app)                                                   │
//! │  └── CliError         - What the operator sees                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → CliError → Terminal     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The line-item calculator has no error type at all: unusable input
//! becomes zero and is caught by validation instead.

use thiserror::Error;

use crate::validation::LineIssue;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Job cannot be found by id or job number.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Job is closed and can no longer be billed.
    ///
    /// ## When This Occurs
    /// ```text
    /// Pick job "SE/1042" for a new invoice
    ///      │
    ///      ▼
    /// status = CLOSED
    ///      │
    ///      ▼
    /// JobClosed { job_no: "SE/1042" }
    /// ```
    #[error("Job {job_no} is closed")]
    JobClosed { job_no: String },

    /// Consignee cannot be found.
    #[error("Consignee not found: {0}")]
    ConsigneeNotFound(String),

    /// Document cannot be found by id or number.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Text does not have the `PREFIX/YY-YY/NNNN` shape.
    #[error("Invalid document number: {0}")]
    InvalidDocumentNumber(String),

    /// Unknown series name (expected invoice or debit-note).
    #[error("Unknown document series: {0}")]
    UnknownSeries(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before anything is written.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Field value has the wrong length (GSTIN, PAN).
    #[error("{field} must be exactly {expected} characters")]
    WrongLength { field: String, expected: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid date, bad GSTIN characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate job number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A document has no rows left after blank rows are dropped.
    #[error("Add at least one line item")]
    NoLineItems,

    /// One or more rows failed the line rules.
    ///
    /// Every failing row is reported at once so the operator can fix the
    /// whole grid in one pass.
    #[error("Fix the following line items: {}", join_issues(.0))]
    LineItems(Vec<LineIssue>),

    /// Every row computes, but the document total does not fit.
    #[error("Document total is too large")]
    TotalTooLarge,
}

fn join_issues(issues: &[LineIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::LineProblem;

    #[test]
    fn test_error_messages() {
        let err = CoreError::JobClosed {
            job_no: "SE/1042".to_string(),
        };
        assert_eq!(err.to_string(), "Job SE/1042 is closed");

        let err = CoreError::InvalidDocumentNumber("INV-7".to_string());
        assert_eq!(err.to_string(), "Invalid document number: INV-7");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "job_no".to_string(),
        };
        assert_eq!(err.to_string(), "job_no is required");

        let err = ValidationError::WrongLength {
            field: "gstin".to_string(),
            expected: 15,
        };
        assert_eq!(err.to_string(), "gstin must be exactly 15 characters");
    }

    #[test]
    fn test_line_items_message_lists_every_row() {
        let err = ValidationError::LineItems(vec![
            LineIssue::new(1, LineProblem::ZeroRateOrQuantity),
            LineIssue::new(3, LineProblem::MissingGst),
        ]);
        assert_eq!(
            err.to_string(),
            "Fix the following line items: Row 1: rate and quantity must be greater than zero; \
             Row 3: enter CGST or SGST"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::NoLineItems.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
