//! # Document Numbering
//!
//! Pure rules for fiscal-year scoped document numbers. Persistence and
//! locking live in `sanbill-db`; this module only decides what the next
//! counter is.
//!
//! ## Number Format
//! ```text
//!   SAN/INV / 24-25 / 0007
//!   ───┬───   ──┬──   ──┬─
//!      │        │       └── counter, zero-padded to 4 (wider counters print in full)
//!      │        └────────── fiscal year label "YY-YY"
//!      └─────────────────── series prefix (SAN/INV or SAN/DN)
//! ```
//!
//! ## Counter State Machine
//! ```text
//!                 first allocation
//!  UNINITIALIZED ───────────────────► ACTIVE(fy, 1)
//!                                        │
//!        same fiscal year                │       fiscal year changed
//!   ACTIVE(fy, n) ──► ACTIVE(fy, n + 1)  │  ACTIVE(old, n) ──► ACTIVE(new, 1)
//! ```
//!
//! The fiscal year starts on 1 April: 31 March 2025 is in `24-25`,
//! 1 April 2025 is in `25-26`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::CoreError;
use crate::types::DocumentKind;
use crate::COUNTER_WIDTH;

/// Month the fiscal year starts in (April).
pub const FISCAL_YEAR_START_MONTH: u32 = 4;

// =============================================================================
// Fiscal Year
// =============================================================================

/// An Indian fiscal year, 1 April to 31 March.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiscalYear {
    start_year: i32,
}

impl FiscalYear {
    /// The fiscal year that starts in April of `start_year`.
    #[inline]
    pub const fn starting_in(start_year: i32) -> Self {
        FiscalYear { start_year }
    }

    /// The fiscal year a calendar date falls in.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use sanbill_core::numbering::FiscalYear;
    ///
    /// let march = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
    /// let april = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
    ///
    /// assert_eq!(FiscalYear::containing(march).label(), "24-25");
    /// assert_eq!(FiscalYear::containing(april).label(), "25-26");
    /// ```
    pub fn containing(date: NaiveDate) -> Self {
        let start_year = if date.month() >= FISCAL_YEAR_START_MONTH {
            date.year()
        } else {
            date.year() - 1
        };
        FiscalYear { start_year }
    }

    /// Calendar year the fiscal year starts in.
    #[inline]
    pub const fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Calendar year the fiscal year ends in.
    #[inline]
    pub const fn end_year(&self) -> i32 {
        self.start_year + 1
    }

    /// First day (1 April).
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, FISCAL_YEAR_START_MONTH, 1)
    }

    /// Last day (31 March).
    pub fn last_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.end_year(), 3, 31)
    }

    /// Two-digit label, e.g. `"24-25"`.
    pub fn label(&self) -> String {
        format!(
            "{:02}-{:02}",
            self.start_year.rem_euclid(100),
            self.end_year().rem_euclid(100)
        )
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// =============================================================================
// Counter State
// =============================================================================

/// The live `(label, counter)` pair of one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CounterState {
    /// Fiscal-year label the counter belongs to.
    pub fiscal_year: String,
    /// Last counter issued in that fiscal year.
    #[ts(type = "number")]
    pub counter: u64,
}

impl CounterState {
    pub fn new(fiscal_year: impl Into<String>, counter: u64) -> Self {
        CounterState {
            fiscal_year: fiscal_year.into(),
            counter,
        }
    }

    /// Computes the state after one more allocation in `fiscal_year`.
    ///
    /// - no stored state: counter 1
    /// - stored label differs: counter 1 under the new label
    /// - stored label matches: counter + 1
    ///
    /// A label from the *future* (clock moved backwards) also resets;
    /// numbers are never reused within a label, only restarted.
    pub fn advance(stored: Option<&CounterState>, fiscal_year: &FiscalYear) -> CounterState {
        let label = fiscal_year.label();
        let counter = match stored {
            Some(state) if state.fiscal_year == label => state.counter.saturating_add(1),
            _ => 1,
        };

        CounterState {
            fiscal_year: label,
            counter,
        }
    }

    /// Formats this state as a document number for `kind`.
    pub fn document_number(&self, kind: DocumentKind) -> DocumentNumber {
        DocumentNumber {
            kind,
            fiscal_year: self.fiscal_year.clone(),
            counter: self.counter,
        }
    }
}

// =============================================================================
// Document Number
// =============================================================================

/// A parsed or freshly allocated document number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentNumber {
    pub kind: DocumentKind,
    pub fiscal_year: String,
    pub counter: u64,
}

/// Formats `"{PREFIX}/{FY}/{COUNTER:04}"`.
pub fn format_document_number(kind: DocumentKind, fiscal_year: &str, counter: u64) -> String {
    format!(
        "{}/{}/{:0width$}",
        kind.prefix(),
        fiscal_year,
        counter,
        width = COUNTER_WIDTH
    )
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_document_number(
            self.kind,
            &self.fiscal_year,
            self.counter,
        ))
    }
}

impl FromStr for DocumentNumber {
    type Err = CoreError;

    /// Parses `SAN/INV/24-25/0001` style text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || CoreError::InvalidDocumentNumber(text.to_string());

        let (kind, rest) = DocumentKind::ALL
            .iter()
            .find_map(|kind| {
                text.strip_prefix(kind.prefix())
                    .and_then(|rest| rest.strip_prefix('/'))
                    .map(|rest| (*kind, rest))
            })
            .ok_or_else(invalid)?;

        let (fiscal_year, counter) = rest.split_once('/').ok_or_else(invalid)?;
        if !is_fiscal_year_label(fiscal_year) {
            return Err(invalid());
        }
        if counter.len() < COUNTER_WIDTH || !counter.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let counter: u64 = counter.parse().map_err(|_| invalid())?;

        Ok(DocumentNumber {
            kind,
            fiscal_year: fiscal_year.to_string(),
            counter,
        })
    }
}

/// Checks the `NN-NN` label shape.
pub fn is_fiscal_year_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    bytes.len() == 5
        && bytes[2] == b'-'
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[3..].iter().all(u8::is_ascii_digit)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Runs the pure state machine the way the allocator does.
    fn allocate(stored: &mut Option<CounterState>, kind: DocumentKind, on: NaiveDate) -> String {
        let next = CounterState::advance(stored.as_ref(), &FiscalYear::containing(on));
        let number = next.document_number(kind).to_string();
        *stored = Some(next);
        number
    }

    #[test]
    fn test_fiscal_year_boundary() {
        assert_eq!(FiscalYear::containing(date(2024, 3, 31)).label(), "23-24");
        assert_eq!(FiscalYear::containing(date(2024, 4, 1)).label(), "24-25");
        assert_eq!(FiscalYear::containing(date(2024, 12, 31)).label(), "24-25");
        assert_eq!(FiscalYear::containing(date(2025, 1, 1)).label(), "24-25");
    }

    #[test]
    fn test_fiscal_year_century_wrap() {
        assert_eq!(FiscalYear::containing(date(2099, 6, 1)).label(), "99-00");
        assert_eq!(FiscalYear::containing(date(2000, 2, 1)).label(), "99-00");
    }

    #[test]
    fn test_fiscal_year_bounds() {
        let fy = FiscalYear::starting_in(2024);
        assert_eq!(fy.first_day(), Some(date(2024, 4, 1)));
        assert_eq!(fy.last_day(), Some(date(2025, 3, 31)));
        assert_eq!(fy.to_string(), "24-25");
    }

    #[test]
    fn test_sequential_numbers_same_day() {
        let mut stored = None;
        let on = date(2024, 6, 1);

        assert_eq!(allocate(&mut stored, DocumentKind::Invoice, on), "SAN/INV/24-25/0001");
        assert_eq!(allocate(&mut stored, DocumentKind::Invoice, on), "SAN/INV/24-25/0002");
    }

    #[test]
    fn test_rollover_resets_counter() {
        let mut stored = None;

        assert_eq!(
            allocate(&mut stored, DocumentKind::Invoice, date(2024, 3, 31)),
            "SAN/INV/23-24/0001"
        );
        assert_eq!(
            allocate(&mut stored, DocumentKind::Invoice, date(2024, 4, 1)),
            "SAN/INV/24-25/0001"
        );
    }

    #[test]
    fn test_rollover_after_many_documents() {
        let mut stored = Some(CounterState::new("23-24", 57));
        assert_eq!(
            allocate(&mut stored, DocumentKind::DebitNote, date(2024, 4, 2)),
            "SAN/DN/24-25/0001"
        );
    }

    #[test]
    fn test_series_are_independent() {
        let mut invoices = None;
        let mut debit_notes = None;
        let on = date(2024, 6, 1);

        assert_eq!(allocate(&mut invoices, DocumentKind::Invoice, on), "SAN/INV/24-25/0001");
        assert_eq!(allocate(&mut debit_notes, DocumentKind::DebitNote, on), "SAN/DN/24-25/0001");
        assert_eq!(allocate(&mut invoices, DocumentKind::Invoice, on), "SAN/INV/24-25/0002");
    }

    #[test]
    fn test_counter_wider_than_four_digits() {
        assert_eq!(
            format_document_number(DocumentKind::Invoice, "24-25", 12345),
            "SAN/INV/24-25/12345"
        );
        assert_eq!(
            format_document_number(DocumentKind::Invoice, "24-25", 9999),
            "SAN/INV/24-25/9999"
        );
    }

    #[test]
    fn test_parse_document_number() {
        let parsed: DocumentNumber = "SAN/DN/24-25/0042".parse().unwrap();
        assert_eq!(parsed.kind, DocumentKind::DebitNote);
        assert_eq!(parsed.fiscal_year, "24-25");
        assert_eq!(parsed.counter, 42);
        assert_eq!(parsed.to_string(), "SAN/DN/24-25/0042");
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        for bad in [
            "",
            "SAN/INV",
            "SAN/INV/2425/0001",
            "SAN/INV/24-25/1",
            "SAN/INV/24-25/00x1",
            "SAN/XX/24-25/0001",
            "INV/24-25/0001",
        ] {
            assert!(
                matches!(bad.parse::<DocumentNumber>(), Err(CoreError::InvalidDocumentNumber(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
