//! # Repository Module
//!
//! Database repository implementations for Sanbill.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CLI command                                                           │
//! │       │                                                                 │
//! │       │  db.jobs().list_open()                                         │
//! │       ▼                                                                 │
//! │  JobRepository                                                         │
//! │  ├── insert(&self, job)                                                │
//! │  ├── get_by_job_no(&self, job_no)                                      │
//! │  └── close(&self, job_no)                                              │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SettingsRepository`](settings::SettingsRepository) - Key/value settings
//! - [`CounterRepository`](counter::CounterRepository) - Document counters
//! - [`ConsigneeRepository`](consignee::ConsigneeRepository) - Customers and addresses
//! - [`JobRepository`](job::JobRepository) - Shipment jobs
//! - [`ChargeRepository`](charge::ChargeRepository) - Charge master
//! - [`DocumentRepository`](document::DocumentRepository) - Invoices and debit notes
//!
//! ## Decimal Columns
//! Money and percentages are TEXT columns. [`encode_decimal`] writes the
//! exact value; [`decode_decimal`] reads it back and reports a bad value
//! as [`DbError::InvalidData`] rather than guessing.

pub mod charge;
pub mod consignee;
pub mod counter;
pub mod document;
pub mod job;
pub mod settings;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sanbill_core::{Amount, GstRate};
use std::str::FromStr;

use crate::error::{DbError, DbResult};

/// Text form of an exact decimal for storage.
pub(crate) fn encode_decimal(value: Decimal) -> String {
    value.to_string()
}

/// Parses a stored decimal column.
pub(crate) fn decode_decimal(column: &str, text: &str) -> DbResult<Decimal> {
    Decimal::from_str(text.trim()).map_err(|_| DbError::invalid_data(column, text))
}

pub(crate) fn decode_amount(column: &str, text: &str) -> DbResult<Amount> {
    decode_decimal(column, text).map(Amount::new)
}

pub(crate) fn decode_rate(column: &str, text: &str) -> DbResult<GstRate> {
    decode_decimal(column, text).map(GstRate::from_percent)
}

/// Parses a stored `YYYY-MM-DD` column.
pub(crate) fn decode_date(column: &str, text: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| DbError::invalid_data(column, text))
}

/// Parses a stored RFC 3339 timestamp column.
pub(crate) fn decode_timestamp(column: &str, text: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| DbError::invalid_data(column, text))
}

/// Blank text becomes `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
