//! # sanbill-core: Pure Business Logic for Sanbill
//!
//! This crate is the **heart** of Sanbill, a freight-forwarding invoicing
//! tool. It contains the GST arithmetic and the fiscal-year numbering rules
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sanbill Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Host (sanbill CLI / UI)                      │   │
//! │  │    calc ──► save ──► list/show ──► next-number                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ sanbill-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  amount   │  │ line_item │  │ numbering │  │   │
//! │  │   │   Job     │  │  Amount   │  │  compute  │  │ FiscalYear│  │   │
//! │  │   │ Document  │  │  GstRate  │  │  totals   │  │ Counter   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    sanbill-db (Database Layer)                  │   │
//! │  │        SQLite queries, migrations, counter store, documents    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`amount`] - `Amount` and `GstRate` over exact decimals
//! - [`line_item`] - Per-row GST computation and document totals
//! - [`numbering`] - Fiscal-year document numbering rules
//! - [`types`] - Domain types (Job, Consignee, Charge, Document, etc.)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, no hidden state
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Exact Decimals**: rate × qty is computed in base 10, rounded once for display
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use sanbill_core::line_item::LineItemInput;
//! use sanbill_core::{Amount, GstRate};
//!
//! let input = LineItemInput::new(Amount::new(Decimal::from(1000)), Decimal::from(2))
//!     .with_gst(GstRate::from_percent(Decimal::from(9)), GstRate::from_percent(Decimal::from(9)));
//!
//! let line = input.compute();
//! assert_eq!(line.total.to_string(), "2360.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod amount;
pub mod error;
pub mod line_item;
pub mod numbering;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use amount::{Amount, GstRate};
pub use error::{CoreError, CoreResult, ValidationError};
pub use line_item::{checked_line_item, compute_line_item, DocumentTotals, LineItemAmounts, LineItemInput};
pub use numbering::{CounterState, DocumentNumber, FiscalYear};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Currency printed on a line when the host leaves it blank.
pub const DEFAULT_CURRENCY: &str = "INR";

/// Width the counter is zero-padded to in a document number.
pub const COUNTER_WIDTH: usize = 4;

/// Upper bound for a single CGST or SGST percentage.
pub const MAX_GST_PERCENT: u32 = 100;
