//! # sanbill-db: Database Layer for Sanbill
//!
//! This crate provides database access for Sanbill.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sanbill Data Flow                                │
//! │                                                                         │
//! │  CLI command (save invoice.json)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     sanbill-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Numbering   │  │   │
//! │  │   │   (pool.rs)   │    │               │    │              │  │   │
//! │  │   │               │    │ JobRepo       │    │ Allocator    │  │   │
//! │  │   │ SqlitePool    │◄───│ DocumentRepo  │    │ per-series   │  │   │
//! │  │   │ Series locks  │    │ ChargeRepo    │    │ lock + BEGIN │  │   │
//! │  │   │               │    │ CounterRepo   │◄───│ IMMEDIATE    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/sanbill/sanbill.db                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`numbering`] - Persistent document number allocator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sanbill_core::DocumentKind;
//! use sanbill_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/sanbill.db")).await?;
//!
//! let number = db.numbering().next_document_number(DocumentKind::Invoice).await?;
//! let open_jobs = db.jobs().list_open().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod numbering;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use numbering::{DocumentNumberAllocator, NumberingError, NumberingResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::charge::{ChargeInput, ChargeRepository};
pub use repository::consignee::{AddressInput, ConsigneeRepository};
pub use repository::counter::{CounterRepository, StoredCounter};
pub use repository::document::DocumentRepository;
pub use repository::job::{JobRepository, NewJob};
pub use repository::settings::SettingsRepository;
