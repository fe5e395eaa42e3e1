//! # Counter Repository
//!
//! Persistence for the per-series document counters.
//!
//! ## Storage
//! ```text
//! settings
//! ┌──────────────┬─────────┐
//! │ key          │ value   │
//! ├──────────────┼─────────┤
//! │ inv_year     │ 24-25   │   Invoice series
//! │ inv_counter  │ 17      │
//! │ dn_year      │ 24-25   │   Debit note series
//! │ dn_counter   │ 3       │
//! └──────────────┴─────────┘
//! ```
//!
//! Both keys of a series are read in one statement and written in one
//! statement, so a reader never sees a label from one write and a counter
//! from another.
//!
//! The free functions take any SQLite executor so the allocator can run
//! them on the connection that holds its write transaction.

use sanbill_core::numbering::is_fiscal_year_label;
use sanbill_core::{CounterState, DocumentKind};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

// =============================================================================
// Stored Counter
// =============================================================================

/// What the store holds for one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredCounter {
    /// A well-formed `(label, counter)` pair.
    Valid(CounterState),
    /// Something is stored but it cannot be trusted.
    Corrupt {
        fiscal_year: Option<String>,
        counter: Option<String>,
    },
}

impl StoredCounter {
    /// Interprets raw setting values.
    ///
    /// Returns `None` when neither key is set. The pair is valid only if
    /// the label has the `NN-NN` shape and the counter is a non-negative
    /// integer made of ASCII digits.
    pub fn from_raw(fiscal_year: Option<String>, counter: Option<String>) -> Option<Self> {
        if fiscal_year.is_none() && counter.is_none() {
            return None;
        }

        let parsed = match (fiscal_year.as_deref(), counter.as_deref()) {
            (Some(label), Some(raw)) => {
                let label = label.trim();
                let raw = raw.trim();
                if is_fiscal_year_label(label)
                    && !raw.is_empty()
                    && raw.chars().all(|c| c.is_ascii_digit())
                {
                    raw.parse::<u64>().ok().map(|n| CounterState::new(label, n))
                } else {
                    None
                }
            }
            _ => None,
        };

        Some(match parsed {
            Some(state) => StoredCounter::Valid(state),
            None => StoredCounter::Corrupt {
                fiscal_year,
                counter,
            },
        })
    }

    /// The trusted state, if any.
    pub fn state(&self) -> Option<&CounterState> {
        match self {
            StoredCounter::Valid(state) => Some(state),
            StoredCounter::Corrupt { .. } => None,
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoredCounter::Corrupt { .. })
    }
}

// =============================================================================
// Executor-level Operations
// =============================================================================

/// Reads the stored counter of a series.
pub async fn get_counter<'e, E>(executor: E, kind: DocumentKind) -> DbResult<Option<StoredCounter>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(String, Option<String>)> =
        sqlx::query_as("SELECT key, value FROM settings WHERE key IN (?1, ?2)")
            .bind(kind.year_key())
            .bind(kind.counter_key())
            .fetch_all(executor)
            .await?;

    let mut fiscal_year = None;
    let mut counter = None;
    for (key, value) in rows {
        if key == kind.year_key() {
            fiscal_year = value;
        } else {
            counter = value;
        }
    }

    Ok(StoredCounter::from_raw(fiscal_year, counter))
}

/// Writes the counter of a series (label and counter together).
pub async fn set_counter<'e, E>(executor: E, kind: DocumentKind, state: &CounterState) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(
        series = %kind,
        fiscal_year = %state.fiscal_year,
        counter = state.counter,
        "Writing document counter"
    );

    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?1, ?2), (?3, ?4)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(kind.year_key())
    .bind(state.fiscal_year.as_str())
    .bind(kind.counter_key())
    .bind(state.counter.to_string())
    .execute(executor)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Pool-backed access to the counters, for inspection and repair.
///
/// Allocation does not go through here; see
/// [`DocumentNumberAllocator`](crate::numbering::DocumentNumberAllocator).
#[derive(Debug, Clone)]
pub struct CounterRepository {
    pool: SqlitePool,
}

impl CounterRepository {
    /// Creates a new CounterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CounterRepository { pool }
    }

    /// Reads the stored counter of a series.
    pub async fn get_counter(&self, kind: DocumentKind) -> DbResult<Option<StoredCounter>> {
        get_counter(&self.pool, kind).await
    }

    /// Overwrites the counter of a series.
    ///
    /// Used when migrating from another numbering source: the next
    /// allocation in the same fiscal year issues `counter + 1`.
    pub async fn set_counter(&self, kind: DocumentKind, state: &CounterState) -> DbResult<()> {
        set_counter(&self.pool, kind, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[test]
    fn test_from_raw() {
        assert_eq!(StoredCounter::from_raw(None, None), None);

        assert_eq!(
            StoredCounter::from_raw(Some("24-25".into()), Some("17".into())),
            Some(StoredCounter::Valid(CounterState::new("24-25", 17)))
        );

        for (year, counter) in [
            (Some("24-25"), Some("abc")),
            (Some("24-25"), Some("-3")),
            (Some("24-25"), Some("")),
            (Some("2024"), Some("5")),
            (None, Some("5")),
            (Some("24-25"), None),
        ] {
            let stored =
                StoredCounter::from_raw(year.map(String::from), counter.map(String::from));
            assert!(
                stored.as_ref().is_some_and(StoredCounter::is_corrupt),
                "{year:?}/{counter:?} should be corrupt"
            );
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let counters = db.counters();

        assert_eq!(counters.get_counter(DocumentKind::Invoice).await.unwrap(), None);

        counters
            .set_counter(DocumentKind::Invoice, &CounterState::new("24-25", 41))
            .await
            .unwrap();

        let stored = counters.get_counter(DocumentKind::Invoice).await.unwrap();
        assert_eq!(
            stored.as_ref().and_then(StoredCounter::state),
            Some(&CounterState::new("24-25", 41))
        );

        // The other series is untouched
        assert_eq!(counters.get_counter(DocumentKind::DebitNote).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_uses_legacy_setting_keys() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().set("dn_year", "23-24").await.unwrap();
        db.settings().set("dn_counter", "9").await.unwrap();

        let stored = db.counters().get_counter(DocumentKind::DebitNote).await.unwrap();
        assert_eq!(
            stored,
            Some(StoredCounter::Valid(CounterState::new("23-24", 9)))
        );
    }
}
