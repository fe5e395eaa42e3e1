//! # Document Number Allocator
//!
//! Issues `SAN/INV/24-25/0001` style numbers that are unique and gap-free
//! within a series and fiscal year, across restarts and across processes
//! sharing the database file.
//!
//! ## Allocation Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  next_number(Invoice, today = 2024-06-01)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock series mutex (Invoice)        ← serializes tasks in this process │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE                    ← serializes other processes       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  read inv_year / inv_counter        ← corrupt? warn, treat as empty    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CounterState::advance(stored, FY 24-25)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  write inv_year / inv_counter  (+ document rows, for `issue`)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT  ── failure anywhere ──►  ROLLBACK, no number returned         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Local, NaiveDate, Utc};
use sanbill_core::{
    CounterState, Document, DocumentItem, DocumentKind, DocumentNumber, FiscalYear, NewDocument,
};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::repository::counter::{self, StoredCounter};
use crate::repository::document;

// =============================================================================
// Errors
// =============================================================================

/// Document number allocation errors.
#[derive(Debug, Error)]
pub enum NumberingError {
    /// The counter store could not be read or written.
    ///
    /// No number is returned and the stored counter is unchanged.
    #[error("Document counter store unavailable: {0}")]
    StorageUnavailable(#[source] DbError),

    /// The number was available but the document rows were rejected
    /// (for example an unknown job). The counter is rolled back.
    #[error("Document could not be saved: {0}")]
    SaveFailed(#[source] DbError),
}

/// Result type for numbering operations.
pub type NumberingResult<T> = Result<T, NumberingError>;

fn unavailable(err: impl Into<DbError>) -> NumberingError {
    NumberingError::StorageUnavailable(err.into())
}

// =============================================================================
// Series Locks
// =============================================================================

/// One async mutex per series. Invoices never wait on debit notes.
#[derive(Debug, Default)]
pub struct SeriesLocks {
    invoice: Mutex<()>,
    debit_note: Mutex<()>,
}

impl SeriesLocks {
    fn for_kind(&self, kind: DocumentKind) -> &Mutex<()> {
        match kind {
            DocumentKind::Invoice => &self.invoice,
            DocumentKind::DebitNote => &self.debit_note,
        }
    }
}

// =============================================================================
// Allocator
// =============================================================================

/// Persistent, concurrency-safe document number allocator.
///
/// Obtain one from [`Database::numbering`](crate::Database::numbering);
/// every allocator from the same `Database` shares its locks.
#[derive(Debug, Clone)]
pub struct DocumentNumberAllocator {
    pool: SqlitePool,
    locks: Arc<SeriesLocks>,
}

impl DocumentNumberAllocator {
    pub(crate) fn new(pool: SqlitePool, locks: Arc<SeriesLocks>) -> Self {
        DocumentNumberAllocator { pool, locks }
    }

    /// Allocates the next number of `kind` in the fiscal year containing `today`.
    ///
    /// `today` is the allocation clock, not a document date. Hosts pass the
    /// current local date; tests pin it.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let june = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    /// assert_eq!(allocator.next_number(DocumentKind::Invoice, june).await?, "SAN/INV/24-25/0001");
    /// assert_eq!(allocator.next_number(DocumentKind::Invoice, june).await?, "SAN/INV/24-25/0002");
    /// ```
    pub async fn next_number(&self, kind: DocumentKind, today: NaiveDate) -> NumberingResult<String> {
        Ok(self.allocate(kind, today).await?.to_string())
    }

    /// Allocates the next number of `kind` for today's local date.
    pub async fn next_document_number(&self, kind: DocumentKind) -> NumberingResult<String> {
        self.next_number(kind, Local::now().date_naive()).await
    }

    /// Allocates the next number and returns it in parsed form.
    pub async fn allocate(&self, kind: DocumentKind, today: NaiveDate) -> NumberingResult<DocumentNumber> {
        let (number, _) = self.run_locked(kind, today, None).await?;
        Ok(number)
    }

    /// Allocates a number for today and stores the document under it, atomically.
    ///
    /// Either both the counter and the document rows are written, or
    /// neither is: a rejected document does not consume a number. The
    /// document's own date is printed on it but never picks the series year.
    pub async fn issue(&self, new_document: &NewDocument) -> NumberingResult<(Document, Vec<DocumentItem>)> {
        self.issue_on(new_document, Local::now().date_naive()).await
    }

    /// [`issue`](Self::issue) with the allocation clock pinned to `today`.
    pub async fn issue_on(
        &self,
        new_document: &NewDocument,
        today: NaiveDate,
    ) -> NumberingResult<(Document, Vec<DocumentItem>)> {
        let (_, saved) = self
            .run_locked(new_document.kind, today, Some(new_document))
            .await?;

        // run_locked always returns rows when given a document
        saved.ok_or_else(|| NumberingError::SaveFailed(DbError::Internal("document rows missing".into())))
    }

    async fn run_locked(
        &self,
        kind: DocumentKind,
        today: NaiveDate,
        new_document: Option<&NewDocument>,
    ) -> NumberingResult<(DocumentNumber, Option<(Document, Vec<DocumentItem>)>)> {
        let _guard = self.locks.for_kind(kind).lock().await;
        debug!(series = %kind, %today, "Series lock acquired");

        // Rolled back on drop, so a cancelled caller never leaves the
        // write lock held on a pooled connection.
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(unavailable)?;

        let result = write_in_transaction(&mut tx, kind, today, new_document).await?;

        tx.commit().await.map_err(unavailable)?;
        info!(series = %kind, number = %result.0, "Allocated document number");
        Ok(result)
    }
}

/// Counter advance (and optional document insert) inside an open transaction.
async fn write_in_transaction(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    today: NaiveDate,
    new_document: Option<&NewDocument>,
) -> NumberingResult<(DocumentNumber, Option<(Document, Vec<DocumentItem>)>)> {
    let fiscal_year = FiscalYear::containing(today);

    let stored = counter::get_counter(&mut *conn, kind)
        .await
        .map_err(NumberingError::StorageUnavailable)?;

    if let Some(StoredCounter::Corrupt {
        fiscal_year: year,
        counter,
    }) = &stored
    {
        warn!(
            series = %kind,
            stored_year = ?year,
            stored_counter = ?counter,
            "Stored document counter is corrupt, restarting at 1"
        );
    }

    let next = CounterState::advance(stored.as_ref().and_then(StoredCounter::state), &fiscal_year);

    counter::set_counter(&mut *conn, kind, &next)
        .await
        .map_err(NumberingError::StorageUnavailable)?;

    let number = next.document_number(kind);

    let saved = match new_document {
        Some(new_document) => {
            let (doc, items) = document::build_records(new_document, &number.to_string(), Utc::now());
            document::insert_records(&mut *conn, &doc, &items)
                .await
                .map_err(|err| {
                    if err.is_unavailable() {
                        NumberingError::StorageUnavailable(err)
                    } else {
                        NumberingError::SaveFailed(err)
                    }
                })?;
            Some((doc, items))
        }
        None => None,
    };

    Ok((number, saved))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use sanbill_core::line_item::LineDraft;
    use sanbill_core::validation::prepare_lines;
    use sanbill_core::DocumentDraft;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::time::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn memory_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// A throwaway database file, removed on drop.
    struct TempDb(PathBuf);

    impl TempDb {
        fn new() -> Self {
            TempDb(std::env::temp_dir().join(format!("sanbill-test-{}.db", uuid::Uuid::new_v4())))
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm"] {
                let mut path = self.0.clone().into_os_string();
                path.push(suffix);
                let _ = std::fs::remove_file(path);
            }
        }
    }

    fn draft(kind: DocumentKind) -> DocumentDraft {
        DocumentDraft {
            kind,
            date: None,
            job_no: None,
            bill_to: "Acme Traders".into(),
            consignee_preview: String::new(),
            shipment: Default::default(),
            consignment: Default::default(),
            c_date: String::new(),
            c_invoice_no: String::new(),
            lines: vec![LineDraft {
                description: "Freight".into(),
                rate: "1000".into(),
                qty: "2".into(),
                cgst_rate: "9".into(),
                sgst_rate: "9".into(),
                ..Default::default()
            }],
        }
    }

    fn new_document(kind: DocumentKind, on: NaiveDate) -> NewDocument {
        let draft = draft(kind);
        let lines = prepare_lines(&draft.lines).unwrap();
        NewDocument::from_draft(&draft, on, None, lines)
    }

    #[tokio::test]
    async fn test_sequential_numbers() {
        let db = memory_db().await;
        let numbering = db.numbering();
        let june = date(2024, 6, 1);

        assert_eq!(
            numbering.next_number(DocumentKind::Invoice, june).await.unwrap(),
            "SAN/INV/24-25/0001"
        );
        assert_eq!(
            numbering.next_number(DocumentKind::Invoice, june).await.unwrap(),
            "SAN/INV/24-25/0002"
        );
    }

    #[tokio::test]
    async fn test_fiscal_year_rollover() {
        let db = memory_db().await;
        let numbering = db.numbering();

        numbering.next_number(DocumentKind::Invoice, date(2024, 3, 30)).await.unwrap();
        assert_eq!(
            numbering.next_number(DocumentKind::Invoice, date(2024, 3, 31)).await.unwrap(),
            "SAN/INV/23-24/0002"
        );
        assert_eq!(
            numbering.next_number(DocumentKind::Invoice, date(2024, 4, 1)).await.unwrap(),
            "SAN/INV/24-25/0001"
        );
    }

    #[tokio::test]
    async fn test_series_are_independent() {
        let db = memory_db().await;
        let numbering = db.numbering();
        let june = date(2024, 6, 1);

        numbering.next_number(DocumentKind::Invoice, june).await.unwrap();
        numbering.next_number(DocumentKind::Invoice, june).await.unwrap();

        assert_eq!(
            numbering.next_number(DocumentKind::DebitNote, june).await.unwrap(),
            "SAN/DN/24-25/0001"
        );
        assert_eq!(
            numbering.next_number(DocumentKind::Invoice, june).await.unwrap(),
            "SAN/INV/24-25/0003"
        );
    }

    #[tokio::test]
    async fn test_corrupt_counter_restarts_at_one() {
        let db = memory_db().await;
        db.settings().set("inv_year", "24-25").await.unwrap();
        db.settings().set("inv_counter", "abc").await.unwrap();

        assert_eq!(
            db.numbering().next_number(DocumentKind::Invoice, date(2024, 6, 1)).await.unwrap(),
            "SAN/INV/24-25/0001"
        );
        assert_eq!(
            db.settings().get("inv_counter").await.unwrap().as_deref(),
            Some("1")
        );
    }

    #[tokio::test]
    async fn test_continues_from_existing_counter() {
        let db = memory_db().await;
        db.counters()
            .set_counter(DocumentKind::DebitNote, &CounterState::new("24-25", 9999))
            .await
            .unwrap();

        assert_eq!(
            db.numbering().next_number(DocumentKind::DebitNote, date(2024, 9, 1)).await.unwrap(),
            "SAN/DN/24-25/10000"
        );
    }

    #[tokio::test]
    async fn test_closed_store_is_unavailable() {
        let db = memory_db().await;
        db.close().await;

        let result = db.numbering().next_number(DocumentKind::Invoice, date(2024, 6, 1)).await;
        assert!(matches!(result, Err(NumberingError::StorageUnavailable(_))));
    }

    #[tokio::test]
    async fn test_counter_survives_restart() {
        let file = TempDb::new();
        let june = date(2024, 6, 1);

        {
            let db = Database::new(DbConfig::new(&file.0)).await.unwrap();
            db.numbering().next_number(DocumentKind::Invoice, june).await.unwrap();
            db.numbering().next_number(DocumentKind::Invoice, june).await.unwrap();
            db.close().await;
        }

        let db = Database::new(DbConfig::new(&file.0)).await.unwrap();
        assert_eq!(
            db.numbering().next_number(DocumentKind::Invoice, june).await.unwrap(),
            "SAN/INV/24-25/0003"
        );
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocation_has_no_duplicates_or_gaps() {
        let file = TempDb::new();
        let june = date(2024, 6, 1);

        // Two handles on one file stand in for two processes: they share
        // nothing but the database, so only BEGIN IMMEDIATE orders them.
        let first = Database::new(DbConfig::new(&file.0)).await.unwrap();
        let second = Database::new(DbConfig::new(&file.0)).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..24 {
            let db = if i % 2 == 0 { first.clone() } else { second.clone() };
            tasks.push(tokio::spawn(async move {
                db.numbering().allocate(DocumentKind::Invoice, june).await
            }));
        }

        let mut counters = Vec::new();
        for task in tasks {
            let number = task.await.unwrap().unwrap();
            assert_eq!(number.fiscal_year, "24-25");
            counters.push(number.counter);
        }

        let unique: HashSet<u64> = counters.iter().copied().collect();
        assert_eq!(unique.len(), 24);

        counters.sort_unstable();
        assert_eq!(counters, (1..=24).collect::<Vec<u64>>());

        first.close().await;
        second.close().await;
    }

    #[tokio::test]
    async fn test_issue_stores_document_under_new_number() {
        let db = memory_db().await;
        let june = date(2024, 6, 1);

        let (doc, items) = db
            .numbering()
            .issue_on(&new_document(DocumentKind::Invoice, june), june)
            .await
            .unwrap();

        assert_eq!(doc.document_number, "SAN/INV/24-25/0001");
        assert_eq!(items.len(), 1);
        assert_eq!(doc.total_amount.to_string(), "2360.00");

        let stored = db.documents().get_by_number("SAN/INV/24-25/0001").await.unwrap();
        assert_eq!(stored.map(|d| d.id), Some(doc.id));
    }

    #[tokio::test]
    async fn test_rejected_document_does_not_consume_number() {
        let db = memory_db().await;
        let june = date(2024, 6, 1);

        let mut orphan = new_document(DocumentKind::Invoice, june);
        orphan.job_id = Some("no-such-job".into());

        let result = db.numbering().issue_on(&orphan, june).await;
        assert!(matches!(result, Err(NumberingError::SaveFailed(_))));

        assert_eq!(
            db.numbering().next_number(DocumentKind::Invoice, june).await.unwrap(),
            "SAN/INV/24-25/0001"
        );
    }

    #[tokio::test]
    async fn test_backdated_document_takes_number_from_today() {
        let db = memory_db().await;
        let numbering = db.numbering();
        let june = date(2024, 6, 1);

        for expected in ["SAN/INV/24-25/0001", "SAN/INV/24-25/0002"] {
            let (doc, _) = numbering
                .issue_on(&new_document(DocumentKind::Invoice, june), june)
                .await
                .unwrap();
            assert_eq!(doc.document_number, expected);
        }

        // Dated in the previous fiscal year, issued in June
        let march = date(2024, 3, 15);
        let (late, _) = numbering
            .issue_on(&new_document(DocumentKind::Invoice, march), june)
            .await
            .unwrap();
        assert_eq!(late.document_number, "SAN/INV/24-25/0003");
        assert_eq!(late.date, march);

        for expected in ["SAN/INV/24-25/0004", "SAN/INV/24-25/0005"] {
            let (doc, _) = numbering
                .issue_on(&new_document(DocumentKind::Invoice, june), june)
                .await
                .unwrap();
            assert_eq!(doc.document_number, expected);
        }
    }

    #[tokio::test]
    async fn test_issue_numbers_in_the_current_fiscal_year() {
        let db = memory_db().await;
        let numbering = db.numbering();
        let label = FiscalYear::containing(Local::now().date_naive()).label();

        // A draft dated years back still joins today's series
        let old = date(2019, 1, 10);
        let (doc, _) = numbering
            .issue(&new_document(DocumentKind::DebitNote, old))
            .await
            .unwrap();
        assert_eq!(doc.document_number, format!("SAN/DN/{label}/0001"));
        assert_eq!(doc.date, old);

        assert_eq!(
            numbering.next_document_number(DocumentKind::DebitNote).await.unwrap(),
            format!("SAN/DN/{label}/0002")
        );
    }

    #[tokio::test]
    async fn test_cancelled_allocation_releases_the_transaction() {
        let db = memory_db().await;
        let numbering = db.numbering();
        let june = date(2024, 6, 1);

        let mut last = 0;
        for micros in [0u64, 0, 1, 5, 20, 100, 500] {
            let _ = tokio::time::timeout(
                Duration::from_micros(micros),
                numbering.allocate(DocumentKind::Invoice, june),
            )
            .await;

            let number = numbering
                .allocate(DocumentKind::Invoice, june)
                .await
                .unwrap_or_else(|err| panic!("allocation after a {micros}us timeout failed: {err}"));
            assert!(number.counter > last);
            last = number.counter;
        }

        let (doc, _) = numbering
            .issue_on(&new_document(DocumentKind::Invoice, june), june)
            .await
            .unwrap();
        assert_eq!(doc.document_number, format!("SAN/INV/24-25/{:04}", last + 1));
    }
}
