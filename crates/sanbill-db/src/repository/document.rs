//! # Document Repository
//!
//! Database operations for invoices and debit notes.
//!
//! ## Storage
//! ```text
//! documents                         document_items
//! ┌──────────────────────────┐      ┌──────────────────────────────┐
//! │ id (UUID)                │◄─────│ document_id   (CASCADE)      │
//! │ document_number (UNIQUE) │      │ sr_no         (1..n)         │
//! │ kind, date, job_id       │      │ rate, qty, taxable_override  │  inputs
//! │ shipment / consignment   │      │ amount, taxable, cgst, sgst, │  computed,
//! │ total_amount  (TEXT)     │      │ total                  (TEXT)│  unrounded
//! └──────────────────────────┘      └──────────────────────────────┘
//! ```
//!
//! A header and its items are always written in one transaction.

use chrono::{DateTime, Utc};
use sanbill_core::{
    ConsignmentDetails, Document, DocumentItem, DocumentKind, NewDocument, ShipmentDetails,
};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{decode_amount, decode_date, decode_decimal, decode_rate, decode_timestamp, encode_decimal};
use crate::error::{DbError, DbResult};

const SELECT_DOCUMENT: &str = r#"
    SELECT
        id, document_number, kind, date, job_id, job_no, bill_to, consignee_preview,
        shipper, consignee, pol, pod, vessel_flight, etd, eta, mbl_no, hbl_no,
        gross_weight, net_weight, volume_cbm, packages, be_no, be_date, igm_no, igm_date,
        item_no, exchange_rate, ref_no, c_date, c_invoice_no, total_amount, created_at
    FROM documents
"#;

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    document_number: String,
    kind: DocumentKind,
    date: String,
    job_id: Option<String>,
    job_no: Option<String>,
    bill_to: String,
    consignee_preview: String,
    shipper: String,
    consignee: String,
    pol: String,
    pod: String,
    vessel_flight: String,
    etd: String,
    eta: String,
    mbl_no: String,
    hbl_no: String,
    gross_weight: String,
    net_weight: String,
    volume_cbm: String,
    packages: String,
    be_no: String,
    be_date: String,
    igm_no: String,
    igm_date: String,
    item_no: String,
    exchange_rate: String,
    ref_no: String,
    c_date: String,
    c_invoice_no: String,
    total_amount: String,
    created_at: String,
}

impl TryFrom<DocumentRow> for Document {
    type Error = DbError;

    fn try_from(row: DocumentRow) -> DbResult<Self> {
        Ok(Document {
            date: decode_date("documents.date", &row.date)?,
            total_amount: decode_amount("documents.total_amount", &row.total_amount)?,
            created_at: decode_timestamp("documents.created_at", &row.created_at)?,
            id: row.id,
            document_number: row.document_number,
            kind: row.kind,
            job_id: row.job_id,
            job_no: row.job_no,
            bill_to: row.bill_to,
            consignee_preview: row.consignee_preview,
            shipment: ShipmentDetails {
                shipper: row.shipper,
                consignee: row.consignee,
                pol: row.pol,
                pod: row.pod,
                vessel_flight: row.vessel_flight,
                etd: row.etd,
                eta: row.eta,
                mbl_no: row.mbl_no,
                hbl_no: row.hbl_no,
            },
            consignment: ConsignmentDetails {
                gross_weight: row.gross_weight,
                net_weight: row.net_weight,
                volume_cbm: row.volume_cbm,
                packages: row.packages,
                be_no: row.be_no,
                be_date: row.be_date,
                igm_no: row.igm_no,
                igm_date: row.igm_date,
                item_no: row.item_no,
                exchange_rate: row.exchange_rate,
                ref_no: row.ref_no,
            },
            c_date: row.c_date,
            c_invoice_no: row.c_invoice_no,
        })
    }
}

#[derive(Debug, FromRow)]
struct DocumentItemRow {
    id: String,
    document_id: String,
    sr_no: i64,
    description: String,
    hsn_sac: String,
    currency: String,
    rate: String,
    qty: String,
    taxable_override: Option<String>,
    cgst_rate: String,
    sgst_rate: String,
    amount: String,
    taxable_amount: String,
    cgst_amount: String,
    sgst_amount: String,
    total: String,
}

impl TryFrom<DocumentItemRow> for DocumentItem {
    type Error = DbError;

    fn try_from(row: DocumentItemRow) -> DbResult<Self> {
        let taxable_override = row
            .taxable_override
            .as_deref()
            .map(|text| decode_amount("document_items.taxable_override", text))
            .transpose()?;

        Ok(DocumentItem {
            sr_no: u32::try_from(row.sr_no)
                .map_err(|_| DbError::invalid_data("document_items.sr_no", row.sr_no.to_string()))?,
            rate: decode_amount("document_items.rate", &row.rate)?,
            qty: decode_decimal("document_items.qty", &row.qty)?,
            taxable_override,
            cgst_rate: decode_rate("document_items.cgst_rate", &row.cgst_rate)?,
            sgst_rate: decode_rate("document_items.sgst_rate", &row.sgst_rate)?,
            amount: decode_amount("document_items.amount", &row.amount)?,
            taxable_amount: decode_amount("document_items.taxable_amount", &row.taxable_amount)?,
            cgst_amount: decode_amount("document_items.cgst_amount", &row.cgst_amount)?,
            sgst_amount: decode_amount("document_items.sgst_amount", &row.sgst_amount)?,
            total: decode_amount("document_items.total", &row.total)?,
            id: row.id,
            document_id: row.document_id,
            description: row.description,
            hsn_sac: row.hsn_sac,
            currency: row.currency,
        })
    }
}

// =============================================================================
// Record Construction
// =============================================================================

/// Turns a validated document into the header and item records stored
/// under `document_number`.
///
/// `total_amount` is the sum of the unrounded row totals.
pub fn build_records(
    new_document: &NewDocument,
    document_number: &str,
    now: DateTime<Utc>,
) -> (Document, Vec<DocumentItem>) {
    let document_id = Uuid::new_v4().to_string();

    let items: Vec<DocumentItem> = new_document
        .lines
        .iter()
        .map(|line| DocumentItem {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.clone(),
            sr_no: line.sr_no,
            description: line.description.clone(),
            hsn_sac: line.hsn_sac.clone(),
            currency: line.currency.clone(),
            rate: line.input.rate,
            qty: line.input.qty,
            taxable_override: line.input.taxable_override,
            cgst_rate: line.input.cgst_rate,
            sgst_rate: line.input.sgst_rate,
            amount: line.amounts.amount,
            taxable_amount: line.amounts.taxable_amount,
            cgst_amount: line.amounts.cgst_amount,
            sgst_amount: line.amounts.sgst_amount,
            total: line.amounts.total,
        })
        .collect();

    let document = Document {
        id: document_id,
        document_number: document_number.to_string(),
        kind: new_document.kind,
        date: new_document.date,
        job_id: new_document.job_id.clone(),
        job_no: new_document.job_no.clone(),
        bill_to: new_document.bill_to.clone(),
        consignee_preview: new_document.consignee_preview.clone(),
        shipment: new_document.shipment.clone(),
        consignment: new_document.consignment.clone(),
        c_date: new_document.c_date.clone(),
        c_invoice_no: new_document.c_invoice_no.clone(),
        total_amount: new_document.totals().grand_total,
        created_at: now,
    };

    (document, items)
}

/// Inserts a header and its items on an existing connection.
///
/// The caller owns the transaction.
pub(crate) async fn insert_records(
    conn: &mut SqliteConnection,
    document: &Document,
    items: &[DocumentItem],
) -> DbResult<()> {
    debug!(
        number = %document.document_number,
        items = items.len(),
        "Inserting document"
    );

    let s = &document.shipment;
    let c = &document.consignment;

    sqlx::query(
        r#"
        INSERT INTO documents (
            id, document_number, kind, date, job_id, job_no, bill_to, consignee_preview,
            shipper, consignee, pol, pod, vessel_flight, etd, eta, mbl_no, hbl_no,
            gross_weight, net_weight, volume_cbm, packages, be_no, be_date, igm_no, igm_date,
            item_no, exchange_rate, ref_no, c_date, c_invoice_no, total_amount, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
            ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
            ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25,
            ?26, ?27, ?28, ?29, ?30, ?31, ?32
        )
        "#,
    )
    .bind(&document.id)
    .bind(&document.document_number)
    .bind(document.kind)
    .bind(document.date.to_string())
    .bind(&document.job_id)
    .bind(&document.job_no)
    .bind(&document.bill_to)
    .bind(&document.consignee_preview)
    .bind(&s.shipper)
    .bind(&s.consignee)
    .bind(&s.pol)
    .bind(&s.pod)
    .bind(&s.vessel_flight)
    .bind(&s.etd)
    .bind(&s.eta)
    .bind(&s.mbl_no)
    .bind(&s.hbl_no)
    .bind(&c.gross_weight)
    .bind(&c.net_weight)
    .bind(&c.volume_cbm)
    .bind(&c.packages)
    .bind(&c.be_no)
    .bind(&c.be_date)
    .bind(&c.igm_no)
    .bind(&c.igm_date)
    .bind(&c.item_no)
    .bind(&c.exchange_rate)
    .bind(&c.ref_no)
    .bind(&document.c_date)
    .bind(&document.c_invoice_no)
    .bind(encode_decimal(document.total_amount.value()))
    .bind(document.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => {
            DbError::duplicate("document_number", &document.document_number)
        }
        other => other,
    })?;

    for item in items {
        sqlx::query(
            r#"
            INSERT INTO document_items (
                id, document_id, sr_no, description, hsn_sac, currency,
                rate, qty, taxable_override, cgst_rate, sgst_rate,
                amount, taxable_amount, cgst_amount, sgst_amount, total
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16
            )
            "#,
        )
        .bind(&item.id)
        .bind(&item.document_id)
        .bind(i64::from(item.sr_no))
        .bind(&item.description)
        .bind(&item.hsn_sac)
        .bind(&item.currency)
        .bind(encode_decimal(item.rate.value()))
        .bind(encode_decimal(item.qty))
        .bind(item.taxable_override.map(|t| encode_decimal(t.value())))
        .bind(encode_decimal(item.cgst_rate.percent()))
        .bind(encode_decimal(item.sgst_rate.percent()))
        .bind(encode_decimal(item.amount.value()))
        .bind(encode_decimal(item.taxable_amount.value()))
        .bind(encode_decimal(item.cgst_amount.value()))
        .bind(encode_decimal(item.sgst_amount.value()))
        .bind(encode_decimal(item.total.value()))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for document database operations.
///
/// New documents are normally stored through
/// [`DocumentNumberAllocator::issue`](crate::numbering::DocumentNumberAllocator::issue),
/// which numbers and inserts them in one transaction.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// Inserts an already numbered document and its items.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the number is already used
    pub async fn insert(&self, document: &Document, items: &[DocumentItem]) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        insert_records(&mut tx, document, items).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    /// Gets a document by its UUID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Document>> {
        let sql = format!("{SELECT_DOCUMENT} WHERE id = ?1");
        let row: Option<DocumentRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Document::try_from).transpose()
    }

    /// Gets a document by its number, e.g. `SAN/INV/24-25/0001`.
    pub async fn get_by_number(&self, document_number: &str) -> DbResult<Option<Document>> {
        debug!(number = %document_number, "Looking up document");

        let sql = format!("{SELECT_DOCUMENT} WHERE document_number = ?1");
        let row: Option<DocumentRow> = sqlx::query_as(&sql)
            .bind(document_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Document::try_from).transpose()
    }

    /// Lists documents, newest first, optionally of one kind.
    pub async fn list(&self, kind: Option<DocumentKind>, limit: u32) -> DbResult<Vec<Document>> {
        debug!(kind = ?kind, limit, "Listing documents");

        let sql = format!(
            "{SELECT_DOCUMENT} WHERE (?1 IS NULL OR kind = ?1) \
             ORDER BY date DESC, created_at DESC LIMIT ?2"
        );
        let rows: Vec<DocumentRow> = sqlx::query_as(&sql)
            .bind(kind)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Document::try_from).collect()
    }

    /// Items of a document, in row order.
    pub async fn items(&self, document_id: &str) -> DbResult<Vec<DocumentItem>> {
        let rows: Vec<DocumentItemRow> = sqlx::query_as(
            r#"
            SELECT
                id, document_id, sr_no, description, hsn_sac, currency,
                rate, qty, taxable_override, cgst_rate, sgst_rate,
                amount, taxable_amount, cgst_amount, sgst_amount, total
            FROM document_items
            WHERE document_id = ?1
            ORDER BY sr_no
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DocumentItem::try_from).collect()
    }

    /// Deletes a document by number, together with its items.
    ///
    /// The series counter is left alone, so the number is never issued again.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no document has this number
    pub async fn delete(&self, document_number: &str) -> DbResult<Document> {
        let document = self
            .get_by_number(document_number)
            .await?
            .ok_or_else(|| DbError::not_found("Document", document_number.trim()))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let items = sqlx::query("DELETE FROM document_items WHERE document_id = ?1")
            .bind(&document.id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(&document.id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Document", &document.document_number));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            number = %document.document_number,
            items = items.rows_affected(),
            "Document deleted"
        );
        Ok(document)
    }

    /// Number of stored documents of a kind.
    pub async fn count(&self, kind: DocumentKind) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE kind = ?1")
            .bind(kind)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
