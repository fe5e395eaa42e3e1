//! # Domain Types
//!
//! Core domain types used throughout Sanbill.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Consignee     │   │      Job        │   │    Document     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  customer_id    │◄──│  job_id         │       │
//! │  │  name           │   │  job_no (biz)   │   │  document_number│       │
//! │  │  gstin / pan    │   │  status         │   │  kind           │       │
//! │  │  addresses[]    │   │  shipment       │   │  items[]        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Charge       │   │  DocumentKind   │   │   JobStatus     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  charge_name    │   │  Invoice        │   │  Open           │       │
//! │  │  hsn_sac        │   │  DebitNote      │   │  Closed         │       │
//! │  │  cgst / sgst    │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: `job_no`, `document_number`

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::amount::{Amount, GstRate};
use crate::error::CoreError;
use crate::line_item::{DocumentTotals, LineDraft, LineItemAmounts, LineItemInput};
use crate::validation::PreparedLine;

// =============================================================================
// Document Kind (numbering series)
// =============================================================================

/// The kind of document, which is also its numbering series.
///
/// Each kind owns an independent counter and prefix:
///
/// | Kind      | Prefix    | Settings keys               |
/// |-----------|-----------|-----------------------------|
/// | Invoice   | `SAN/INV` | `inv_year`, `inv_counter`   |
/// | DebitNote | `SAN/DN`  | `dn_year`, `dn_counter`     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// GST tax invoice.
    Invoice,
    /// Debit note.
    DebitNote,
}

impl DocumentKind {
    /// Every series, in a stable order.
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Invoice, DocumentKind::DebitNote];

    /// Document number prefix.
    pub const fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "SAN/INV",
            DocumentKind::DebitNote => "SAN/DN",
        }
    }

    /// Settings key holding the fiscal-year label of the live counter.
    pub const fn year_key(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "inv_year",
            DocumentKind::DebitNote => "dn_year",
        }
    }

    /// Settings key holding the last issued counter.
    pub const fn counter_key(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "inv_counter",
            DocumentKind::DebitNote => "dn_counter",
        }
    }

    /// Heading printed on the document.
    pub const fn title(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "TAX INVOICE",
            DocumentKind::DebitNote => "DEBIT NOTE",
        }
    }

    /// Lowercase name used on the command line and in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::DebitNote => "debit_note",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice" | "inv" => Ok(DocumentKind::Invoice),
            "debit_note" | "debit-note" | "debitnote" | "dn" => Ok(DocumentKind::DebitNote),
            other => Err(CoreError::UnknownSeries(other.to_string())),
        }
    }
}

// =============================================================================
// Job Status
// =============================================================================

/// Whether a job can still be billed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is active and offered on new documents.
    #[default]
    Open,
    /// Job is finished.
    Closed,
}

// =============================================================================
// Consignee
// =============================================================================

/// A customer or consignee. The two share one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Consignee {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Legal name printed in the bill-to block.
    pub name: String,

    /// 15-character GST identification number.
    pub gstin: Option<String>,

    /// 10-character permanent account number.
    pub pan: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A postal address belonging to a consignee.
///
/// At most one address per consignee has `is_default` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConsigneeAddress {
    pub id: String,
    pub consignee_id: String,
    /// Short name such as "Head Office".
    pub label: String,
    pub address: String,
    pub state: String,
    pub state_code: String,
    pub pincode: String,
    pub country: String,
    pub is_default: bool,
}

impl ConsigneeAddress {
    /// Multi-line text used in the bill-to and consignee preview blocks.
    pub fn formatted(&self) -> String {
        let mut parts: Vec<String> = vec![self.address.trim().to_string()];

        let mut region = self.state.trim().to_string();
        if !self.state_code.trim().is_empty() {
            region = format!("{} ({})", region, self.state_code.trim());
        }
        if !self.pincode.trim().is_empty() {
            region = format!("{} - {}", region, self.pincode.trim());
        }
        parts.push(region);
        parts.push(self.country.trim().to_string());

        parts
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Shipment & Consignment Details
// =============================================================================

/// Shipment fields of a job, copied onto documents.
///
/// Kept as free text: ports, vessel names and dates arrive in whatever
/// format the operator uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct ShipmentDetails {
    pub shipper: String,
    pub consignee: String,
    /// Port of loading.
    pub pol: String,
    /// Port of discharge.
    pub pod: String,
    pub vessel_flight: String,
    pub etd: String,
    pub eta: String,
    /// Master bill of lading.
    pub mbl_no: String,
    /// House bill of lading.
    pub hbl_no: String,
}

/// Consignment and customs fields of a job, copied onto documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct ConsignmentDetails {
    pub gross_weight: String,
    pub net_weight: String,
    pub volume_cbm: String,
    pub packages: String,
    /// Bill of entry.
    pub be_no: String,
    pub be_date: String,
    /// Import general manifest.
    pub igm_no: String,
    pub igm_date: String,
    pub item_no: String,
    pub exchange_rate: String,
    pub ref_no: String,
}

/// Copies `source` into `target` when `target` is blank.
fn fill_blank(target: &mut String, source: &str) {
    if target.trim().is_empty() {
        *target = source.trim().to_string();
    }
}

impl ShipmentDetails {
    /// Fills every blank field from `source`; typed values win.
    pub fn fill_blanks_from(&mut self, source: &ShipmentDetails) {
        fill_blank(&mut self.shipper, &source.shipper);
        fill_blank(&mut self.consignee, &source.consignee);
        fill_blank(&mut self.pol, &source.pol);
        fill_blank(&mut self.pod, &source.pod);
        fill_blank(&mut self.vessel_flight, &source.vessel_flight);
        fill_blank(&mut self.etd, &source.etd);
        fill_blank(&mut self.eta, &source.eta);
        fill_blank(&mut self.mbl_no, &source.mbl_no);
        fill_blank(&mut self.hbl_no, &source.hbl_no);
    }
}

impl ConsignmentDetails {
    /// Fills every blank field from `source`; typed values win.
    pub fn fill_blanks_from(&mut self, source: &ConsignmentDetails) {
        fill_blank(&mut self.gross_weight, &source.gross_weight);
        fill_blank(&mut self.net_weight, &source.net_weight);
        fill_blank(&mut self.volume_cbm, &source.volume_cbm);
        fill_blank(&mut self.packages, &source.packages);
        fill_blank(&mut self.be_no, &source.be_no);
        fill_blank(&mut self.be_date, &source.be_date);
        fill_blank(&mut self.igm_no, &source.igm_no);
        fill_blank(&mut self.igm_date, &source.igm_date);
        fill_blank(&mut self.item_no, &source.item_no);
        fill_blank(&mut self.exchange_rate, &source.exchange_rate);
        fill_blank(&mut self.ref_no, &source.ref_no);
    }
}

// =============================================================================
// Job
// =============================================================================

/// A shipment file. Its metadata pre-fills invoices and debit notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Job {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business identifier, unique across jobs.
    pub job_no: String,

    /// Customer the job is billed to.
    pub customer_id: Option<String>,

    #[serde(flatten)]
    pub shipment: ShipmentDetails,

    #[serde(flatten)]
    pub consignment: ConsignmentDetails,

    pub status: JobStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Checks whether the job can still be billed.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == JobStatus::Open
    }
}

// =============================================================================
// Charge (charge master)
// =============================================================================

/// A billable charge with default HSN/SAC code and GST rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Charge {
    pub id: String,
    pub charge_name: String,
    pub hsn_sac: String,
    pub currency: String,
    pub cgst_rate: GstRate,
    pub sgst_rate: GstRate,
}

impl Charge {
    /// Pre-fills a grid row with this charge.
    ///
    /// Description, HSN/SAC, currency and both GST rates are replaced;
    /// rate, quantity and any override are left as typed.
    pub fn apply_to(&self, row: &mut LineDraft) {
        row.description = self.charge_name.clone();
        row.hsn_sac = self.hsn_sac.clone();
        row.currency = self.currency.clone();
        row.cgst_rate = self.cgst_rate.percent().normalize().to_string();
        row.sgst_rate = self.sgst_rate.percent().normalize().to_string();
    }
}

// =============================================================================
// Document
// =============================================================================

/// A saved invoice or debit note header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Document {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Allocated number, e.g. `SAN/INV/24-25/0001`. Never re-derived.
    pub document_number: String,

    pub kind: DocumentKind,

    #[ts(as = "String")]
    pub date: NaiveDate,

    pub job_id: Option<String>,
    pub job_no: Option<String>,

    /// Bill-to block (customer name and address).
    pub bill_to: String,

    /// Consignee block as printed.
    pub consignee_preview: String,

    #[serde(flatten)]
    pub shipment: ShipmentDetails,

    #[serde(flatten)]
    pub consignment: ConsignmentDetails,

    /// Customer's own invoice date.
    pub c_date: String,

    /// Customer's own invoice number.
    pub c_invoice_no: String,

    /// Sum of unrounded row totals.
    pub total_amount: Amount,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A stored line of a document.
///
/// Both the parsed inputs and the computed values are kept. The computed
/// values are what was printed; [`DocumentItem::recompute`] can check them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentItem {
    pub id: String,
    pub document_id: String,
    /// 1-based position on the document.
    pub sr_no: u32,
    pub description: String,
    pub hsn_sac: String,
    pub currency: String,
    pub rate: Amount,
    #[ts(type = "string")]
    pub qty: Decimal,
    pub taxable_override: Option<Amount>,
    pub cgst_rate: GstRate,
    pub sgst_rate: GstRate,
    pub amount: Amount,
    pub taxable_amount: Amount,
    pub cgst_amount: Amount,
    pub sgst_amount: Amount,
    pub total: Amount,
}

impl DocumentItem {
    /// Calculator input this row was computed from.
    pub fn input(&self) -> LineItemInput {
        LineItemInput {
            rate: self.rate,
            qty: self.qty,
            taxable_override: self.taxable_override,
            cgst_rate: self.cgst_rate,
            sgst_rate: self.sgst_rate,
        }
    }

    /// Stored computed values.
    pub fn amounts(&self) -> LineItemAmounts {
        LineItemAmounts {
            amount: self.amount,
            taxable_amount: self.taxable_amount,
            cgst_amount: self.cgst_amount,
            sgst_amount: self.sgst_amount,
            total: self.total,
        }
    }

    /// Runs the calculator again on the stored inputs.
    pub fn recompute(&self) -> LineItemAmounts {
        self.input().compute()
    }
}

/// An unsaved document as handed over by the host.
///
/// The number is not part of the draft: it is allocated at save time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentDraft {
    pub kind: DocumentKind,

    /// Document date; the host uses today when absent.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,

    /// Job to bill; its shipment fields fill any left blank here.
    #[serde(default)]
    pub job_no: Option<String>,

    #[serde(default)]
    pub bill_to: String,

    #[serde(default)]
    pub consignee_preview: String,

    #[serde(flatten)]
    pub shipment: ShipmentDetails,

    #[serde(flatten)]
    pub consignment: ConsignmentDetails,

    #[serde(default)]
    pub c_date: String,

    #[serde(default)]
    pub c_invoice_no: String,

    #[serde(default)]
    pub lines: Vec<LineDraft>,
}

/// A validated document ready to be numbered and stored.
///
/// ```text
/// DocumentDraft ──► prepare_lines() ──► NewDocument::from_draft(.., job)
///                                            │
///                     allocator: number ◄────┘──► Document + DocumentItems
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub date: NaiveDate,
    pub job_id: Option<String>,
    pub job_no: Option<String>,
    pub bill_to: String,
    pub consignee_preview: String,
    pub shipment: ShipmentDetails,
    pub consignment: ConsignmentDetails,
    pub c_date: String,
    pub c_invoice_no: String,
    pub lines: Vec<PreparedLine>,
}

impl NewDocument {
    /// Combines a draft header, its job and its validated lines.
    ///
    /// Shipment and consignment fields typed on the draft are kept; the
    /// blank ones are copied from the job.
    pub fn from_draft(
        draft: &DocumentDraft,
        date: NaiveDate,
        job: Option<&Job>,
        lines: Vec<PreparedLine>,
    ) -> Self {
        let mut shipment = draft.shipment.clone();
        let mut consignment = draft.consignment.clone();
        if let Some(job) = job {
            shipment.fill_blanks_from(&job.shipment);
            consignment.fill_blanks_from(&job.consignment);
        }

        NewDocument {
            kind: draft.kind,
            date,
            job_id: job.map(|j| j.id.clone()),
            job_no: job
                .map(|j| j.job_no.clone())
                .or_else(|| draft.job_no.clone()),
            bill_to: draft.bill_to.trim().to_string(),
            consignee_preview: draft.consignee_preview.trim().to_string(),
            shipment,
            consignment,
            c_date: draft.c_date.trim().to_string(),
            c_invoice_no: draft.c_invoice_no.trim().to_string(),
            lines,
        }
    }

    /// Totals over the validated lines.
    pub fn totals(&self) -> DocumentTotals {
        DocumentTotals::from_lines(self.lines.iter().map(|line| &line.amounts))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
