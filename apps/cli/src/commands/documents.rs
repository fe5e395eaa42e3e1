//! # Document Commands
//!
//! `save`, `list`, `show` and `delete`.
//!
//! ## Save Flow
//! ```text
//! draft.json ──► DocumentDraft (serde)
//!                    │
//!                    ▼
//!             prepare_lines()          drop blank rows and validate
//!                    │                 (every row problem reported at once)
//!                    ▼
//!             job lookup               unknown ► JobNotFound
//!                    │                 closed  ► JobClosed
//!                    ▼
//!             NewDocument::from_draft  blank shipment fields from the job
//!                    │
//!                    ▼
//!             numbering().issue_on()   number + rows in one transaction,
//!                                      fiscal year of today, not of the
//!                                      document date
//! ```

use chrono::{Local, NaiveDate};
use comfy_table::Cell;
use sanbill_core::validation::prepare_lines;
use sanbill_core::{
    CoreError, Document, DocumentDraft, DocumentItem, DocumentKind, DocumentTotals, Job,
    LineItemAmounts, NewDocument,
};
use sanbill_db::DbError;
use std::path::Path;
use tracing::{info, warn};

use super::{first_line, render, right, table, Context};
use crate::error::{CliError, CliResult};

const DATE_FORMAT: &str = "%d-%m-%Y";

// =============================================================================
// save
// =============================================================================

/// Reads a draft file and saves it.
pub async fn save_file(ctx: &Context, path: &Path) -> CliResult<String> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let draft: DocumentDraft = serde_json::from_str(&text).map_err(|source| CliError::Draft {
        path: path.to_path_buf(),
        source,
    })?;

    let (document, items) = save_draft(ctx, &draft).await?;
    Ok(format!(
        "Saved {}: {} item(s), total {} {}\n",
        document.document_number,
        items.len(),
        ctx.config.currency,
        document.total_amount
    ))
}

/// The open job a draft refers to, if it names one.
async fn billable_job(ctx: &Context, job_no: Option<&str>) -> CliResult<Option<Job>> {
    let Some(job_no) = job_no.map(str::trim).filter(|j| !j.is_empty()) else {
        return Ok(None);
    };

    let job = ctx
        .db
        .jobs()
        .get_by_job_no(job_no)
        .await?
        .ok_or_else(|| CoreError::JobNotFound(job_no.to_string()))?;

    if !job.is_open() {
        return Err(CoreError::JobClosed {
            job_no: job.job_no,
        }
        .into());
    }
    Ok(Some(job))
}

/// Customer name and default address of a job, as a bill-to block.
async fn bill_to_from_customer(ctx: &Context, job: &Job) -> CliResult<Option<String>> {
    let Some(customer_id) = job.customer_id.as_deref() else {
        return Ok(None);
    };
    let Some(customer) = ctx.db.consignees().get(customer_id).await? else {
        return Ok(None);
    };

    let mut block = customer.name.clone();
    if let Some(address) = ctx.db.consignees().default_address(customer_id).await? {
        block.push('\n');
        block.push_str(&address.formatted());
    }
    if let Some(gstin) = customer.gstin.as_deref() {
        block.push_str(&format!("\nGSTIN: {gstin}"));
    }
    Ok(Some(block))
}

/// Validates, numbers and stores a draft.
///
/// The draft's date is printed on the document. The number comes from the
/// fiscal year of today, so a backdated draft never reopens a closed year.
pub async fn save_draft(
    ctx: &Context,
    draft: &DocumentDraft,
) -> CliResult<(Document, Vec<DocumentItem>)> {
    save_draft_on(ctx, draft, Local::now().date_naive()).await
}

/// [`save_draft`] with the allocation date given.
pub(crate) async fn save_draft_on(
    ctx: &Context,
    draft: &DocumentDraft,
    today: NaiveDate,
) -> CliResult<(Document, Vec<DocumentItem>)> {
    let lines = prepare_lines(&draft.lines)?;
    let job = billable_job(ctx, draft.job_no.as_deref()).await?;
    let date = draft.date.unwrap_or(today);

    let mut new_document = NewDocument::from_draft(draft, date, job.as_ref(), lines);
    if new_document.bill_to.is_empty() {
        if let Some(job) = job.as_ref() {
            if let Some(block) = bill_to_from_customer(ctx, job).await? {
                new_document.bill_to = block;
            }
        }
    }

    let (document, items) = ctx.db.numbering().issue_on(&new_document, today).await?;
    info!(
        number = %document.document_number,
        %date,
        items = items.len(),
        total = %document.total_amount,
        "Document saved"
    );
    Ok((document, items))
}

// =============================================================================
// list
// =============================================================================

pub async fn list(ctx: &Context, kind: Option<DocumentKind>) -> CliResult<String> {
    let documents = ctx.db.documents().list(kind, ctx.config.list_limit).await?;
    if documents.is_empty() {
        return Ok("No documents.\n".to_string());
    }

    let mut grid = table(&["NUMBER", "DATE", "TYPE", "BILL TO", "TOTAL"]);
    for doc in &documents {
        grid.add_row(vec![
            Cell::new(&doc.document_number),
            Cell::new(doc.date.format(DATE_FORMAT)),
            Cell::new(doc.kind.title()),
            Cell::new(first_line(&doc.bill_to)),
            right(doc.total_amount),
        ]);
    }
    Ok(render(&grid))
}

// =============================================================================
// show
// =============================================================================

fn push_field(out: &mut String, label: &str, value: &str) {
    if !value.trim().is_empty() {
        out.push_str(&format!("{label:<15}{}\n", value.trim()));
    }
}

fn push_block(out: &mut String, label: &str, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    out.push_str(label);
    out.push('\n');
    for line in text.lines() {
        out.push_str("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
}

/// Renders a stored document and its items.
pub fn render_document(doc: &Document, items: &[DocumentItem], currency: &str) -> String {
    let mut out = format!("{}  {}\n", doc.kind.title(), doc.document_number);
    out.push_str(&format!("{:<15}{}\n", "Date", doc.date.format(DATE_FORMAT)));
    push_field(&mut out, "Job", doc.job_no.as_deref().unwrap_or(""));
    push_block(&mut out, "Bill to:", &doc.bill_to);
    push_block(&mut out, "Consignee:", &doc.consignee_preview);

    let s = &doc.shipment;
    push_field(&mut out, "Shipper", &s.shipper);
    push_field(&mut out, "Consignee", &s.consignee);
    push_field(&mut out, "POL", &s.pol);
    push_field(&mut out, "POD", &s.pod);
    push_field(&mut out, "Vessel/Flight", &s.vessel_flight);
    push_field(&mut out, "ETD", &s.etd);
    push_field(&mut out, "ETA", &s.eta);
    push_field(&mut out, "MBL No", &s.mbl_no);
    push_field(&mut out, "HBL No", &s.hbl_no);

    let c = &doc.consignment;
    push_field(&mut out, "Gross Wt", &c.gross_weight);
    push_field(&mut out, "Net Wt", &c.net_weight);
    push_field(&mut out, "Volume (CBM)", &c.volume_cbm);
    push_field(&mut out, "Packages", &c.packages);
    push_field(&mut out, "BE No", &c.be_no);
    push_field(&mut out, "BE Date", &c.be_date);
    push_field(&mut out, "IGM No", &c.igm_no);
    push_field(&mut out, "IGM Date", &c.igm_date);
    push_field(&mut out, "Item No", &c.item_no);
    push_field(&mut out, "Exch. Rate", &c.exchange_rate);
    push_field(&mut out, "Ref No", &c.ref_no);
    push_field(&mut out, "C. Date", &doc.c_date);
    push_field(&mut out, "C. Invoice No", &doc.c_invoice_no);

    let mut grid = table(&[
        "SR", "DESCRIPTION", "HSN/SAC", "CUR", "RATE", "QTY", "TAXABLE", "CGST", "SGST", "TOTAL",
    ]);
    for item in items {
        grid.add_row(vec![
            right(item.sr_no),
            Cell::new(&item.description),
            Cell::new(&item.hsn_sac),
            Cell::new(&item.currency),
            right(item.rate),
            right(item.qty.normalize()),
            right(item.taxable_amount),
            right(item.cgst_amount),
            right(item.sgst_amount),
            right(item.total),
        ]);
    }
    out.push('\n');
    out.push_str(&render(&grid));

    let amounts: Vec<LineItemAmounts> = items.iter().map(DocumentItem::amounts).collect();
    let totals = DocumentTotals::from_lines(&amounts);

    out.push('\n');
    out.push_str(&format!("{:<15}{:>14}\n", "Taxable", totals.taxable_total.to_string()));
    out.push_str(&format!("{:<15}{:>14}\n", "CGST", totals.cgst_total.to_string()));
    out.push_str(&format!("{:<15}{:>14}\n", "SGST", totals.sgst_total.to_string()));
    out.push_str(&format!(
        "{:<15}{:>14}\n",
        format!("Total ({currency})"),
        doc.total_amount.to_string()
    ));
    out
}

pub async fn show(ctx: &Context, document_number: &str) -> CliResult<String> {
    let doc = ctx
        .db
        .documents()
        .get_by_number(document_number)
        .await?
        .ok_or_else(|| CoreError::DocumentNotFound(document_number.trim().to_string()))?;
    let items = ctx.db.documents().items(&doc.id).await?;

    let item_total: sanbill_core::Amount = items.iter().map(|item| item.total).sum();
    if item_total != doc.total_amount {
        warn!(
            number = %doc.document_number,
            stored = %doc.total_amount,
            items = %item_total,
            "Stored total differs from the sum of its items"
        );
    }

    Ok(render_document(&doc, &items, &ctx.config.currency))
}

// =============================================================================
// delete
// =============================================================================

/// Deletes a saved document. Its number is not issued again.
pub async fn delete(ctx: &Context, document_number: &str) -> CliResult<String> {
    let document = ctx
        .db
        .documents()
        .delete(document_number)
        .await
        .map_err(|err| match err {
            DbError::NotFound { .. } => {
                CliError::from(CoreError::DocumentNotFound(document_number.trim().to_string()))
            }
            other => other.into(),
        })?;

    warn!(number = %document.document_number, "Document deleted; its number stays used");
    Ok(format!("Deleted {}\n", document.document_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use chrono::NaiveDate;
    use sanbill_core::line_item::LineDraft;
    use sanbill_core::{ShipmentDetails, ValidationError};
    use crate::commands::test_support::row_with;
    use sanbill_core::FiscalYear;
    use sanbill_db::{AddressInput, NewJob};

    fn june_2024() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn row(description: &str, rate: &str, qty: &str, cgst: &str, sgst: &str) -> LineDraft {
        LineDraft {
            description: description.into(),
            rate: rate.into(),
            qty: qty.into(),
            cgst_rate: cgst.into(),
            sgst_rate: sgst.into(),
            ..Default::default()
        }
    }

    fn draft(kind: DocumentKind, lines: Vec<LineDraft>) -> DocumentDraft {
        DocumentDraft {
            kind,
            date: NaiveDate::from_ymd_opt(2024, 6, 1),
            job_no: None,
            bill_to: "Acme Traders\nMumbai".into(),
            consignee_preview: String::new(),
            shipment: ShipmentDetails::default(),
            consignment: Default::default(),
            c_date: String::new(),
            c_invoice_no: String::new(),
            lines,
        }
    }

    async fn add_job(ctx: &Context, job_no: &str, customer_id: Option<String>) {
        ctx.db
            .jobs()
            .insert(&NewJob {
                job_no: job_no.into(),
                customer_id,
                shipment: ShipmentDetails {
                    pol: "INNSA".into(),
                    pod: "AEJEA".into(),
                    vessel_flight: "MSC ARINA V.001".into(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_save_numbers_and_stores() {
        let ctx = context().await;
        let d = draft(
            DocumentKind::Invoice,
            vec![
                row("Ocean Freight", "1000", "2", "9", "9"),
                row("", "999", "1", "9", "9"),
                row("Documentation", "500", "1", "9", "9"),
            ],
        );

        let (doc, items) = save_draft_on(&ctx, &d, june_2024()).await.unwrap();
        assert_eq!(doc.document_number, "SAN/INV/24-25/0001");
        assert_eq!(items.len(), 2);
        assert_eq!(doc.total_amount.to_string(), "2950.00");

        let (second, _) = save_draft_on(&ctx, &d, june_2024()).await.unwrap();
        assert_eq!(second.document_number, "SAN/INV/24-25/0002");
    }

    #[tokio::test]
    async fn test_invalid_rows_reported_together_and_no_number_used() {
        let ctx = context().await;
        let d = draft(
            DocumentKind::Invoice,
            vec![
                row("Freight", "0", "1", "9", "9"),
                row("Handling", "100", "1", "", ""),
            ],
        );

        let err = save_draft_on(&ctx, &d, june_2024()).await.unwrap_err();
        match err {
            CliError::Core(CoreError::Validation(ValidationError::LineItems(issues))) => {
                assert_eq!(issues.len(), 2);
                assert_eq!(issues[0].row, 1);
                assert_eq!(issues[1].row, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        let ok = draft(DocumentKind::Invoice, vec![row("Freight", "100", "1", "9", "9")]);
        let (doc, _) = save_draft_on(&ctx, &ok, june_2024()).await.unwrap();
        assert_eq!(doc.document_number, "SAN/INV/24-25/0001");
    }

    #[tokio::test]
    async fn test_empty_document_rejected() {
        let ctx = context().await;
        let d = draft(DocumentKind::DebitNote, vec![row("", "1", "1", "9", "9")]);
        let err = save_draft_on(&ctx, &d, june_2024()).await.unwrap_err();
        assert!(matches!(
            err,
            CliError::Core(CoreError::Validation(ValidationError::NoLineItems))
        ));
    }

    #[tokio::test]
    async fn test_closed_and_unknown_jobs_rejected() {
        let ctx = context().await;
        add_job(&ctx, "SE/1001", None).await;
        ctx.db.jobs().close("SE/1001").await.unwrap();

        let mut d = draft(DocumentKind::Invoice, vec![row("Freight", "100", "1", "9", "9")]);
        d.job_no = Some("SE/1001".into());
        let err = save_draft_on(&ctx, &d, june_2024()).await.unwrap_err();
        assert!(matches!(err, CliError::Core(CoreError::JobClosed { .. })));

        d.job_no = Some("SE/404".into());
        let err = save_draft_on(&ctx, &d, june_2024()).await.unwrap_err();
        assert!(matches!(err, CliError::Core(CoreError::JobNotFound(_))));

        assert_eq!(list(&ctx, None).await.unwrap(), "No documents.\n");
    }

    #[tokio::test]
    async fn test_job_fills_shipment_and_bill_to() {
        let ctx = context().await;
        let acme = ctx
            .db
            .consignees()
            .add("Acme Traders", Some("27AAPFU0939F1ZV"), None)
            .await
            .unwrap();
        ctx.db
            .consignees()
            .add_address(
                &acme.id,
                &AddressInput {
                    address: "1 Harbour Road".into(),
                    state: "Maharashtra".into(),
                    is_default: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        add_job(&ctx, "SE/1042", Some(acme.id.clone())).await;

        let mut d = draft(DocumentKind::Invoice, vec![row("Freight", "100", "1", "9", "9")]);
        d.job_no = Some("SE/1042".into());
        d.bill_to = String::new();
        d.shipment.pod = "SGSIN".into();

        let (doc, _) = save_draft_on(&ctx, &d, june_2024()).await.unwrap();
        assert_eq!(doc.job_no.as_deref(), Some("SE/1042"));
        assert_eq!(doc.shipment.pol, "INNSA");
        assert_eq!(doc.shipment.pod, "SGSIN");
        assert_eq!(
            doc.bill_to,
            "Acme Traders\n1 Harbour Road\nMaharashtra\nGSTIN: 27AAPFU0939F1ZV"
        );
    }

    #[tokio::test]
    async fn test_list_and_show() {
        let ctx = context().await;
        let inv = draft(DocumentKind::Invoice, vec![row("Ocean Freight", "1000", "2", "9", "9")]);
        let dn = draft(DocumentKind::DebitNote, vec![row("Detention", "500", "1", "6", "6")]);
        save_draft_on(&ctx, &inv, june_2024()).await.unwrap();
        save_draft_on(&ctx, &dn, june_2024()).await.unwrap();

        let all = list(&ctx, None).await.unwrap();
        assert_eq!(all.lines().filter(|l| l.contains("SAN/")).count(), 2);
        assert_eq!(
            row_with(&all, "SAN/DN/24-25/0001"),
            vec!["SAN/DN/24-25/0001", "01-06-2024", "DEBIT NOTE", "Acme Traders", "560.00"]
        );

        let invoices = list(&ctx, Some(DocumentKind::Invoice)).await.unwrap();
        assert_eq!(invoices.lines().filter(|l| l.contains("SAN/")).count(), 1);
        assert!(!invoices.contains("SAN/DN/"));

        let shown = show(&ctx, "SAN/INV/24-25/0001").await.unwrap();
        assert!(shown.starts_with("TAX INVOICE  SAN/INV/24-25/0001"));
        assert!(shown.contains("Acme Traders"));
        assert_eq!(
            row_with(&shown, "Ocean Freight"),
            vec!["1", "Ocean Freight", "", "INR", "1000.00", "2", "2000.00", "180.00", "180.00", "2360.00"]
        );
        assert!(shown.lines().last().unwrap().starts_with("Total (INR)"));
        assert!(shown.lines().last().unwrap().ends_with("2360.00"));

        let missing = show(&ctx, "SAN/INV/24-25/0099").await.unwrap_err();
        assert!(matches!(missing, CliError::Core(CoreError::DocumentNotFound(_))));
    }

    #[tokio::test]
    async fn test_backdated_draft_is_numbered_in_the_current_year() {
        let ctx = context().await;
        let mut d = draft(DocumentKind::Invoice, vec![row("Freight", "100", "1", "9", "9")]);
        d.date = NaiveDate::from_ymd_opt(2024, 3, 15);

        let (doc, _) = save_draft_on(&ctx, &d, june_2024()).await.unwrap();
        assert_eq!(doc.document_number, "SAN/INV/24-25/0001");
        assert_eq!(doc.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());

        let shown = show(&ctx, &doc.document_number).await.unwrap();
        assert!(shown.contains("15-03-2024"));

        let (next, _) = save_draft_on(&ctx, &draft(DocumentKind::Invoice, d.lines.clone()), june_2024())
            .await
            .unwrap();
        assert_eq!(next.document_number, "SAN/INV/24-25/0002");
    }

    #[tokio::test]
    async fn test_delete_keeps_the_number_used() {
        let ctx = context().await;
        let d = draft(DocumentKind::DebitNote, vec![row("Detention", "500", "1", "6", "6")]);
        save_draft_on(&ctx, &d, june_2024()).await.unwrap();
        save_draft_on(&ctx, &d, june_2024()).await.unwrap();

        assert_eq!(
            delete(&ctx, "SAN/DN/24-25/0002").await.unwrap(),
            "Deleted SAN/DN/24-25/0002\n"
        );
        let err = show(&ctx, "SAN/DN/24-25/0002").await.unwrap_err();
        assert!(matches!(err, CliError::Core(CoreError::DocumentNotFound(_))));
        let err = delete(&ctx, "SAN/DN/24-25/0002").await.unwrap_err();
        assert!(matches!(err, CliError::Core(CoreError::DocumentNotFound(_))));

        let (next, _) = save_draft_on(&ctx, &d, june_2024()).await.unwrap();
        assert_eq!(next.document_number, "SAN/DN/24-25/0003");
        assert!(show(&ctx, "SAN/DN/24-25/0001").await.is_ok());
    }

    #[tokio::test]
    async fn test_save_file_and_bad_json() {
        let ctx = context().await;
        let dir = std::env::temp_dir();
        let good = dir.join(format!("sanbill-draft-{}.json", uuid::Uuid::new_v4()));
        let bad = dir.join(format!("sanbill-draft-{}.json", uuid::Uuid::new_v4()));

        std::fs::write(
            &good,
            r#"{
                "kind": "debit_note",
                "date": "2025-03-31",
                "bill_to": "Acme Traders",
                "pol": "INNSA",
                "lines": [
                    {"description": "Handling", "rate": "500", "qty": "1",
                     "taxable_override": "300", "cgst_rate": "6", "sgst_rate": "6"}
                ]
            }"#,
        )
        .unwrap();
        std::fs::write(&bad, "{ not json").unwrap();

        let label = FiscalYear::containing(Local::now().date_naive()).label();
        let out = save_file(&ctx, &good).await.unwrap();
        assert_eq!(
            out,
            format!("Saved SAN/DN/{label}/0001: 1 item(s), total INR 336.00\n")
        );

        let err = save_file(&ctx, &bad).await.unwrap_err();
        assert!(matches!(err, CliError::Draft { .. }));

        let err = save_file(&ctx, &dir.join("sanbill-missing.json")).await.unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));

        let _ = std::fs::remove_file(&good);
        let _ = std::fs::remove_file(&bad);
    }
}
