//! `sanbill next-number`: allocates and prints one document number.
//!
//! The number always belongs to the fiscal year of today's date. It is
//! consumed even if no document is ever stored under it; `save` allocates
//! its own number together with the document.

use chrono::{Local, NaiveDate};
use sanbill_core::DocumentKind;
use tracing::info;

use super::Context;
use crate::error::CliResult;

pub async fn next_number(ctx: &Context, kind: DocumentKind) -> CliResult<String> {
    next_number_on(ctx, kind, Local::now().date_naive()).await
}

/// Allocates as if today were `today`.
pub(crate) async fn next_number_on(
    ctx: &Context,
    kind: DocumentKind,
    today: NaiveDate,
) -> CliResult<String> {
    let number = ctx.db.numbering().next_number(kind, today).await?;

    info!(series = %kind, %today, number = %number, "Number allocated from the command line");
    Ok(format!("{number}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use sanbill_core::FiscalYear;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_sequence_and_rollover() {
        let ctx = context().await;
        let march = date(2025, 3, 31);
        let april = date(2025, 4, 1);

        assert_eq!(
            next_number_on(&ctx, DocumentKind::Invoice, march).await.unwrap(),
            "SAN/INV/24-25/0001\n"
        );
        assert_eq!(
            next_number_on(&ctx, DocumentKind::Invoice, march).await.unwrap(),
            "SAN/INV/24-25/0002\n"
        );
        assert_eq!(
            next_number_on(&ctx, DocumentKind::Invoice, april).await.unwrap(),
            "SAN/INV/25-26/0001\n"
        );
        assert_eq!(
            next_number_on(&ctx, DocumentKind::DebitNote, april).await.unwrap(),
            "SAN/DN/25-26/0001\n"
        );
    }

    #[tokio::test]
    async fn test_uses_the_current_fiscal_year() {
        let ctx = context().await;
        let label = FiscalYear::containing(Local::now().date_naive()).label();

        let out = next_number(&ctx, DocumentKind::DebitNote).await.unwrap();
        assert_eq!(out, format!("SAN/DN/{label}/0001\n"));
    }
}
