//! `sanbill status`: database location, schema and live counters.

use sanbill_core::DocumentKind;
use sanbill_db::migrations::migration_status;
use sanbill_db::StoredCounter;

use super::Context;
use crate::error::CliResult;

fn counter_line(stored: Option<&StoredCounter>) -> String {
    match stored {
        None => "not started".to_string(),
        Some(StoredCounter::Valid(state)) => {
            format!("{} #{}", state.fiscal_year, state.counter)
        }
        Some(StoredCounter::Corrupt {
            fiscal_year,
            counter,
        }) => format!(
            "CORRUPT (year={:?}, counter={:?}); next number restarts at 1",
            fiscal_year.as_deref().unwrap_or(""),
            counter.as_deref().unwrap_or("")
        ),
    }
}

pub async fn run(ctx: &Context) -> CliResult<String> {
    let healthy = ctx.db.health_check().await;
    let (total, applied) = migration_status(ctx.db.pool()).await?;

    let mut out = format!(
        "{:<12}{}\n",
        "Database",
        ctx.config.database_path.display()
    );
    out.push_str(&format!(
        "{:<12}{}\n",
        "Health",
        if healthy { "ok" } else { "unreachable" }
    ));
    out.push_str(&format!("{:<12}{applied}/{total} applied\n", "Migrations"));

    for kind in DocumentKind::ALL {
        let stored = ctx.db.counters().get_counter(kind).await?;
        let issued = ctx.db.documents().count(kind).await?;
        out.push_str(&format!(
            "{:<12}{} ({issued} stored)\n",
            kind.prefix(),
            counter_line(stored.as_ref())
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use chrono::NaiveDate;
    use sanbill_core::CounterState;

    #[tokio::test]
    async fn test_status_report() {
        let ctx = context().await;
        let june = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        ctx.db
            .numbering()
            .next_number(DocumentKind::Invoice, june)
            .await
            .unwrap();

        let out = run(&ctx).await.unwrap();
        assert!(out.contains("Health      ok"));
        assert!(out.contains("SAN/INV     24-25 #1 (0 stored)"));
        assert!(out.contains("SAN/DN      not started"));
    }

    #[test]
    fn test_counter_line() {
        let valid = StoredCounter::Valid(CounterState::new("25-26", 17));
        assert_eq!(counter_line(Some(&valid)), "25-26 #17");

        let corrupt = StoredCounter::Corrupt {
            fiscal_year: Some("24-25".into()),
            counter: Some("abc".into()),
        };
        assert!(counter_line(Some(&corrupt)).starts_with("CORRUPT"));
    }
}
