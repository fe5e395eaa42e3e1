//! `sanbill jobs`, `sanbill new-job` and `sanbill close-job`.

use comfy_table::Cell;
use sanbill_core::{Job, JobStatus};
use sanbill_db::{DbError, NewJob};
use tracing::info;

use super::{render as render_table, table, Context};
use crate::args::NewJobArgs;
use crate::error::CliResult;

fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Open => "open",
        JobStatus::Closed => "closed",
    }
}

fn render(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return "No jobs.\n".to_string();
    }

    let mut grid = table(&["JOB NO", "STATUS", "ROUTE", "SHIPPER", "VESSEL/FLIGHT"]);
    for job in jobs {
        grid.add_row(vec![
            Cell::new(&job.job_no),
            Cell::new(status_label(job.status)),
            Cell::new(format!("{} > {}", job.shipment.pol, job.shipment.pod)),
            Cell::new(&job.shipment.shipper),
            Cell::new(&job.shipment.vessel_flight),
        ]);
    }
    render_table(&grid)
}

/// Lists all jobs, or only the open ones.
pub async fn list(ctx: &Context, open_only: bool) -> CliResult<String> {
    let jobs = if open_only {
        ctx.db.jobs().list_open().await?
    } else {
        ctx.db.jobs().list().await?
    };
    Ok(render(&jobs))
}

/// Opens a job, optionally billed to an existing customer.
pub async fn create(ctx: &Context, args: &NewJobArgs) -> CliResult<String> {
    let customer_id = match args.customer.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => {
            let customer = ctx
                .db
                .consignees()
                .get(id)
                .await?
                .ok_or_else(|| DbError::not_found("Customer", id))?;
            Some(customer.id)
        }
        _ => None,
    };

    let job = ctx
        .db
        .jobs()
        .insert(&NewJob {
            job_no: args.job_no.clone(),
            customer_id,
            shipment: args.shipment(),
            consignment: args.consignment(),
        })
        .await?;

    info!(job_no = %job.job_no, id = %job.id, "Job opened");
    Ok(format!("Job {} opened\n", job.job_no))
}

/// Closes a job so it is no longer offered for billing.
pub async fn close(ctx: &Context, job_no: &str) -> CliResult<String> {
    ctx.db.jobs().close(job_no).await?;
    Ok(format!("Job {} closed\n", job_no.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, row_with};
    use crate::error::CliError;

    fn job_args(job_no: &str) -> NewJobArgs {
        NewJobArgs {
            job_no: job_no.into(),
            shipper: "Acme Traders".into(),
            pol: "INNSA".into(),
            pod: "AEJEA".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_and_close() {
        let ctx = context().await;
        assert_eq!(list(&ctx, false).await.unwrap(), "No jobs.\n");

        create(&ctx, &job_args("SE/1001")).await.unwrap();
        create(&ctx, &job_args("SE/1002")).await.unwrap();

        assert_eq!(close(&ctx, "SE/1001").await.unwrap(), "Job SE/1001 closed\n");

        let all = list(&ctx, false).await.unwrap();
        assert_eq!(
            row_with(&all, "SE/1001"),
            vec!["SE/1001", "closed", "INNSA > AEJEA", "Acme Traders", ""]
        );

        let open = list(&ctx, true).await.unwrap();
        assert!(open.contains("SE/1002"));
        assert!(!open.contains("SE/1001"));
    }

    #[tokio::test]
    async fn test_close_unknown_job() {
        let ctx = context().await;
        let err = close(&ctx, "SE/404").await.unwrap_err();
        assert!(matches!(err, CliError::Db(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_new_job_with_customer() {
        let ctx = context().await;
        let acme = ctx.db.consignees().add("Acme Traders", None, None).await.unwrap();

        let mut args = job_args("SE/1042");
        args.customer = Some(acme.id.clone());
        args.packages = "12 PLT".into();
        assert_eq!(create(&ctx, &args).await.unwrap(), "Job SE/1042 opened\n");

        let job = ctx.db.jobs().get_by_job_no("SE/1042").await.unwrap().unwrap();
        assert_eq!(job.customer_id.as_deref(), Some(acme.id.as_str()));
        assert_eq!(job.consignment.packages, "12 PLT");
        assert!(job.is_open());
    }

    #[tokio::test]
    async fn test_new_job_rejects_unknown_customer_and_duplicates() {
        let ctx = context().await;

        let mut args = job_args("SE/1042");
        args.customer = Some("missing".into());
        let err = create(&ctx, &args).await.unwrap_err();
        assert!(matches!(err, CliError::Db(DbError::NotFound { .. })));
        assert_eq!(list(&ctx, false).await.unwrap(), "No jobs.\n");

        create(&ctx, &job_args("SE/1042")).await.unwrap();
        let err = create(&ctx, &job_args("SE/1042")).await.unwrap_err();
        assert_eq!(err.to_string(), "Duplicate job_no: 'SE/1042' already exists");
    }
}
