//! # Job Repository
//!
//! Database operations for shipment jobs.
//!
//! ## Lifecycle
//! ```text
//! insert ──► Open ──► close ──► Closed
//!             │
//!             └── offered by list_open() when a document is created
//! ```

use chrono::Utc;
use sanbill_core::validation::validate_job_no;
use sanbill_core::{ConsignmentDetails, Job, JobStatus, ShipmentDetails};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::decode_timestamp;
use crate::error::{DbError, DbResult};

const SELECT_JOB: &str = r#"
    SELECT
        id, job_no, customer_id,
        shipper, consignee, pol, pod, vessel_flight, etd, eta, mbl_no, hbl_no,
        gross_weight, net_weight, volume_cbm, packages, be_no, be_date, igm_no, igm_date,
        item_no, exchange_rate, ref_no, status, created_at
    FROM jobs
"#;

/// Fields supplied when opening a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewJob {
    pub job_no: String,
    pub customer_id: Option<String>,
    pub shipment: ShipmentDetails,
    pub consignment: ConsignmentDetails,
}

#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    job_no: String,
    customer_id: Option<String>,
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
    status: JobStatus,
    created_at: String,
}

impl TryFrom<JobRow> for Job {
    type Error = DbError;

    fn try_from(row: JobRow) -> DbResult<Self> {
        Ok(Job {
            created_at: decode_timestamp("jobs.created_at", &row.created_at)?,
            id: row.id,
            job_no: row.job_no,
            customer_id: row.customer_id,
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
            status: row.status,
        })
    }
}

/// Repository for job database operations.
///
/// ## Usage
/// ```rust,ignore
/// let jobs = db.jobs();
/// let job = jobs.get_by_job_no("SE/1042").await?;
/// jobs.close("SE/1042").await?;
/// ```
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    /// Creates a new JobRepository.
    pub fn new(pool: SqlitePool) -> Self {
        JobRepository { pool }
    }

    /// Opens a new job.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the job number is taken
    /// * `Err(DbError::Validation)` - the job number is malformed
    pub async fn insert(&self, new_job: &NewJob) -> DbResult<Job> {
        validate_job_no(&new_job.job_no)?;

        let job = Job {
            id: Uuid::new_v4().to_string(),
            job_no: new_job.job_no.trim().to_string(),
            customer_id: new_job.customer_id.clone(),
            shipment: new_job.shipment.clone(),
            consignment: new_job.consignment.clone(),
            status: JobStatus::Open,
            created_at: Utc::now(),
        };

        debug!(id = %job.id, job_no = %job.job_no, "Inserting job");

        let s = &job.shipment;
        let c = &job.consignment;
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, job_no, customer_id,
                shipper, consignee, pol, pod, vessel_flight, etd, eta, mbl_no, hbl_no,
                gross_weight, net_weight, volume_cbm, packages, be_no, be_date, igm_no, igm_date,
                item_no, exchange_rate, ref_no, status, created_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24, ?25
            )
            "#,
        )
        .bind(&job.id)
        .bind(&job.job_no)
        .bind(&job.customer_id)
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
        .bind(job.status)
        .bind(job.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("job_no", &job.job_no),
            other => other,
        })?;

        Ok(job)
    }

    /// Lists every job, newest first.
    pub async fn list(&self) -> DbResult<Vec<Job>> {
        let sql = format!("{SELECT_JOB} ORDER BY created_at DESC, job_no DESC");
        let rows: Vec<JobRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    /// Lists the jobs that can still be billed, newest first.
    pub async fn list_open(&self) -> DbResult<Vec<Job>> {
        let sql = format!("{SELECT_JOB} WHERE status = ?1 ORDER BY created_at DESC, job_no DESC");
        let rows: Vec<JobRow> = sqlx::query_as(&sql)
            .bind(JobStatus::Open)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Listed open jobs");
        rows.into_iter().map(Job::try_from).collect()
    }

    /// Gets a job by its UUID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Job>> {
        let sql = format!("{SELECT_JOB} WHERE id = ?1");
        let row: Option<JobRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Job::try_from).transpose()
    }

    /// Gets a job by its business number, e.g. `SE/1042`.
    pub async fn get_by_job_no(&self, job_no: &str) -> DbResult<Option<Job>> {
        let sql = format!("{SELECT_JOB} WHERE job_no = ?1");
        let row: Option<JobRow> = sqlx::query_as(&sql)
            .bind(job_no.trim())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Job::try_from).transpose()
    }

    /// Closes a job. Closing a closed job is a no-op.
    pub async fn close(&self, job_no: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE jobs SET status = ?2 WHERE job_no = ?1")
            .bind(job_no.trim())
            .bind(JobStatus::Closed)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Job", job_no));
        }

        info!(job_no = %job_no, "Job closed");
        Ok(())
    }
}
