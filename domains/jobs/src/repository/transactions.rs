//! Transaction helpers for Jobs domain
//!
//! Status changes that touch both a job and its applications run inside one
//! transaction with the job row locked, so two hirer actions on the same job
//! serialize.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::applications::APPLICATION_COLUMNS;
use super::jobs::JOB_COLUMNS;
use crate::domain::entities::{Job, JobApplication};

/// Load a job and lock its row until the transaction ends
pub async fn lock_job_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

/// Load an application and lock its row until the transaction ends
pub async fn lock_application_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<JobApplication>, sqlx::Error> {
    sqlx::query_as::<_, JobApplication>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

/// Persist a job's status and hired worker
pub async fn update_job_status_tx(
    tx: &mut Transaction<'_, Postgres>,
    job: &Job,
) -> Result<Job, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!(
        "UPDATE jobs SET status = $2, worker_id = $3, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(job.id)
    .bind(job.status)
    .bind(job.worker_id)
    .fetch_one(&mut **tx)
    .await
}

/// Persist an application's status
pub async fn update_application_status_tx(
    tx: &mut Transaction<'_, Postgres>,
    application: &JobApplication,
) -> Result<JobApplication, sqlx::Error> {
    sqlx::query_as::<_, JobApplication>(&format!(
        "UPDATE job_applications SET status = $2, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {APPLICATION_COLUMNS}"
    ))
    .bind(application.id)
    .bind(application.status)
    .fetch_one(&mut **tx)
    .await
}

/// Reject every pending application of a job, optionally sparing one.
/// Returns the number of applications rejected.
pub async fn reject_pending_applications_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
    except: Option<Uuid>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE job_applications SET status = 'rejected', updated_at = NOW() \
         WHERE job_id = $1 AND status = 'pending' AND ($2::uuid IS NULL OR id <> $2)",
    )
    .bind(job_id)
    .bind(except)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

/// Move the accepted application of a reopened job to `rejected`, freeing
/// the job to hire again. Returns the number of applications released.
pub async fn release_accepted_application_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE job_applications SET status = 'rejected', updated_at = NOW() \
         WHERE job_id = $1 AND status = 'accepted'",
    )
    .bind(job_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

/// Count accepted applications of a job.
/// `FOR UPDATE` cannot be combined with aggregates in PostgreSQL, so rows are
/// locked in the subquery and counted in the outer query.
pub async fn count_accepted_applications_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM (SELECT id FROM job_applications \
         WHERE job_id = $1 AND status = 'accepted' FOR UPDATE) AS locked",
    )
    .bind(job_id)
    .fetch_one(&mut **tx)
    .await
}

/// Delete a job; its applications go with it
pub async fn delete_job_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}
