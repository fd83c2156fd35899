//! Job application repository

use kelmah_common::{
    db::{is_foreign_key_violation, is_unique_violation},
    Error, Result,
};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{JobApplication, JobStatus};

pub(crate) const APPLICATION_COLUMNS: &str = "id, job_id, worker_id, cover_letter, \
     proposed_rate, estimated_duration, status, created_at, updated_at";

/// Application columns prefixed with a table alias, for joins
fn aliased_columns(alias: &str) -> String {
    APPLICATION_COLUMNS
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Application as seen by the hirer, with the applicant's name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApplicationWithApplicant {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: JobApplication,
    pub worker_first_name: String,
    pub worker_last_name: String,
}

/// Application as seen by the worker, with the job it targets
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApplicationWithJob {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: JobApplication,
    pub job_title: String,
    pub job_status: JobStatus,
}

#[derive(Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<JobApplication>> {
        let row = sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Insert a new application. A second application by the same worker
    /// for the same job is a conflict.
    pub async fn create(&self, application: &JobApplication) -> Result<JobApplication> {
        let created = sqlx::query_as::<_, JobApplication>(&format!(
            r#"
            INSERT INTO job_applications ({APPLICATION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(application.id)
        .bind(application.job_id)
        .bind(application.worker_id)
        .bind(&application.cover_letter)
        .bind(application.proposed_rate)
        .bind(&application.estimated_duration)
        .bind(application.status)
        .bind(application.created_at)
        .bind(application.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict("You have already applied to this job".to_string())
            } else if is_foreign_key_violation(&e) {
                Error::NotFound("Job not found".to_string())
            } else {
                Error::Database(e)
            }
        })?;
        Ok(created)
    }

    /// Applications for a job, oldest first
    pub async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<ApplicationWithApplicant>> {
        let rows = sqlx::query_as::<_, ApplicationWithApplicant>(&format!(
            r#"
            SELECT {}, u.first_name AS worker_first_name, u.last_name AS worker_last_name
            FROM job_applications a
            JOIN users u ON u.id = a.worker_id
            WHERE a.job_id = $1
            ORDER BY a.created_at ASC, a.id
            "#,
            aliased_columns("a")
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// A worker's applications, newest first, with the total count
    pub async fn list_for_worker(
        &self,
        worker_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ApplicationWithJob>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job_applications WHERE worker_id = $1")
                .bind(worker_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, ApplicationWithJob>(&format!(
            r#"
            SELECT {}, j.title AS job_title, j.status AS job_status
            FROM job_applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.worker_id = $1
            ORDER BY a.created_at DESC, a.id
            LIMIT $2 OFFSET $3
            "#,
            aliased_columns("a")
        ))
        .bind(worker_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }
}
