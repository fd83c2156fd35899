//! Job repository

use crate::domain::entities::{Job, JobSearch, JobStatus};
use kelmah_common::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

pub(crate) const JOB_COLUMNS: &str = "id, hirer_id, title, description, category, job_type, \
     budget_min, budget_max, currency, location, skills, deadline, status, worker_id, \
     created_at, updated_at";

#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find job by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Public search. Returns one page plus the total match count.
    pub async fn search(
        &self,
        search: &JobSearch,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Job>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs WHERE ");
        push_search_filters(&mut count, search);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {JOB_COLUMNS} FROM jobs WHERE "));
        push_search_filters(&mut query, search);
        query.push(format!(" ORDER BY {}", search.sort.order_by()));
        query.push(" LIMIT ").push_bind(limit);
        query.push(" OFFSET ").push_bind(offset);

        let jobs = query.build_query_as::<Job>().fetch_all(&self.pool).await?;
        Ok((jobs, total))
    }

    /// Jobs posted by a hirer, newest first
    pub async fn list_by_hirer(
        &self,
        hirer_id: Uuid,
        status: Option<JobStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Job>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE hirer_id = $1 AND ($2::job_status IS NULL OR status = $2)",
        )
        .bind(hirer_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let jobs = sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs
            WHERE hirer_id = $1 AND ($2::job_status IS NULL OR status = $2)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(hirer_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((jobs, total))
    }

    /// Create a new job
    pub async fn create(&self, job: &Job) -> Result<Job> {
        let row = sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs ({JOB_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.id)
        .bind(job.hirer_id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.category)
        .bind(job.job_type)
        .bind(job.budget_min)
        .bind(job.budget_max)
        .bind(&job.currency)
        .bind(&job.location)
        .bind(&job.skills)
        .bind(job.deadline)
        .bind(job.status)
        .bind(job.worker_id)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Persist edited fields. The status guard keeps a concurrent hire from
    /// being overwritten; `None` means the job left the editable states.
    pub async fn update_details(&self, job: &Job) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs SET
                title = $2, description = $3, category = $4, job_type = $5,
                budget_min = $6, budget_max = $7, currency = $8, location = $9,
                skills = $10, deadline = $11, updated_at = NOW()
            WHERE id = $1 AND status IN ('draft', 'open')
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.category)
        .bind(job.job_type)
        .bind(job.budget_min)
        .bind(job.budget_max)
        .bind(&job.currency)
        .bind(&job.location)
        .bind(&job.skills)
        .bind(job.deadline)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Escape `LIKE` wildcards and wrap in `%`
pub(crate) fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_search_filters(query: &mut QueryBuilder<'_, Postgres>, search: &JobSearch) {
    query.push("status = ").push_bind(search.status);

    if let Some(term) = search.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = contains_pattern(term);
        query
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = search.category.as_deref().filter(|c| !c.is_empty()) {
        query
            .push(" AND LOWER(category) = LOWER(")
            .push_bind(category.to_string())
            .push(")");
    }
    if let Some(job_type) = search.job_type {
        query.push(" AND job_type = ").push_bind(job_type);
    }
    if let Some(location) = search.location.as_deref().filter(|l| !l.is_empty()) {
        query
            .push(" AND location ILIKE ")
            .push_bind(contains_pattern(location));
    }
    if let Some(min) = search.min_budget {
        query.push(" AND budget_max >= ").push_bind(min);
    }
    if let Some(max) = search.max_budget {
        query.push(" AND budget_min <= ").push_bind(max);
    }
    if !search.skills.is_empty() {
        query.push(" AND skills && ").push_bind(search.skills.clone());
    }
}
