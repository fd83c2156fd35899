//! Job handlers
//!
//! - GET    /api/jobs
//! - POST   /api/jobs
//! - GET    /api/jobs/my-jobs
//! - GET    /api/jobs/{id}
//! - PUT    /api/jobs/{id}
//! - DELETE /api/jobs/{id}
//! - PATCH  /api/jobs/{id}/status

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use kelmah_auth::{HirerUser, OptionalAuthUser};
use kelmah_common::{Error, Pagination, Result, ValidatedJson};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::JobsState;
use crate::domain::entities::{Job, JobChanges, JobSearch, JobSort, JobStatus, JobType, NewJob};
use crate::domain::state::JobEvent;
use crate::domain::validation::{
    validate_budget, validate_currency, validate_job_status, validate_job_type,
    validate_skills, BudgetInput, DESCRIPTION_MAX_LEN, DESCRIPTION_MIN_LEN, TITLE_MAX_LEN,
    TITLE_MIN_LEN,
};
use crate::repository::transactions::{
    count_accepted_applications_tx, delete_job_tx, lock_job_tx, reject_pending_applications_tx,
    release_accepted_application_tx, update_job_status_tx,
};

pub(crate) const JOB_NOT_FOUND: &str = "Job not found";

#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    pub min: Decimal,
    pub max: Decimal,
    pub currency: String,
}

/// Job response DTO
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub hirer_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub job_type: JobType,
    pub budget: BudgetResponse,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub worker_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(j: Job) -> Self {
        Self {
            id: j.id,
            hirer_id: j.hirer_id,
            title: j.title,
            description: j.description,
            category: j.category,
            job_type: j.job_type,
            budget: BudgetResponse {
                min: j.budget_min,
                max: j.budget_max,
                currency: j.currency,
            },
            location: j.location,
            skills: j.skills,
            deadline: j.deadline,
            status: j.status,
            worker_id: j.worker_id,
            created_at: j.created_at,
            updated_at: j.updated_at,
        }
    }
}

/// One page of jobs
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl JobListResponse {
    fn new(jobs: Vec<Job>, total: i64, pagination: Pagination) -> Self {
        Self {
            jobs: jobs.into_iter().map(JobResponse::from).collect(),
            total,
            page: pagination.page(),
            limit: pagination.limit(),
            total_pages: pagination.total_pages(total),
        }
    }
}

/// Query parameters of the public job list.
///
/// Kept as strings so malformed values answer with the usual JSON error body.
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub job_type: Option<String>,
    pub location: Option<String>,
    pub min_budget: Option<String>,
    pub max_budget: Option<String>,
    pub skills: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn parse_param<T: FromStr>(name: &str, value: Option<&str>) -> Result<Option<T>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Validation(format!("\"{}\" is invalid", name))),
    }
}

impl ListJobsParams {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
        }
    }

    /// Parse into search criteria. Drafts are never listed publicly.
    pub fn to_search(&self) -> Result<JobSearch> {
        let status = parse_param::<JobStatus>("status", self.status.as_deref())?.unwrap_or_default();
        if status == JobStatus::Draft {
            return Err(Error::Validation(
                "\"status\" cannot be draft".to_string(),
            ));
        }

        let min_budget = parse_param::<Decimal>("min_budget", self.min_budget.as_deref())?;
        let max_budget = parse_param::<Decimal>("max_budget", self.max_budget.as_deref())?;
        if let (Some(min), Some(max)) = (min_budget, max_budget) {
            if min > max {
                return Err(Error::Validation(
                    "\"min_budget\" cannot be greater than \"max_budget\"".to_string(),
                ));
            }
        }

        let skills = self
            .skills
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(JobSearch {
            search: self.search.clone(),
            category: self.category.clone(),
            job_type: parse_param::<JobType>("job_type", self.job_type.as_deref())?,
            location: self.location.clone(),
            min_budget,
            max_budget,
            skills,
            status,
            sort: parse_param::<JobSort>("sort", self.sort.as_deref())?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MyJobsParams {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Request for posting a job
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateJobRequest {
    #[validate(length(
        min = TITLE_MIN_LEN,
        max = TITLE_MAX_LEN,
        message = "\"title\" must be between 5 and 100 characters"
    ))]
    pub title: String,

    #[validate(length(
        min = DESCRIPTION_MIN_LEN,
        max = DESCRIPTION_MAX_LEN,
        message = "\"description\" must be between 20 and 5000 characters"
    ))]
    pub description: String,

    #[validate(length(min = 1, max = 100, message = "\"category\" is required"))]
    pub category: String,

    #[validate(custom(
        function = "validate_job_type",
        message = "\"job_type\" must be one of [full_time, part_time, contract, one_time]"
    ))]
    pub job_type: String,

    #[validate(required(message = "\"budget\" is required"), custom(function = "validate_budget"))]
    pub budget: Option<BudgetInput>,

    #[validate(custom(
        function = "validate_currency",
        message = "\"currency\" must be a 3-letter code"
    ))]
    pub currency: Option<String>,

    #[validate(length(max = 200, message = "\"location\" must be at most 200 characters"))]
    pub location: Option<String>,

    #[validate(custom(
        function = "validate_skills",
        message = "\"skills\" must contain at most 20 items of up to 50 characters"
    ))]
    pub skills: Vec<String>,

    pub deadline: Option<DateTime<Utc>>,

    pub publish: Option<bool>,
}

impl CreateJobRequest {
    fn into_new_job(self) -> Result<NewJob> {
        let job_type = self.job_type.parse::<JobType>().map_err(Error::Validation)?;
        let budget = self
            .budget
            .ok_or_else(|| Error::Validation("\"budget\" is required".to_string()))?;

        Ok(NewJob {
            title: self.title,
            description: self.description,
            category: self.category,
            job_type,
            budget_min: budget.min,
            budget_max: budget.max,
            currency: self.currency,
            location: self.location,
            skills: self.skills,
            deadline: self.deadline,
            publish: self.publish.unwrap_or(true),
        })
    }
}

/// Partial job update; absent fields stay unchanged
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateJobRequest {
    #[validate(length(
        min = TITLE_MIN_LEN,
        max = TITLE_MAX_LEN,
        message = "\"title\" must be between 5 and 100 characters"
    ))]
    pub title: Option<String>,

    #[validate(length(
        min = DESCRIPTION_MIN_LEN,
        max = DESCRIPTION_MAX_LEN,
        message = "\"description\" must be between 20 and 5000 characters"
    ))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 100, message = "\"category\" cannot be empty"))]
    pub category: Option<String>,

    #[validate(custom(
        function = "validate_job_type",
        message = "\"job_type\" must be one of [full_time, part_time, contract, one_time]"
    ))]
    pub job_type: Option<String>,

    #[validate(custom(function = "validate_budget"))]
    pub budget: Option<BudgetInput>,

    #[validate(custom(
        function = "validate_currency",
        message = "\"currency\" must be a 3-letter code"
    ))]
    pub currency: Option<String>,

    #[validate(length(max = 200, message = "\"location\" must be at most 200 characters"))]
    pub location: Option<String>,

    #[validate(custom(
        function = "validate_skills",
        message = "\"skills\" must contain at most 20 items of up to 50 characters"
    ))]
    pub skills: Option<Vec<String>>,

    pub deadline: Option<DateTime<Utc>>,
}

impl UpdateJobRequest {
    fn into_changes(self) -> Result<JobChanges> {
        let job_type = self
            .job_type
            .map(|t| t.parse::<JobType>().map_err(Error::Validation))
            .transpose()?;

        Ok(JobChanges {
            title: self.title,
            description: self.description,
            category: self.category,
            job_type,
            budget_min: self.budget.map(|b| b.min),
            budget_max: self.budget.map(|b| b.max),
            currency: self.currency,
            location: self.location,
            skills: self.skills,
            deadline: self.deadline,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateJobStatusRequest {
    #[validate(custom(
        function = "validate_job_status",
        message = "\"status\" must be one of [draft, open, in_progress, completed, cancelled]"
    ))]
    pub status: String,
}

/// Load a job the caller owns. Other hirers get 404.
pub(crate) async fn find_owned_job(state: &JobsState, id: Uuid, owner: Uuid) -> Result<Job> {
    state
        .repos
        .jobs
        .find(id)
        .await?
        .filter(|job| job.is_owned_by(owner))
        .ok_or_else(|| Error::NotFound(JOB_NOT_FOUND.to_string()))
}

/// Public, filterable job list
pub async fn list_jobs(
    State(state): State<JobsState>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<JobListResponse>> {
    let search = params.to_search()?;
    let pagination = params.pagination();

    let (jobs, total) = state
        .repos
        .jobs
        .search(&search, pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(JobListResponse::new(jobs, total, pagination)))
}

/// Jobs posted by the calling hirer
pub async fn my_jobs(
    HirerUser(ctx): HirerUser,
    State(state): State<JobsState>,
    Query(params): Query<MyJobsParams>,
) -> Result<Json<JobListResponse>> {
    let status = parse_param::<JobStatus>("status", params.status.as_deref())?;
    let pagination = Pagination {
        page: params.page,
        limit: params.limit,
    };

    let (jobs, total) = state
        .repos
        .jobs
        .list_by_hirer(ctx.user_id(), status, pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(JobListResponse::new(jobs, total, pagination)))
}

/// Single job. Drafts are only visible to their hirer.
pub async fn get_job(
    OptionalAuthUser(ctx): OptionalAuthUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>> {
    let viewer = ctx.as_ref().map(|c| c.user_id());
    let job = state
        .repos
        .jobs
        .find(id)
        .await?
        .filter(|job| job.is_visible_to(viewer))
        .ok_or_else(|| Error::NotFound(JOB_NOT_FOUND.to_string()))?;

    Ok(Json(JobResponse::from(job)))
}

/// Post a new job
pub async fn create_job(
    HirerUser(ctx): HirerUser,
    State(state): State<JobsState>,
    ValidatedJson(req): ValidatedJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobResponse>)> {
    let job = Job::new(ctx.user_id(), req.into_new_job()?)?;
    let created = state.repos.jobs.create(&job).await?;

    tracing::info!(
        job_id = %created.id,
        hirer_id = %created.hirer_id,
        status = %created.status,
        "Job created"
    );

    Ok((StatusCode::CREATED, Json(JobResponse::from(created))))
}

/// Edit a draft or open job
pub async fn update_job(
    HirerUser(ctx): HirerUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateJobRequest>,
) -> Result<Json<JobResponse>> {
    let mut job = find_owned_job(&state, id, ctx.user_id()).await?;
    job.apply_changes(req.into_changes()?)?;

    let updated = state
        .repos
        .jobs
        .update_details(&job)
        .await?
        .ok_or_else(|| Error::Conflict("Job can no longer be edited".to_string()))?;

    tracing::info!(job_id = %updated.id, "Job updated");

    Ok(Json(JobResponse::from(updated)))
}

/// Delete a draft or open job that has not hired anyone
pub async fn delete_job(
    HirerUser(ctx): HirerUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut tx = state.repos.begin().await?;

    let job = lock_job_tx(&mut tx, id)
        .await?
        .filter(|job| job.is_owned_by(ctx.user_id()))
        .ok_or_else(|| Error::NotFound(JOB_NOT_FOUND.to_string()))?;

    if !job.is_editable() {
        return Err(Error::Conflict(format!(
            "Job is {} and cannot be deleted",
            job.status
        )));
    }
    if count_accepted_applications_tx(&mut tx, job.id).await? > 0 {
        return Err(Error::Conflict(
            "Job has an accepted application and cannot be deleted".to_string(),
        ));
    }

    delete_job_tx(&mut tx, job.id).await?;
    tx.commit().await?;

    tracing::info!(job_id = %id, hirer_id = %ctx.user_id(), "Job deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Drive the job state machine. Cancelling rejects pending applications;
/// reopening rejects the accepted one so another worker can be hired.
pub async fn update_job_status(
    HirerUser(ctx): HirerUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateJobStatusRequest>,
) -> Result<Json<JobResponse>> {
    let target = req.status.parse::<JobStatus>().map_err(Error::Validation)?;

    let mut tx = state.repos.begin().await?;

    let mut job = lock_job_tx(&mut tx, id)
        .await?
        .filter(|job| job.is_owned_by(ctx.user_id()))
        .ok_or_else(|| Error::NotFound(JOB_NOT_FOUND.to_string()))?;

    let from = job.status;
    let event = job.change_status(target)?;
    let updated = update_job_status_tx(&mut tx, &job).await?;

    let rejected = match event {
        JobEvent::Cancel => reject_pending_applications_tx(&mut tx, job.id, None).await?,
        JobEvent::Reopen => release_accepted_application_tx(&mut tx, job.id).await?,
        _ => 0,
    };

    tx.commit().await?;

    tracing::info!(
        job_id = %updated.id,
        from = %from,
        to = %updated.status,
        event = %event,
        rejected_applications = rejected,
        "Job status changed"
    );

    Ok(Json(JobResponse::from(updated)))
}
