//! Application handlers
//!
//! - POST  /api/jobs/{id}/applications
//! - GET   /api/jobs/{id}/applications
//! - GET   /api/applications/me
//! - PATCH /api/applications/{id}/status

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use kelmah_auth::{AuthUser, HirerUser, WorkerUser};
use kelmah_common::{Error, Pagination, Result, ValidatedJson};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::jobs::{find_owned_job, JOB_NOT_FOUND};
use crate::api::middleware::JobsState;
use crate::domain::entities::{ApplicationStatus, JobApplication, JobStatus};
use crate::domain::state::ApplicationEvent;
use crate::domain::validation::{
    validate_application_target, validate_non_negative, COVER_LETTER_MAX_LEN,
    COVER_LETTER_MIN_LEN,
};
use crate::repository::transactions::{
    lock_application_tx, lock_job_tx, reject_pending_applications_tx,
    update_application_status_tx, update_job_status_tx,
};
use crate::repository::{ApplicationWithApplicant, ApplicationWithJob};

const APPLICATION_NOT_FOUND: &str = "Application not found";

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ApplyRequest {
    #[validate(length(
        min = COVER_LETTER_MIN_LEN,
        max = COVER_LETTER_MAX_LEN,
        message = "\"cover_letter\" must be between 20 and 5000 characters"
    ))]
    pub cover_letter: String,

    #[validate(custom(
        function = "validate_non_negative",
        message = "\"proposed_rate\" cannot be negative"
    ))]
    pub proposed_rate: Option<Decimal>,

    #[validate(length(
        max = 100,
        message = "\"estimated_duration\" must be at most 100 characters"
    ))]
    pub estimated_duration: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateApplicationStatusRequest {
    #[validate(custom(
        function = "validate_application_target",
        message = "\"status\" must be one of [accepted, rejected, withdrawn]"
    ))]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct JobApplicationsResponse {
    pub applications: Vec<ApplicationWithApplicant>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MyApplicationsResponse {
    pub applications: Vec<ApplicationWithJob>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

/// Who is acting on an application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Actor {
    Hirer,
    Applicant,
}

/// Hirers accept or reject; applicants withdraw.
fn authorize(actor: Actor, event: ApplicationEvent) -> Result<()> {
    match (actor, event) {
        (Actor::Hirer, ApplicationEvent::Accept | ApplicationEvent::Reject) => Ok(()),
        (Actor::Applicant, ApplicationEvent::Withdraw) => Ok(()),
        (Actor::Hirer, ApplicationEvent::Withdraw) => Err(Error::Authorization(
            "Only the applicant can withdraw an application".to_string(),
        )),
        (Actor::Applicant, _) => Err(Error::Authorization(
            "Only the job's hirer can accept or reject applications".to_string(),
        )),
    }
}

/// Apply to an open job
pub async fn apply(
    WorkerUser(ctx): WorkerUser,
    State(state): State<JobsState>,
    Path(job_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ApplyRequest>,
) -> Result<(StatusCode, Json<JobApplication>)> {
    let job = state
        .repos
        .jobs
        .find(job_id)
        .await?
        .filter(|job| job.is_visible_to(None))
        .ok_or_else(|| Error::NotFound(JOB_NOT_FOUND.to_string()))?;

    if job.status != JobStatus::Open {
        return Err(Error::Validation(format!(
            "Job is {} and not accepting applications",
            job.status
        )));
    }

    let application = JobApplication::new(
        job.id,
        ctx.user_id(),
        &req.cover_letter,
        req.proposed_rate,
        req.estimated_duration,
    )?;
    let created = state.repos.applications.create(&application).await?;

    tracing::info!(
        application_id = %created.id,
        job_id = %created.job_id,
        worker_id = %created.worker_id,
        "Application submitted"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

/// Applications received for one of the caller's jobs
pub async fn list_for_job(
    HirerUser(ctx): HirerUser,
    State(state): State<JobsState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobApplicationsResponse>> {
    let job = find_owned_job(&state, job_id, ctx.user_id()).await?;
    let applications = state.repos.applications.list_for_job(job.id).await?;

    Ok(Json(JobApplicationsResponse {
        total: applications.len(),
        applications,
    }))
}

/// The calling worker's applications
pub async fn my_applications(
    WorkerUser(ctx): WorkerUser,
    State(state): State<JobsState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<MyApplicationsResponse>> {
    let (applications, total) = state
        .repos
        .applications
        .list_for_worker(ctx.user_id(), pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(MyApplicationsResponse {
        applications,
        total,
        page: pagination.page(),
        limit: pagination.limit(),
        total_pages: pagination.total_pages(total),
    }))
}

/// Accept, reject or withdraw an application.
///
/// Accepting hires the applicant and rejects the job's other pending
/// applications, all under the job's row lock.
pub async fn update_status(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateApplicationStatusRequest>,
) -> Result<Json<JobApplication>> {
    let event = req
        .status
        .parse::<ApplicationStatus>()
        .ok()
        .and_then(|status| status.event())
        .ok_or_else(|| Error::Validation("\"status\" is invalid".to_string()))?;

    let not_found = || Error::NotFound(APPLICATION_NOT_FOUND.to_string());
    let user_id = ctx.user_id();

    let mut tx = state.repos.begin().await?;

    // Job first, then application: the same lock order as cancellation.
    let job_id = state
        .repos
        .applications
        .find(id)
        .await?
        .map(|a| a.job_id)
        .ok_or_else(not_found)?;
    let mut job = lock_job_tx(&mut tx, job_id).await?.ok_or_else(not_found)?;
    let mut application = lock_application_tx(&mut tx, id)
        .await?
        .filter(|a| a.job_id == job.id)
        .ok_or_else(not_found)?;

    let actor = if job.is_owned_by(user_id) {
        Actor::Hirer
    } else if application.worker_id == user_id {
        Actor::Applicant
    } else {
        return Err(not_found());
    };
    authorize(actor, event)?;

    application.apply(event)?;

    let mut rejected = 0;
    if event == ApplicationEvent::Accept {
        job.hire(application.worker_id)?;
        update_job_status_tx(&mut tx, &job).await?;
        rejected = reject_pending_applications_tx(&mut tx, job.id, Some(application.id)).await?;
    }

    let updated = update_application_status_tx(&mut tx, &application).await?;
    tx.commit().await?;

    tracing::info!(
        application_id = %updated.id,
        job_id = %job.id,
        user_id = %user_id,
        event = %event,
        status = %updated.status,
        rejected_applications = rejected,
        "Application status changed"
    );

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kelmah_common::validation_messages;

    #[test]
    fn test_hirer_may_accept_or_reject_only() {
        assert!(authorize(Actor::Hirer, ApplicationEvent::Accept).is_ok());
        assert!(authorize(Actor::Hirer, ApplicationEvent::Reject).is_ok());
        assert!(matches!(
            authorize(Actor::Hirer, ApplicationEvent::Withdraw),
            Err(Error::Authorization(_))
        ));
    }

    #[test]
    fn test_applicant_may_withdraw_only() {
        assert!(authorize(Actor::Applicant, ApplicationEvent::Withdraw).is_ok());
        assert!(matches!(
            authorize(Actor::Applicant, ApplicationEvent::Accept),
            Err(Error::Authorization(_))
        ));
        assert!(matches!(
            authorize(Actor::Applicant, ApplicationEvent::Reject),
            Err(Error::Authorization(_))
        ));
    }

    #[test]
    fn test_apply_request_validation() {
        let req = ApplyRequest {
            cover_letter: "Hire me".to_string(),
            proposed_rate: Some(Decimal::from(-10)),
            estimated_duration: None,
        };
        let errors = req.validate().unwrap_err();
        assert_eq!(
            validation_messages(&errors),
            "\"cover_letter\" must be between 20 and 5000 characters, \
             \"proposed_rate\" cannot be negative"
        );

        let req = ApplyRequest {
            cover_letter: "I have tiled over forty bathrooms in Kumasi.".to_string(),
            proposed_rate: Some(Decimal::from(300)),
            estimated_duration: Some("3 days".to_string()),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_status_request_rejects_pending() {
        let req = UpdateApplicationStatusRequest {
            status: "pending".to_string(),
        };
        let errors = req.validate().unwrap_err();
        assert_eq!(
            validation_messages(&errors),
            "\"status\" must be one of [accepted, rejected, withdrawn]"
        );
    }
}
