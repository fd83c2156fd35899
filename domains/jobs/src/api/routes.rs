//! Route definitions for Jobs domain API

use axum::{
    routing::{get, patch},
    Router,
};

use super::handlers::{applications, jobs};
use super::middleware::JobsState;

fn job_routes() -> Router<JobsState> {
    Router::new()
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/jobs/my-jobs", get(jobs::my_jobs))
        .route(
            "/api/jobs/{id}",
            get(jobs::get_job)
                .put(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route("/api/jobs/{id}/status", patch(jobs::update_job_status))
}

fn application_routes() -> Router<JobsState> {
    Router::new()
        .route(
            "/api/jobs/{id}/applications",
            get(applications::list_for_job).post(applications::apply),
        )
        .route("/api/applications/me", get(applications::my_applications))
        .route(
            "/api/applications/{id}/status",
            patch(applications::update_status),
        )
}

/// Create all Jobs domain routes
pub fn routes() -> Router<JobsState> {
    Router::new()
        .merge(job_routes())
        .merge(application_routes())
}
