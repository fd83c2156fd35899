//! Jobs domain: job postings, their lifecycle, and worker applications

pub mod api;
pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::*;
pub use domain::state::{
    ApplicationEvent, ApplicationState, ApplicationStateMachine, JobEvent, JobGuardContext,
    JobState, JobStateMachine, StateError,
};

pub use repository::{
    ApplicationRepository, ApplicationWithApplicant, ApplicationWithJob, JobRepository,
    JobsRepositories,
};

pub use api::routes;
pub use api::JobsState;
