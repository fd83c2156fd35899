//! Repository implementations for Jobs domain

pub mod applications;
pub mod jobs;
pub mod transactions;

use sqlx::{PgPool, Postgres, Transaction};

pub use applications::{ApplicationRepository, ApplicationWithApplicant, ApplicationWithJob};
pub use jobs::JobRepository;

/// Combined repository access for the Jobs domain
#[derive(Clone)]
pub struct JobsRepositories {
    pool: PgPool,
    pub jobs: JobRepository,
    pub applications: ApplicationRepository,
}

impl JobsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            jobs: JobRepository::new(pool.clone()),
            applications: ApplicationRepository::new(pool.clone()),
            pool,
        }
    }

    /// Begin a new database transaction.
    pub async fn begin(&self) -> std::result::Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Get a reference to the underlying database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub use transactions::{
    count_accepted_applications_tx, delete_job_tx, lock_application_tx, lock_job_tx,
    reject_pending_applications_tx, release_accepted_application_tx, update_application_status_tx,
    update_job_status_tx,
};
