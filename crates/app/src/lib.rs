//! Kelmah application composition root
//!
//! Composes all domain routers into a single application.

use std::sync::Arc;

use axum::{routing::get, Router};
use kelmah_accounts::{AccountsConfig, AccountsRepositories, AccountsState};
use kelmah_auth::{AuthBackend, AuthConfig};
use kelmah_common::RateLimiter;
use kelmah_email::{EmailConfig, EmailService, EmailServiceFactory};
use kelmah_jobs::{JobsRepositories, JobsState};
use kelmah_messaging::{MessagingRepositories, MessagingState};
use sqlx::PgPool;

/// Banner served at `/`
pub const VERSION_BANNER: &str = concat!("Kelmah API v", env!("CARGO_PKG_VERSION"));

/// Shared infrastructure handed to every domain
#[derive(Clone)]
pub struct AppServices {
    pub auth_config: AuthConfig,
    pub accounts_config: AccountsConfig,
    pub email: Arc<dyn EmailService>,
    pub limiter: Arc<RateLimiter>,
}

impl AppServices {
    /// Build services from environment variables
    pub async fn from_env() -> Result<Self, anyhow::Error> {
        let auth_config = AuthConfig::from_env()?;
        let email_config = EmailConfig::from_env()?;
        let email_service = EmailServiceFactory::create(email_config).await?;

        Ok(Self {
            auth_config,
            accounts_config: AccountsConfig::from_env(),
            email: Arc::from(email_service),
            limiter: Arc::new(RateLimiter::from_env()),
        })
    }
}

/// Create the main application router with all routes
pub async fn create_app(pool: PgPool) -> Result<Router, anyhow::Error> {
    let services = AppServices::from_env().await?;
    Ok(build_router(pool, services))
}

/// Compose domain routers over an already configured set of services
pub fn build_router(pool: PgPool, services: AppServices) -> Router {
    let auth = AuthBackend::new(pool.clone(), services.auth_config);

    let accounts_state = AccountsState {
        repos: AccountsRepositories::new(pool.clone()),
        auth: auth.clone(),
        email: services.email,
        config: Arc::new(services.accounts_config),
    };

    let jobs_state = JobsState {
        repos: JobsRepositories::new(pool.clone()),
        auth: auth.clone(),
    };

    let messaging_state = MessagingState {
        repos: MessagingRepositories::new(pool),
        auth,
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(|| async { VERSION_BANNER }))
        .merge(kelmah_accounts::routes(services.limiter).with_state(accounts_state))
        .merge(kelmah_jobs::routes().with_state(jobs_state))
        .merge(kelmah_messaging::routes().with_state(messaging_state))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
