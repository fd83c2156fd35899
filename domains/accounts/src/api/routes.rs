//! Route definitions for Accounts domain API

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post, MethodRouter},
    Router,
};
use kelmah_common::rate_limit::enforce;
use kelmah_common::{RateLimit, RateLimitPolicy, RateLimiter};

use super::handlers::{account, auth, mfa, oauth, sessions};
use super::middleware::AccountsState;
use crate::domain::oauth::OAuthProvider;

const HOUR: Duration = Duration::from_secs(60 * 60);

pub const REGISTER_POLICY: RateLimitPolicy = RateLimitPolicy::new(5, HOUR);
pub const LOGIN_POLICY: RateLimitPolicy = RateLimitPolicy::new(10, Duration::from_secs(15 * 60));
pub const EMAIL_VERIFICATION_POLICY: RateLimitPolicy = RateLimitPolicy::new(3, HOUR);
pub const FORGOT_PASSWORD_POLICY: RateLimitPolicy = RateLimitPolicy::new(3, HOUR);

fn limited(
    route: MethodRouter<AccountsState>,
    limiter: &Arc<RateLimiter>,
    bucket: &'static str,
    policy: RateLimitPolicy,
) -> MethodRouter<AccountsState> {
    route.layer(from_fn_with_state(
        RateLimit::new(limiter.clone(), bucket, policy),
        enforce,
    ))
}

/// Registration, login, recovery and token routes
fn credential_routes(limiter: &Arc<RateLimiter>) -> Router<AccountsState> {
    Router::new()
        .route(
            "/api/auth/register",
            limited(post(auth::register), limiter, "register", REGISTER_POLICY),
        )
        .route(
            "/api/auth/login",
            limited(post(auth::login), limiter, "login", LOGIN_POLICY),
        )
        .route("/api/auth/verify/{token}", get(auth::verify_email))
        .route(
            "/api/auth/resend-verification",
            limited(
                post(auth::resend_verification),
                limiter,
                "email_verification",
                EMAIL_VERIFICATION_POLICY,
            ),
        )
        .route(
            "/api/auth/forgot-password",
            limited(
                post(auth::forgot_password),
                limiter,
                "forgot_password",
                FORGOT_PASSWORD_POLICY,
            ),
        )
        .route("/api/auth/reset-password/{token}", post(auth::reset_password))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh-token", post(auth::refresh_token))
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/verify", get(auth::verify_token))
        .route("/api/auth/health", get(auth::health))
}

/// One start and one callback route per provider
fn oauth_routes() -> Router<AccountsState> {
    OAuthProvider::ALL
        .into_iter()
        .fold(Router::new(), |router, provider| {
            router
                .route(
                    &format!("/api/auth/{}", provider.slug()),
                    get(move |State(state): State<AccountsState>| oauth::start(state, provider)),
                )
                .route(
                    &format!("/api/auth/{}/callback", provider.slug()),
                    get(move |State(state): State<AccountsState>| {
                        oauth::callback(state, provider)
                    }),
                )
        })
}

fn mfa_routes() -> Router<AccountsState> {
    Router::new()
        .route("/api/auth/mfa/setup", post(mfa::setup))
        .route("/api/auth/mfa/verify", post(mfa::verify))
        .route("/api/auth/mfa/disable", post(mfa::disable))
}

fn session_routes() -> Router<AccountsState> {
    Router::new()
        .route(
            "/api/auth/sessions",
            get(sessions::list_sessions).delete(sessions::revoke_other_sessions),
        )
        .route(
            "/api/auth/sessions/{session_id}",
            axum::routing::delete(sessions::revoke_session),
        )
}

fn account_routes() -> Router<AccountsState> {
    Router::new()
        .route("/api/auth/account/deactivate", post(account::deactivate))
        .route("/api/auth/account/reactivate", post(account::reactivate))
}

/// Create all Accounts domain routes
pub fn routes(limiter: Arc<RateLimiter>) -> Router<AccountsState> {
    Router::new()
        .merge(credential_routes(&limiter))
        .merge(oauth_routes())
        .merge(mfa_routes())
        .merge(session_routes())
        .merge(account_routes())
}
