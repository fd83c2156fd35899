//! Social login entry points
//!
//! Token exchange with the providers is not performed: a configured
//! provider gets the authorization redirect, and its callback sends the user
//! back to the SPA login page with an error code.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::middleware::AccountsState;
use crate::domain::oauth::{authorize_url, callback_url, OAuthProvider};

fn redirect(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn login_error_redirect(state: &AccountsState, code: &str) -> Response {
    redirect(format!("{}/login?error={}", state.config.frontend_url, code))
}

/// **GET /api/auth/{provider}**
pub async fn start(state: AccountsState, provider: OAuthProvider) -> Response {
    let Some(credentials) = state.config.oauth.credentials(provider) else {
        tracing::debug!(provider = %provider, "OAuth provider not configured");
        return (
            StatusCode::NOT_IMPLEMENTED,
            Json(json!({
                "success": false,
                "message": provider.not_configured_message(),
            })),
        )
            .into_response();
    };

    let redirect_uri = callback_url(&state.config.api_base_url, provider);
    let (url, _state) = authorize_url(provider, credentials, &redirect_uri);

    tracing::info!(provider = %provider, "Redirecting to OAuth provider");
    redirect(url)
}

/// **GET /api/auth/{provider}/callback**
pub async fn callback(state: AccountsState, provider: OAuthProvider) -> Response {
    if state.config.oauth.credentials(provider).is_none() {
        return login_error_redirect(&state, "oauth_not_configured");
    }

    tracing::warn!(provider = %provider, "OAuth callback received but code exchange is unavailable");
    login_error_redirect(&state, "oauth_exchange_unavailable")
}
