//! Session management handlers
//!
//! - GET    /api/auth/sessions
//! - DELETE /api/auth/sessions
//! - DELETE /api/auth/sessions/{session_id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use kelmah_auth::AuthUser;
use kelmah_common::{Error, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::api::middleware::AccountsState;
use crate::domain::entities::SessionResponse;

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionResponse>,
}

#[derive(Debug, Serialize)]
pub struct RevokedResponse {
    pub revoked: u64,
}

/// Active sessions of the caller; the one making the request is flagged `current`
pub async fn list_sessions(
    auth: AuthUser,
    State(state): State<AccountsState>,
) -> Result<Json<SessionListResponse>> {
    let current = auth.0.session_id;
    let now = Utc::now();

    let sessions = state
        .repos
        .sessions
        .list_active_for_user(auth.0.user_id())
        .await?
        .into_iter()
        .filter(|s| s.is_active(now))
        .map(|s| SessionResponse::from_session(s, current))
        .collect();

    Ok(Json(SessionListResponse { sessions }))
}

/// Sign out every other device
pub async fn revoke_other_sessions(
    auth: AuthUser,
    State(state): State<AccountsState>,
) -> Result<Json<RevokedResponse>> {
    let mut tx = state.repos.begin().await?;
    let revoked =
        crate::revoke_other_sessions_tx(&mut tx, auth.0.user_id(), auth.0.session_id).await?;
    tx.commit().await?;

    tracing::info!(user_id = %auth.0.user_id(), revoked, "Other sessions revoked");

    Ok(Json(RevokedResponse { revoked }))
}

/// Revoke one session. Sessions of other users are reported as not found.
pub async fn revoke_session(
    auth: AuthUser,
    State(state): State<AccountsState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode> {
    let revoked = state
        .repos
        .sessions
        .revoke_for_user(auth.0.user_id(), session_id)
        .await?;

    if !revoked {
        return Err(Error::NotFound("Session not found".to_string()));
    }

    tracing::info!(user_id = %auth.0.user_id(), session_id = %session_id, "Session revoked");

    Ok(StatusCode::NO_CONTENT)
}
