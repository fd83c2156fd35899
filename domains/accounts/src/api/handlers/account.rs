//! Account lifecycle handlers
//!
//! - POST /api/auth/account/deactivate
//! - POST /api/auth/account/reactivate

use axum::{extract::State, Json};
use kelmah_auth::AuthUser;
use kelmah_common::{Error, Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::auth::{load_user, MessageResponse, INVALID_CREDENTIALS};
use crate::api::middleware::AccountsState;
use crate::domain::entities::{normalize_email, UserResponse};
use crate::domain::password::verify_password;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DeactivateRequest {
    #[validate(length(min = 1, message = "\"password\" is required"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ReactivateRequest {
    #[validate(email(message = "\"email\" must be a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "\"password\" is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ReactivateResponse {
    pub message: String,
    pub user: UserResponse,
}

/// Deactivate the caller's account and sign out everywhere
pub async fn deactivate(
    auth: AuthUser,
    State(state): State<AccountsState>,
    ValidatedJson(request): ValidatedJson<DeactivateRequest>,
) -> Result<Json<MessageResponse>> {
    let user = load_user(&state, &auth).await?;

    if !verify_password(&request.password, &user.password_hash).await? {
        return Err(Error::Authentication("Invalid password".to_string()));
    }

    let mut tx = state.repos.begin().await?;
    crate::deactivate_user_tx(&mut tx, user.id).await?;
    let revoked = crate::revoke_user_sessions_tx(&mut tx, user.id).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, revoked_sessions = revoked, "Account deactivated");

    Ok(MessageResponse::new("Account deactivated successfully"))
}

/// Reactivate a deactivated account with its credentials
pub async fn reactivate(
    State(state): State<AccountsState>,
    ValidatedJson(request): ValidatedJson<ReactivateRequest>,
) -> Result<Json<ReactivateResponse>> {
    let email = normalize_email(&request.email);

    let user = state
        .repos
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| Error::Authentication(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(&request.password, &user.password_hash).await? {
        return Err(Error::Authentication(INVALID_CREDENTIALS.to_string()));
    }

    let user = state
        .repos
        .users
        .reactivate(user.id)
        .await?
        .ok_or_else(|| Error::Conflict("Account is already active".to_string()))?;

    tracing::info!(user_id = %user.id, "Account reactivated");

    Ok(Json(ReactivateResponse {
        message: "Account reactivated successfully. You can now log in".to_string(),
        user: user.into(),
    }))
}
