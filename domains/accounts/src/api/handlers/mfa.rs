//! Multi-factor authentication handlers
//!
//! Setup stores a pending secret; MFA is only switched on once the user
//! proves their authenticator produces valid codes.

use axum::{extract::State, Json};
use kelmah_auth::AuthUser;
use kelmah_common::{Error, Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::auth::load_user;
use crate::api::middleware::AccountsState;
use crate::domain::password::verify_password;
use crate::domain::totp;
use crate::domain::validation::validate_mfa_code;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct MfaCodeRequest {
    #[validate(custom(
        function = "validate_mfa_code",
        message = "\"code\" must be a 6-digit code"
    ))]
    pub code: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DisableMfaRequest {
    #[validate(length(min = 1, message = "\"password\" is required"))]
    pub password: String,

    #[validate(custom(
        function = "validate_mfa_code",
        message = "\"code\" must be a 6-digit code"
    ))]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct MfaSetupResponse {
    pub secret: String,
    pub otpauth_url: String,
}

#[derive(Debug, Serialize)]
pub struct MfaStatusResponse {
    pub message: String,
    pub mfa_enabled: bool,
}

/// **POST /api/auth/mfa/setup**
pub async fn setup(
    auth: AuthUser,
    State(state): State<AccountsState>,
) -> Result<Json<MfaSetupResponse>> {
    let user = load_user(&state, &auth).await?;

    if user.mfa_enabled {
        return Err(Error::Conflict("MFA is already enabled".to_string()));
    }

    let secret = totp::generate_secret();
    state
        .repos
        .users
        .set_pending_mfa_secret(user.id, Some(&secret))
        .await?;

    tracing::info!(user_id = %user.id, "MFA setup started");

    Ok(Json(MfaSetupResponse {
        otpauth_url: totp::otpauth_url(&state.config.mfa_issuer, &user.email, &secret),
        secret,
    }))
}

/// **POST /api/auth/mfa/verify**
pub async fn verify(
    auth: AuthUser,
    State(state): State<AccountsState>,
    ValidatedJson(request): ValidatedJson<MfaCodeRequest>,
) -> Result<Json<MfaStatusResponse>> {
    let user = load_user(&state, &auth).await?;

    if user.mfa_enabled {
        return Err(Error::Conflict("MFA is already enabled".to_string()));
    }

    let secret = user
        .pending_mfa_secret()
        .ok_or_else(|| Error::Validation("No MFA setup in progress".to_string()))?;

    if !totp::verify_code(secret, &request.code, totp::now_secs()) {
        return Err(Error::Validation("Invalid MFA code".to_string()));
    }

    state
        .repos
        .users
        .enable_mfa(user.id)
        .await?
        .ok_or_else(|| Error::Validation("No MFA setup in progress".to_string()))?;

    tracing::info!(user_id = %user.id, "MFA enabled");

    Ok(Json(MfaStatusResponse {
        message: "Multi-factor authentication enabled".to_string(),
        mfa_enabled: true,
    }))
}

/// **POST /api/auth/mfa/disable**
pub async fn disable(
    auth: AuthUser,
    State(state): State<AccountsState>,
    ValidatedJson(request): ValidatedJson<DisableMfaRequest>,
) -> Result<Json<MfaStatusResponse>> {
    let user = load_user(&state, &auth).await?;

    if !user.mfa_enabled {
        return Err(Error::Validation("MFA is not enabled".to_string()));
    }

    if !verify_password(&request.password, &user.password_hash).await? {
        return Err(Error::Authentication("Invalid password".to_string()));
    }

    let secret = user.active_mfa_secret()?;
    if !totp::verify_code(secret, &request.code, totp::now_secs()) {
        return Err(Error::Authentication("Invalid MFA code".to_string()));
    }

    state.repos.users.disable_mfa(user.id).await?;

    tracing::info!(user_id = %user.id, "MFA disabled");

    Ok(Json(MfaStatusResponse {
        message: "Multi-factor authentication disabled".to_string(),
        mfa_enabled: false,
    }))
}
