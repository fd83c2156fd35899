//! Credential handlers
//!
//! - POST /api/auth/register
//! - POST /api/auth/login
//! - GET  /api/auth/verify/{token}
//! - POST /api/auth/resend-verification
//! - POST /api/auth/forgot-password
//! - POST /api/auth/reset-password/{token}
//! - POST /api/auth/logout
//! - POST /api/auth/refresh-token
//! - POST /api/auth/change-password
//! - GET  /api/auth/me
//! - GET  /api/auth/verify
//! - GET  /api/auth/health

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use kelmah_auth::{AuthUser, UserRole};
use kelmah_common::{generate_token, hash_token, Error, Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::api::middleware::{AccountsState, ClientMeta};
use crate::domain::entities::{
    normalize_email, reset_expiry, verification_expiry, User, UserResponse,
    LOCKOUT_MINUTES, MAX_FAILED_LOGIN_ATTEMPTS,
};
use crate::domain::password::{hash_password, verify_password};
use crate::domain::totp;
use crate::domain::validation::{
    validate_password_strength, validate_phone, validate_role, PASSWORD_MAX_LEN,
    PASSWORD_MIN_LEN,
};

pub(crate) const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub(crate) const ACCOUNT_DEACTIVATED: &str = "Account has been deactivated";
const TOKEN_TYPE: &str = "Bearer";

/// Request for creating an account
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(length(
        min = 2,
        max = 50,
        message = "\"first_name\" must be between 2 and 50 characters"
    ))]
    pub first_name: String,

    #[validate(length(
        min = 2,
        max = 50,
        message = "\"last_name\" must be between 2 and 50 characters"
    ))]
    pub last_name: String,

    #[validate(email(message = "\"email\" must be a valid email"))]
    pub email: String,

    #[validate(
        length(
            min = PASSWORD_MIN_LEN,
            max = PASSWORD_MAX_LEN,
            message = "\"password\" must be between 8 and 128 characters"
        ),
        custom(
            function = "validate_password_strength",
            message = "\"password\" must contain an uppercase letter, a lowercase letter, a number and a special character"
        )
    )]
    pub password: String,

    #[validate(must_match(
        other = "password",
        message = "\"confirm_password\" must match \"password\""
    ))]
    pub confirm_password: String,

    #[validate(custom(
        function = "validate_role",
        message = "\"role\" must be one of [hirer, worker]"
    ))]
    pub role: String,

    #[validate(custom(
        function = "validate_phone",
        message = "\"phone\" must be a valid phone number"
    ))]
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email(message = "\"email\" must be a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "\"password\" is required"))]
    pub password: String,

    pub mfa_code: Option<String>,

    pub remember_me: bool,
}

/// Body of the endpoints that only take an address
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct EmailRequest {
    #[validate(email(message = "\"email\" must be a valid email"))]
    pub email: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ResetPasswordRequest {
    #[validate(
        length(
            min = PASSWORD_MIN_LEN,
            max = PASSWORD_MAX_LEN,
            message = "\"password\" must be between 8 and 128 characters"
        ),
        custom(
            function = "validate_password_strength",
            message = "\"password\" must contain an uppercase letter, a lowercase letter, a number and a special character"
        )
    )]
    pub password: String,

    #[validate(must_match(
        other = "password",
        message = "\"confirm_password\" must match \"password\""
    ))]
    pub confirm_password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "\"refresh_token\" is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "\"current_password\" is required"))]
    pub current_password: String,

    #[validate(
        length(
            min = PASSWORD_MIN_LEN,
            max = PASSWORD_MAX_LEN,
            message = "\"new_password\" must be between 8 and 128 characters"
        ),
        custom(
            function = "validate_password_strength",
            message = "\"new_password\" must contain an uppercase letter, a lowercase letter, a number and a special character"
        )
    )]
    pub new_password: String,

    #[validate(must_match(
        other = "new_password",
        message = "\"confirm_password\" must match \"new_password\""
    ))]
    pub confirm_password: String,
}

/// Access/refresh token pair handed out on login and refresh
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub message: String,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Create a session for `user` and sign its first access token.
pub(crate) async fn start_session(
    state: &AccountsState,
    user: &User,
    meta: ClientMeta,
    remember_me: bool,
) -> Result<TokenPair> {
    let refresh_token = generate_token();
    let session = crate::Session::new(
        user.id,
        hash_token(&refresh_token),
        meta.user_agent,
        meta.ip_address,
        state.config.session_ttl(remember_me),
    );
    let session = state.repos.sessions.create(&session).await?;

    let access_token = state.auth.issue_access_token(&user.identity(), session.id)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: TOKEN_TYPE,
        expires_in: state.auth.access_token_ttl_secs(),
    })
}

/// Load the full row behind an authenticated request
pub(crate) async fn load_user(state: &AccountsState, auth: &AuthUser) -> Result<User> {
    state
        .repos
        .users
        .get_by_id(auth.0.user_id())
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))
}

/// Create an account
///
/// **POST /api/auth/register**
///
/// The account starts unverified. A verification link is emailed; failures
/// to send are logged and do not fail the request.
pub async fn register(
    State(state): State<AccountsState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let email = normalize_email(&request.email);
    let role: UserRole = request.role.parse().map_err(Error::Validation)?;

    if state.repos.users.find_by_email(&email).await?.is_some() {
        return Err(Error::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&request.password, state.config.bcrypt_cost).await?;
    let verification_token = generate_token();

    let user = User::new(
        &email,
        password_hash,
        &request.first_name,
        &request.last_name,
        request.phone,
        role,
        hash_token(&verification_token),
    );
    let user = state.repos.users.create(&user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    if let Err(e) = state
        .email
        .send_verification_email(&user.email, &user.first_name, &verification_token)
        .await
    {
        tracing::warn!(error = %e, user_id = %user.id, "Failed to send verification email");
    }

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful. Please check your email to verify your account"
                .to_string(),
            user: user.into(),
        }),
    ))
}

/// Log in with email and password
///
/// **POST /api/auth/login**
///
/// Checks run in this order: known email, lockout, password, active flag,
/// email verification, MFA. Wrong passwords count towards the lockout.
pub async fn login(
    State(state): State<AccountsState>,
    meta: ClientMeta,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Response> {
    let email = normalize_email(&request.email);
    let now = Utc::now();

    let Some(user) = state.repos.users.find_by_email(&email).await? else {
        tracing::debug!("Login attempt for unknown email");
        return Err(Error::Authentication(INVALID_CREDENTIALS.to_string()));
    };

    if user.is_locked(now) {
        tracing::warn!(user_id = %user.id, "Login attempt on locked account");
        return Err(Error::Authorization(format!(
            "Account is locked due to too many failed login attempts. Try again in {} minutes",
            LOCKOUT_MINUTES
        )));
    }

    if !verify_password(&request.password, &user.password_hash).await? {
        let updated = state
            .repos
            .users
            .record_failed_login(user.id, MAX_FAILED_LOGIN_ATTEMPTS, LOCKOUT_MINUTES)
            .await?;
        if updated.is_locked(Utc::now()) {
            tracing::warn!(
                user_id = %user.id,
                attempts = updated.failed_login_attempts,
                "Account locked after repeated failed logins"
            );
        }
        return Err(Error::Authentication(INVALID_CREDENTIALS.to_string()));
    }

    if !user.is_active {
        return Err(Error::Authorization(ACCOUNT_DEACTIVATED.to_string()));
    }

    if state.config.require_email_verification && !user.is_email_verified {
        return Err(Error::Authorization(
            "Please verify your email address before logging in".to_string(),
        ));
    }

    if user.mfa_enabled {
        let code = request
            .mfa_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let Some(code) = code else {
            return Ok(Json(json!({
                "mfa_required": true,
                "message": "Multi-factor authentication code required",
            }))
            .into_response());
        };

        let secret = user.active_mfa_secret()?;
        if !totp::verify_code(secret, code, totp::now_secs()) {
            tracing::warn!(user_id = %user.id, "Invalid MFA code on login");
            return Err(Error::Authentication("Invalid MFA code".to_string()));
        }
    }

    let user = state.repos.users.record_successful_login(user.id).await?;
    let tokens = start_session(&state, &user, meta, request.remember_me).await?;

    tracing::info!(user_id = %user.id, remember_me = request.remember_me, "User logged in");

    Ok(Json(LoginResponse {
        user: user.into(),
        tokens,
    })
    .into_response())
}

/// Confirm an email address
///
/// **GET /api/auth/verify/{token}**
pub async fn verify_email(
    State(state): State<AccountsState>,
    Path(token): Path<String>,
) -> Result<Json<Value>> {
    let user = state
        .repos
        .users
        .verify_email(&hash_token(&token))
        .await?
        .ok_or_else(|| Error::Validation("Invalid or expired verification token".to_string()))?;

    tracing::info!(user_id = %user.id, "Email verified");

    Ok(Json(json!({
        "message": "Email verified successfully",
        "user": UserResponse::from(user),
    })))
}

/// Send a fresh verification link
///
/// **POST /api/auth/resend-verification**
///
/// Answers the same way whether or not the account exists.
pub async fn resend_verification(
    State(state): State<AccountsState>,
    ValidatedJson(request): ValidatedJson<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    let email = normalize_email(&request.email);

    if let Some(user) = state.repos.users.find_by_email(&email).await? {
        if user.is_active && !user.is_email_verified {
            let token = generate_token();
            state
                .repos
                .users
                .set_verification_token(user.id, &hash_token(&token), verification_expiry(Utc::now()))
                .await?;

            if let Err(e) = state
                .email
                .send_verification_email(&user.email, &user.first_name, &token)
                .await
            {
                tracing::warn!(error = %e, user_id = %user.id, "Failed to resend verification email");
            }
        }
    }

    Ok(MessageResponse::new(
        "If an unverified account exists for this email, a verification link has been sent",
    ))
}

/// Start password recovery
///
/// **POST /api/auth/forgot-password**
///
/// Answers the same way whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AccountsState>,
    ValidatedJson(request): ValidatedJson<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    let email = normalize_email(&request.email);

    if let Some(user) = state.repos.users.find_by_email(&email).await? {
        if user.is_active {
            let token = generate_token();
            state
                .repos
                .users
                .set_reset_token(user.id, &hash_token(&token), reset_expiry(Utc::now()))
                .await?;

            tracing::info!(user_id = %user.id, "Password reset requested");

            if let Err(e) = state
                .email
                .send_password_reset_email(&user.email, &user.first_name, &token)
                .await
            {
                tracing::warn!(error = %e, user_id = %user.id, "Failed to send password reset email");
            }
        }
    }

    Ok(MessageResponse::new(
        "If an account exists for this email, a password reset link has been sent",
    ))
}

/// Complete password recovery
///
/// **POST /api/auth/reset-password/{token}**
///
/// Consumes the token, clears any lockout and signs the user out everywhere.
pub async fn reset_password(
    State(state): State<AccountsState>,
    Path(token): Path<String>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let password_hash = hash_password(&request.password, state.config.bcrypt_cost).await?;

    let mut tx = state.repos.begin().await?;

    let user = crate::reset_password_tx(&mut tx, &hash_token(&token), &password_hash)
        .await?
        .ok_or_else(|| Error::Validation("Invalid or expired password reset token".to_string()))?;

    let revoked = crate::revoke_user_sessions_tx(&mut tx, user.id).await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, revoked_sessions = revoked, "Password reset");

    if let Err(e) = state
        .email
        .send_password_changed_email(&user.email, &user.first_name)
        .await
    {
        tracing::warn!(error = %e, user_id = %user.id, "Failed to send password changed email");
    }

    Ok(MessageResponse::new("Password has been reset successfully"))
}

/// Revoke the session behind a refresh token
///
/// **POST /api/auth/logout**
///
/// Always succeeds; a missing, malformed or unknown token is ignored.
pub async fn logout(State(state): State<AccountsState>, body: Bytes) -> Result<Json<MessageResponse>> {
    let refresh_token = serde_json::from_slice::<LogoutRequest>(&body)
        .ok()
        .and_then(|r| r.refresh_token)
        .filter(|t| !t.is_empty());

    if let Some(token) = refresh_token {
        if let Some(session_id) = state
            .repos
            .sessions
            .revoke_by_token_hash(&hash_token(&token))
            .await?
        {
            tracing::info!(session_id = %session_id, "Session logged out");
        }
    }

    Ok(MessageResponse::new("Logged out successfully"))
}

/// Rotate a refresh token
///
/// **POST /api/auth/refresh-token**
///
/// The presented token stops working once a new one is issued.
pub async fn refresh_token(
    State(state): State<AccountsState>,
    ValidatedJson(request): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<TokenPair>> {
    let new_refresh_token = generate_token();

    let session = state
        .repos
        .sessions
        .rotate(
            &hash_token(&request.refresh_token),
            &hash_token(&new_refresh_token),
        )
        .await?
        .ok_or_else(|| Error::Authentication("Invalid or expired refresh token".to_string()))?;

    let user = state
        .repos
        .users
        .get_by_id(session.user_id)
        .await?
        .ok_or_else(|| Error::Authentication("Invalid or expired refresh token".to_string()))?;

    if !user.is_active {
        return Err(Error::Authorization(ACCOUNT_DEACTIVATED.to_string()));
    }

    let access_token = state.auth.issue_access_token(&user.identity(), session.id)?;

    tracing::debug!(user_id = %user.id, session_id = %session.id, "Refresh token rotated");

    Ok(Json(TokenPair {
        access_token,
        refresh_token: new_refresh_token,
        token_type: TOKEN_TYPE,
        expires_in: state.auth.access_token_ttl_secs(),
    }))
}

/// Change the password of the signed-in user
///
/// **POST /api/auth/change-password**
///
/// Other sessions are revoked and earlier access tokens stop working; the
/// response carries a fresh access token for the current session.
pub async fn change_password(
    auth: AuthUser,
    State(state): State<AccountsState>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>> {
    let user = load_user(&state, &auth).await?;

    if !verify_password(&request.current_password, &user.password_hash).await? {
        return Err(Error::Authentication(
            "Current password is incorrect".to_string(),
        ));
    }

    if verify_password(&request.new_password, &user.password_hash).await? {
        return Err(Error::Validation(
            "New password must be different from the current password".to_string(),
        ));
    }

    let password_hash = hash_password(&request.new_password, state.config.bcrypt_cost).await?;
    let session_id = auth.0.session_id;

    let mut tx = state.repos.begin().await?;
    let user = crate::update_password_tx(&mut tx, user.id, &password_hash).await?;
    let revoked = crate::revoke_other_sessions_tx(&mut tx, user.id, session_id).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, revoked_sessions = revoked, "Password changed");

    let access_token = state.auth.issue_access_token(&user.identity(), session_id)?;

    if let Err(e) = state
        .email
        .send_password_changed_email(&user.email, &user.first_name)
        .await
    {
        tracing::warn!(error = %e, user_id = %user.id, "Failed to send password changed email");
    }

    Ok(Json(ChangePasswordResponse {
        message: "Password changed successfully".to_string(),
        access_token,
        token_type: TOKEN_TYPE,
        expires_in: state.auth.access_token_ttl_secs(),
    }))
}

/// Current user profile
///
/// **GET /api/auth/me**
pub async fn me(auth: AuthUser, State(state): State<AccountsState>) -> Result<Json<Value>> {
    let user = load_user(&state, &auth).await?;
    Ok(Json(json!({ "user": UserResponse::from(user) })))
}

/// Token check used by the SPA on startup
///
/// **GET /api/auth/verify**
pub async fn verify_token(
    auth: AuthUser,
    State(state): State<AccountsState>,
) -> Result<Json<Value>> {
    let user = load_user(&state, &auth).await?;
    Ok(Json(json!({
        "valid": true,
        "user": UserResponse::from(user),
    })))
}

/// **GET /api/auth/health**
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Auth service is up and running",
    }))
}
