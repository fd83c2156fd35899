//! Authentication errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::types::UserRole;

/// Authentication error
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    MissingAuthorization,
    InvalidAuthorizationFormat,
    InvalidToken,
    InvalidUserId,
    UserNotFound,
    UserLoadError,
    /// Account was deactivated by its owner
    AccountDeactivated,
    /// Token version is older than the user's (password changed or reset)
    TokenRevoked,
    /// Session behind the token was revoked or has expired
    SessionExpired,
    TokenIssueFailed,
    /// Route restricted to another role
    InsufficientRole(UserRole),
}

impl AuthError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AuthError::MissingAuthorization => (
                StatusCode::UNAUTHORIZED,
                "MISSING_AUTHORIZATION",
                "Authorization header required".to_string(),
            ),
            AuthError::InvalidAuthorizationFormat => (
                StatusCode::UNAUTHORIZED,
                "INVALID_AUTHORIZATION",
                "Invalid authorization header format".to_string(),
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Invalid or expired token".to_string(),
            ),
            AuthError::InvalidUserId => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Invalid user ID in token".to_string(),
            ),
            AuthError::UserNotFound => (
                StatusCode::UNAUTHORIZED,
                "USER_NOT_FOUND",
                "User not found".to_string(),
            ),
            AuthError::UserLoadError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "USER_LOAD_ERROR",
                "Failed to load user".to_string(),
            ),
            AuthError::AccountDeactivated => (
                StatusCode::FORBIDDEN,
                "ACCOUNT_DEACTIVATED",
                "Account is deactivated".to_string(),
            ),
            AuthError::TokenRevoked => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_REVOKED",
                "Token has been revoked, please log in again".to_string(),
            ),
            AuthError::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                "SESSION_EXPIRED",
                "Session has expired or was revoked".to_string(),
            ),
            AuthError::TokenIssueFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_ERROR",
                "Failed to issue access token".to_string(),
            ),
            AuthError::InsufficientRole(role) => (
                StatusCode::FORBIDDEN,
                "INSUFFICIENT_ROLE",
                format!("Only {} accounts can perform this action", role),
            ),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.parts().2)
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for kelmah_common::Error {
    fn from(err: AuthError) -> Self {
        use kelmah_common::Error;
        let message = err.to_string();
        match err.status_code() {
            StatusCode::FORBIDDEN => Error::Authorization(message),
            StatusCode::UNAUTHORIZED => Error::Authentication(message),
            _ => Error::Internal(message),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
