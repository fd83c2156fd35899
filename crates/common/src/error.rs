//! API error type shared by every Kelmah domain
//!
//! Every failure leaves the service as `{"error": {"code", "message"}}`.
//! Client errors keep their message; server-side failures are logged and
//! answered with a generic one.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing, expired or revoked credentials
    #[error("{0}")]
    Authentication(String),

    /// Authenticated but not allowed (role, lockout, unverified email)
    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{message}")]
    RateLimit {
        message: String,
        retry_after: Duration,
    },
}

impl Error {
    pub fn rate_limited(retry_after: Duration) -> Self {
        Error::RateLimit {
            message: "Too many requests, please try again later".to_string(),
            retry_after,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::Authorization(_) => StatusCode::FORBIDDEN,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Unexpected(_)
            | Error::Database(_)
            | Error::Serialization(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code clients switch on
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Authentication(_) => "AUTHENTICATION_ERROR",
            Error::Authorization(_) => "AUTHORIZATION_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::RateLimit { .. } => "RATE_LIMIT_EXCEEDED",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Unexpected(_) | Error::Serialization(_) | Error::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    fn public_message(&self) -> String {
        if self.is_server_error() {
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }

    /// Whole seconds, never zero
    fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Error::RateLimit { retry_after, .. } => Some(retry_after.as_secs().max(1)),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.public_message(),
            }
        }));
        let mut response = (self.status_code(), body).into_response();

        if let Some(secs) = self.retry_after_secs() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}
