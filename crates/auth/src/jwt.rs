//! JWT issuing, validation and token extraction helpers

use axum::http::HeaderValue;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::claims::{AccessClaims, ACCESS_TOKEN_TYPE};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::types::AuthIdentity;

/// Sign an access token for `user` bound to `session_id`
pub(crate) fn issue_jwt_token(
    user: &AuthIdentity,
    session_id: Uuid,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let now = chrono::Utc::now().timestamp();
    let claims = AccessClaims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        sid: session_id.to_string(),
        ver: user.token_version,
        iat: now,
        exp: now + config.access_token_ttl_secs,
        typ: ACCESS_TOKEN_TYPE.to_string(),
        iss: config.issuer.clone(),
        aud: config.audience.clone(),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_ref());
    encode(&Header::new(Algorithm::HS256), &claims, &key).map_err(|e| {
        tracing::error!(error = %e, user_id = %user.id, "Failed to sign access token");
        AuthError::TokenIssueFailed
    })
}

/// Validate an access token signed with the configured secret
pub(crate) fn validate_jwt_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);

    if let Some(aud) = &config.audience {
        validation.set_audience(&[aud]);
    } else {
        validation.validate_aud = false;
    }

    if let Some(iss) = &config.issuer {
        validation.set_issuer(&[iss]);
    }

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_ref());

    let token_data = decode::<AccessClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        AuthError::InvalidToken
    })?;

    if token_data.claims.typ != ACCESS_TOKEN_TYPE {
        tracing::debug!(typ = %token_data.claims.typ, "Rejected non-access token");
        return Err(AuthError::InvalidToken);
    }

    Ok(token_data.claims)
}

/// Extract bearer token from Authorization header
pub(crate) fn extract_bearer_token(header: &HeaderValue) -> Result<String, AuthError> {
    let header_str = header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorizationFormat)?;

    match header_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AuthError::InvalidAuthorizationFormat),
    }
}
