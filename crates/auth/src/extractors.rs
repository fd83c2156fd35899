//! Axum extractors for authentication
//!
//! Generic over any state `S` where `AuthBackend: FromRef<S>`.
//! This is axum's idiomatic nested-state pattern.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::backend::AuthBackend;
use crate::context::AuthContext;
use crate::error::AuthError;
use crate::jwt::extract_bearer_token;
use crate::types::UserRole;

/// Authenticated user extractor (bearer JWT)
#[derive(Debug)]
pub struct AuthUser(pub AuthContext);

impl<S> FromRequestParts<S> for AuthUser
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let backend = AuthBackend::from_ref(state);

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthorization)?;

        let token = extract_bearer_token(auth_header)?;
        let auth_context = backend.authenticate(&token).await?;

        Ok(AuthUser(auth_context))
    }
}

async fn require_role<S>(
    parts: &mut Parts,
    state: &S,
    role: UserRole,
) -> Result<AuthContext, AuthError>
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    let AuthUser(auth_context) = AuthUser::from_request_parts(parts, state).await?;

    if auth_context.user.role != role {
        tracing::debug!(
            user_id = %auth_context.user.id,
            role = %auth_context.user.role,
            required = %role,
            "Role check failed"
        );
        return Err(AuthError::InsufficientRole(role));
    }

    Ok(auth_context)
}

/// Hirer authenticated user extractor.
///
/// Like `AuthUser` but rejects workers with 403 FORBIDDEN.
#[derive(Debug)]
pub struct HirerUser(pub AuthContext);

impl<S> FromRequestParts<S> for HirerUser
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Hirer)
            .await
            .map(HirerUser)
    }
}

/// Worker authenticated user extractor. Rejects hirers with 403.
#[derive(Debug)]
pub struct WorkerUser(pub AuthContext);

impl<S> FromRequestParts<S> for WorkerUser
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Worker)
            .await
            .map(WorkerUser)
    }
}

/// Optional authentication for public routes.
///
/// No `Authorization` header yields `None`. A header that is present but
/// invalid is still rejected, so clients notice stale tokens.
#[derive(Debug)]
pub struct OptionalAuthUser(pub Option<AuthContext>);

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(OptionalAuthUser(None));
        }

        let AuthUser(auth_context) = AuthUser::from_request_parts(parts, state).await?;
        Ok(OptionalAuthUser(Some(auth_context)))
    }
}
