//! Concrete authentication backend
//!
//! Wraps `PgPool` + `AuthConfig` and owns auth-specific SQL queries.
//! Uses runtime `sqlx::query_as` (not macros) for the cross-domain read of
//! the users and sessions tables owned by the accounts domain.

use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::context::AuthContext;
use crate::error::AuthError;
use crate::types::AuthIdentity;

/// Concrete authentication backend.
///
/// Domain states expose this via `FromRef`:
/// ```ignore
/// impl FromRef<MyDomainState> for AuthBackend {
///     fn from_ref(state: &MyDomainState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthBackend {
    pool: PgPool,
    config: AuthConfig,
}

impl AuthBackend {
    pub fn new(pool: PgPool, config: AuthConfig) -> Self {
        Self { pool, config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Sign an access token for `user` bound to `session_id`.
    pub fn issue_access_token(
        &self,
        user: &AuthIdentity,
        session_id: Uuid,
    ) -> Result<String, AuthError> {
        crate::jwt::issue_jwt_token(user, session_id, &self.config)
    }

    /// Access token lifetime in seconds, reported to clients as `expires_in`
    pub fn access_token_ttl_secs(&self) -> i64 {
        self.config.access_token_ttl_secs
    }

    /// Find user identity by ID (CQRS read model, lightweight subset of User)
    pub(crate) async fn find_user(&self, id: Uuid) -> Result<Option<AuthIdentity>, AuthError> {
        let user: Option<AuthIdentity> = sqlx::query_as(
            r#"
            SELECT id, email, first_name, last_name, role, is_active, token_version
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %id, "Failed to load user");
            AuthError::UserLoadError
        })?;

        Ok(user)
    }

    /// Whether the session exists for this user and is neither revoked nor expired
    pub(crate) async fn session_is_active(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AuthError> {
        let active: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sessions
                WHERE id = $1 AND user_id = $2
                  AND revoked_at IS NULL AND expires_at > NOW()
            )
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, session_id = %session_id, "Failed to check session");
            AuthError::UserLoadError
        })?;

        Ok(active)
    }

    /// Full bearer-token authentication: signature, user, token version, session.
    pub(crate) async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = crate::jwt::validate_jwt_token(token, &self.config)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidUserId)?;
        let session_id = Uuid::parse_str(&claims.sid).map_err(|_| AuthError::InvalidToken)?;

        let user = self
            .find_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        check_identity(&user, claims.ver)?;

        if !self.session_is_active(session_id, user_id).await? {
            tracing::debug!(user_id = %user_id, session_id = %session_id, "Session inactive");
            return Err(AuthError::SessionExpired);
        }

        Ok(AuthContext::new(user, session_id))
    }
}

/// Checks that need only the loaded user row
fn check_identity(user: &AuthIdentity, token_version: i32) -> Result<(), AuthError> {
    if !user.is_active {
        return Err(AuthError::AccountDeactivated);
    }
    if user.token_version != token_version {
        tracing::debug!(user_id = %user.id, "Stale token version");
        return Err(AuthError::TokenRevoked);
    }
    Ok(())
}
