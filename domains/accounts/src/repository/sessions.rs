//! Session repository
//!
//! Refresh tokens are stored as SHA-256 hashes. Rotation and revocation are
//! single conditional statements so concurrent requests cannot both win.

use kelmah_common::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::Session;

pub(crate) const SESSION_COLUMNS: &str = "id, user_id, refresh_token_hash, user_agent, \
     ip_address, created_at, last_used_at, expires_at, revoked_at";

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new session
    pub async fn create(&self, session: &Session) -> Result<Session> {
        let created = sqlx::query_as::<_, Session>(&format!(
            r#"
            INSERT INTO sessions (
                id, user_id, refresh_token_hash, user_agent, ip_address,
                created_at, last_used_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.refresh_token_hash)
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .bind(session.created_at)
        .bind(session.last_used_at)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Swap the refresh token of an active session. `None` when the old
    /// token is unknown, revoked, expired or already rotated.
    pub async fn rotate(&self, old_hash: &str, new_hash: &str) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            UPDATE sessions SET
                refresh_token_hash = $2,
                last_used_at = NOW()
            WHERE refresh_token_hash = $1
              AND revoked_at IS NULL
              AND expires_at > NOW()
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(old_hash)
        .bind(new_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Revoke the session holding this refresh token
    pub async fn revoke_by_token_hash(&self, token_hash: &str) -> Result<Option<Uuid>> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE sessions SET revoked_at = NOW()
            WHERE refresh_token_hash = $1 AND revoked_at IS NULL
            RETURNING id
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    /// Active sessions of a user, most recently used first
    pub async fn list_active_for_user(&self, user_id: Uuid) -> Result<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > NOW()
            ORDER BY last_used_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Revoke one session owned by `user_id`. False if it is foreign,
    /// unknown or already inactive.
    pub async fn revoke_for_user(&self, user_id: Uuid, session_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET revoked_at = NOW()
            WHERE id = $1 AND user_id = $2
              AND revoked_at IS NULL AND expires_at > NOW()
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
