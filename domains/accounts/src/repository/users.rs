//! User repository

use chrono::{DateTime, Utc};
use kelmah_common::{db::is_unique_violation, Error, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::User;

/// Every column of `users`, in `User` field order
pub(crate) const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, \
     role, is_email_verified, email_verification_token_hash, email_verification_expires_at, \
     password_reset_token_hash, password_reset_expires_at, mfa_enabled, mfa_secret, is_active, \
     deactivated_at, failed_login_attempts, locked_until, token_version, last_login_at, \
     created_at, updated_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by (already normalized) email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Insert a new user. A taken email maps to 409.
    pub async fn create(&self, user: &User) -> Result<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (
                id, email, password_hash, first_name, last_name, phone, role,
                is_email_verified, email_verification_token_hash, email_verification_expires_at,
                mfa_enabled, is_active, failed_login_attempts, token_version,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.role)
        .bind(user.is_email_verified)
        .bind(&user.email_verification_token_hash)
        .bind(user.email_verification_expires_at)
        .bind(user.mfa_enabled)
        .bind(user.is_active)
        .bind(user.failed_login_attempts)
        .bind(user.token_version)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict("An account with this email already exists".to_string())
            } else {
                Error::Database(e)
            }
        })?;

        Ok(created)
    }

    /// Consume a verification token. Returns `None` when the token is
    /// unknown or expired.
    pub async fn verify_email(&self, token_hash: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                is_email_verified = TRUE,
                email_verification_token_hash = NULL,
                email_verification_expires_at = NULL,
                updated_at = NOW()
            WHERE email_verification_token_hash = $1
              AND email_verification_expires_at > NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Replace the pending verification token
    pub async fn set_verification_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                email_verification_token_hash = $2,
                email_verification_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1 AND is_email_verified = FALSE
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a password reset token, replacing any earlier one
    pub async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                password_reset_token_hash = $2,
                password_reset_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count a failed password attempt, locking the account once
    /// `max_attempts` is reached. A lock that already ran out starts a
    /// fresh count.
    pub async fn record_failed_login(
        &self,
        user_id: Uuid,
        max_attempts: i32,
        lockout_minutes: i32,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            WITH next AS (
                SELECT id,
                       CASE WHEN locked_until IS NOT NULL AND locked_until <= NOW()
                            THEN 1
                            ELSE failed_login_attempts + 1
                       END AS attempts
                FROM users
                WHERE id = $1
            )
            UPDATE users SET
                failed_login_attempts = next.attempts,
                locked_until = CASE WHEN next.attempts >= $2
                                    THEN NOW() + make_interval(mins => $3)
                                    ELSE NULL
                               END,
                updated_at = NOW()
            FROM next
            WHERE users.id = next.id
            RETURNING {}
            "#,
            qualified_columns("users")
        ))
        .bind(user_id)
        .bind(max_attempts)
        .bind(lockout_minutes)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Clear the failure counter and stamp `last_login_at`
    pub async fn record_successful_login(&self, user_id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                failed_login_attempts = 0,
                locked_until = NULL,
                last_login_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Store (or clear) a secret that is not yet enabled
    pub async fn set_pending_mfa_secret(&self, user_id: Uuid, secret: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                mfa_secret = $2,
                updated_at = NOW()
            WHERE id = $1 AND mfa_enabled = FALSE
            "#,
        )
        .bind(user_id)
        .bind(secret)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Turn MFA on for the pending secret. `None` if it was enabled meanwhile
    /// or no secret is pending.
    pub async fn enable_mfa(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                mfa_enabled = TRUE,
                updated_at = NOW()
            WHERE id = $1 AND mfa_enabled = FALSE AND mfa_secret IS NOT NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn disable_mfa(&self, user_id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                mfa_enabled = FALSE,
                mfa_secret = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Reactivate a deactivated account. `None` if it was already active.
    pub async fn reactivate(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                is_active = TRUE,
                deactivated_at = NULL,
                failed_login_attempts = 0,
                locked_until = NULL,
                updated_at = NOW()
            WHERE id = $1 AND is_active = FALSE
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

/// `USER_COLUMNS` prefixed with a table alias, for `UPDATE ... FROM`
pub(crate) fn qualified_columns(table: &str) -> String {
    USER_COLUMNS
        .split(',')
        .map(|c| format!("{}.{}", table, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
