//! Account entities
//!
//! `User` is the full row of the `users` table; `kelmah_auth::AuthIdentity`
//! is the lightweight read model derived from it. Secrets (password hash,
//! token hashes, MFA secret) never leave the domain: responses go through
//! `UserResponse`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use kelmah_auth::{AuthIdentity, UserRole};
use kelmah_common::{Error, Result};

/// Consecutive failed logins before the account is locked
pub const MAX_FAILED_LOGIN_ATTEMPTS: i32 = 5;

/// Lockout duration once the failure budget is spent
pub const LOCKOUT_MINUTES: i32 = 15;

/// Email verification link lifetime
pub const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;

/// Password reset link lifetime
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// User entity
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub email_verification_token_hash: Option<String>,
    pub email_verification_expires_at: Option<DateTime<Utc>>,
    pub password_reset_token_hash: Option<String>,
    pub password_reset_expires_at: Option<DateTime<Utc>>,
    pub mfa_enabled: bool,
    pub mfa_secret: Option<String>,
    pub is_active: bool,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub token_version: i32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new, unverified user ready for insertion
    pub fn new(
        email: &str,
        password_hash: String,
        first_name: &str,
        last_name: &str,
        phone: Option<String>,
        role: UserRole,
        verification_token_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            phone: phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            role,
            is_email_verified: false,
            email_verification_token_hash: Some(verification_token_hash),
            email_verification_expires_at: Some(verification_expiry(now)),
            password_reset_token_hash: None,
            password_reset_expires_at: None,
            mfa_enabled: false,
            mfa_secret: None,
            is_active: true,
            deactivated_at: None,
            failed_login_attempts: 0,
            locked_until: None,
            token_version: 0,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a lockout is in force at `now`
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// MFA secret awaiting confirmation by `/mfa/verify`
    pub fn pending_mfa_secret(&self) -> Option<&str> {
        if self.mfa_enabled {
            None
        } else {
            self.mfa_secret.as_deref()
        }
    }

    /// Secret of an enabled MFA setup. A missing one means the row is
    /// inconsistent, so the caller gets a server error rather than a code check
    /// against an empty secret.
    pub fn active_mfa_secret(&self) -> Result<&str> {
        match self.mfa_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Ok(secret),
            None => {
                tracing::error!(user_id = %self.id, "MFA enabled without a secret");
                Err(Error::Internal("MFA secret missing".to_string()))
            }
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Read model used for token issuing
    pub fn identity(&self) -> AuthIdentity {
        AuthIdentity {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
            is_active: self.is_active,
            token_version: self.token_version,
        }
    }
}

/// Lower-cased, trimmed email used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn verification_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS)
}

pub fn reset_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(RESET_TOKEN_TTL_HOURS)
}

/// Public view of a user
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub mfa_enabled: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            is_email_verified: user.is_email_verified,
            mfa_enabled: user.mfa_enabled,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Refresh-token session
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        user_id: Uuid,
        refresh_token_hash: String,
        user_agent: Option<String>,
        ip_address: Option<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            refresh_token_hash,
            user_agent,
            ip_address,
            created_at: now,
            last_used_at: now,
            expires_at: now + ttl,
            revoked_at: None,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// Session as listed to its owner
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Session the request was made with
    pub current: bool,
}

impl SessionResponse {
    pub fn from_session(session: Session, current_session: Uuid) -> Self {
        Self {
            current: session.id == current_session,
            id: session.id,
            user_agent: session.user_agent,
            ip_address: session.ip_address,
            created_at: session.created_at,
            last_used_at: session.last_used_at,
            expires_at: session.expires_at,
        }
    }
}
