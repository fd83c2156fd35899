//! Authentication configuration

use kelmah_common::config::{env_non_empty, env_or};

/// Default access token lifetime (15 minutes)
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 900;

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub access_token_ttl_secs: i64,
}

impl AuthConfig {
    /// Build from `JWT_SECRET`, `JWT_ISSUER`, `JWT_AUDIENCE` and `ACCESS_TOKEN_TTL_SECS`
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env_non_empty("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        Ok(Self {
            jwt_secret,
            issuer: env_non_empty("JWT_ISSUER"),
            audience: env_non_empty("JWT_AUDIENCE"),
            access_token_ttl_secs: env_or("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)
                .max(1),
        })
    }

    /// Config with a fixed secret and defaults, for tests and tooling
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            issuer: None,
            audience: None,
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
        }
    }
}
