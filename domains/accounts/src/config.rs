//! Accounts configuration loaded from the environment

use chrono::Duration;

use kelmah_common::config::{env_flag, env_non_empty, env_or, frontend_url};

use crate::domain::oauth::OAuthSettings;
use crate::domain::password::DEFAULT_BCRYPT_COST;

/// Knobs for registration, login and session handling
#[derive(Debug, Clone)]
pub struct AccountsConfig {
    /// Refuse logins until the email address is verified
    pub require_email_verification: bool,
    pub bcrypt_cost: u32,
    /// Issuer label shown by authenticator apps
    pub mfa_issuer: String,
    pub refresh_token_ttl_days: i64,
    pub remember_me_ttl_days: i64,
    pub frontend_url: String,
    pub api_base_url: String,
    pub oauth: OAuthSettings,
    /// Record the client IP from proxy headers instead of the socket peer
    pub trust_proxy: bool,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            require_email_verification: true,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            mfa_issuer: "Kelmah".to_string(),
            refresh_token_ttl_days: 7,
            remember_me_ttl_days: 30,
            frontend_url: kelmah_common::config::DEFAULT_FRONTEND_URL.to_string(),
            api_base_url: "http://localhost:3000".to_string(),
            oauth: OAuthSettings::default(),
            trust_proxy: false,
        }
    }
}

impl AccountsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            require_email_verification: env_flag(
                "REQUIRE_EMAIL_VERIFICATION",
                defaults.require_email_verification,
            ),
            bcrypt_cost: env_or("BCRYPT_COST", defaults.bcrypt_cost).clamp(4, 31),
            mfa_issuer: env_non_empty("MFA_ISSUER").unwrap_or(defaults.mfa_issuer),
            refresh_token_ttl_days: env_or("REFRESH_TOKEN_TTL_DAYS", defaults.refresh_token_ttl_days),
            remember_me_ttl_days: env_or("REMEMBER_ME_TTL_DAYS", defaults.remember_me_ttl_days),
            frontend_url: frontend_url(),
            api_base_url: env_non_empty("API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            oauth: OAuthSettings::from_env(),
            trust_proxy: env_flag("TRUST_PROXY", defaults.trust_proxy),
        }
    }

    /// Refresh-token lifetime for a new session
    pub fn session_ttl(&self, remember_me: bool) -> Duration {
        if remember_me {
            Duration::days(self.remember_me_ttl_days)
        } else {
            Duration::days(self.refresh_token_ttl_days)
        }
    }
}
