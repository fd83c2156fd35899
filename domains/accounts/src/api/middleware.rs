//! Accounts domain state and request metadata

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::USER_AGENT, request::Parts},
};
use kelmah_auth::AuthBackend;
use kelmah_email::EmailService;

use crate::config::AccountsConfig;
use crate::AccountsRepositories;

/// Application state for the Accounts domain
#[derive(Clone)]
pub struct AccountsState {
    pub repos: AccountsRepositories,
    pub auth: AuthBackend,
    pub email: Arc<dyn EmailService>,
    pub config: Arc<AccountsConfig>,
}

impl FromRef<AccountsState> for AuthBackend {
    fn from_ref(state: &AccountsState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AccountsState> for Arc<AccountsConfig> {
    fn from_ref(state: &AccountsState) -> Self {
        state.config.clone()
    }
}

/// Longest user agent stored with a session
const MAX_USER_AGENT_LEN: usize = 512;

/// Caller details recorded on new sessions
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl<S> FromRequestParts<S> for ClientMeta
where
    Arc<AccountsConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let trust_proxy = Arc::<AccountsConfig>::from_ref(state).trust_proxy;

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect::<String>())
            .filter(|ua| !ua.is_empty());

        Ok(ClientMeta {
            user_agent,
            ip_address: kelmah_common::client_ip(&parts.headers, &parts.extensions, trust_proxy),
        })
    }
}
