//! Social login providers
//!
//! Only the authorization redirect is handled here. Without credentials in
//! the environment a provider is reported as not configured.

use std::fmt;
use std::str::FromStr;

use kelmah_common::config::env_non_empty;
use kelmah_common::generate_token;

/// Supported identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    Google,
    Facebook,
    LinkedIn,
}

impl OAuthProvider {
    pub const ALL: [OAuthProvider; 3] = [
        OAuthProvider::Google,
        OAuthProvider::Facebook,
        OAuthProvider::LinkedIn,
    ];

    /// Path segment under `/api/auth`
    pub fn slug(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Facebook => "facebook",
            OAuthProvider::LinkedIn => "linkedin",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "Google",
            OAuthProvider::Facebook => "Facebook",
            OAuthProvider::LinkedIn => "LinkedIn",
        }
    }

    fn authorize_endpoint(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            OAuthProvider::Facebook => "https://www.facebook.com/v18.0/dialog/oauth",
            OAuthProvider::LinkedIn => "https://www.linkedin.com/oauth/v2/authorization",
        }
    }

    fn scope(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "openid email profile",
            OAuthProvider::Facebook => "email,public_profile",
            OAuthProvider::LinkedIn => "openid profile email",
        }
    }

    /// Environment variable names holding the client id and secret
    fn env_keys(&self) -> (&'static str, &'static str) {
        match self {
            OAuthProvider::Google => ("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            OAuthProvider::Facebook => ("FACEBOOK_APP_ID", "FACEBOOK_APP_SECRET"),
            OAuthProvider::LinkedIn => ("LINKEDIN_CLIENT_ID", "LINKEDIN_CLIENT_SECRET"),
        }
    }

    /// Message returned when the provider has no credentials
    pub fn not_configured_message(&self) -> String {
        format!(
            "{} authentication is not configured on the server",
            self.display_name()
        )
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OAuthProvider::ALL
            .into_iter()
            .find(|p| p.slug() == s)
            .ok_or_else(|| format!("Unknown OAuth provider: {}", s))
    }
}

/// Client credentials issued by a provider
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Credentials for every provider, `None` when unconfigured
#[derive(Debug, Clone, Default)]
pub struct OAuthSettings {
    pub google: Option<OAuthCredentials>,
    pub facebook: Option<OAuthCredentials>,
    pub linkedin: Option<OAuthCredentials>,
}

impl OAuthSettings {
    /// A provider counts as configured only when both values are non-empty
    pub fn from_env() -> Self {
        let load = |provider: OAuthProvider| {
            let (id_key, secret_key) = provider.env_keys();
            Some(OAuthCredentials {
                client_id: env_non_empty(id_key)?,
                client_secret: env_non_empty(secret_key)?,
            })
        };

        Self {
            google: load(OAuthProvider::Google),
            facebook: load(OAuthProvider::Facebook),
            linkedin: load(OAuthProvider::LinkedIn),
        }
    }

    pub fn credentials(&self, provider: OAuthProvider) -> Option<&OAuthCredentials> {
        match provider {
            OAuthProvider::Google => self.google.as_ref(),
            OAuthProvider::Facebook => self.facebook.as_ref(),
            OAuthProvider::LinkedIn => self.linkedin.as_ref(),
        }
    }
}

/// Callback URL registered with the provider
pub fn callback_url(api_base_url: &str, provider: OAuthProvider) -> String {
    format!(
        "{}/api/auth/{}/callback",
        api_base_url.trim_end_matches('/'),
        provider.slug()
    )
}

/// Authorization URL plus the random `state` value it carries
pub fn authorize_url(
    provider: OAuthProvider,
    credentials: &OAuthCredentials,
    redirect_uri: &str,
) -> (String, String) {
    let state = generate_token();
    let url = format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
        provider.authorize_endpoint(),
        percent_encode(&credentials.client_id),
        percent_encode(redirect_uri),
        percent_encode(provider.scope()),
        state,
    );
    (url, state)
}

/// RFC 3986 percent-encoding of everything outside the unreserved set
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
