//! Kelmah account email
//!
//! `EmailService` has two implementations: Amazon SES for real delivery and an
//! in-memory mock that integration tests read tokens back from. Account emails
//! (verification, password reset, password changed) are provided trait
//! methods, so every implementation builds the same links and bodies.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kelmah_common::config::{env_flag, env_non_empty, frontend_url};

pub mod aws_ses;
pub mod content;
pub mod mock;

pub use mock::MockEmailService;

/// Metadata key naming the kind of email
pub const EMAIL_TYPE: &str = "email_type";

const DEFAULT_FROM: &str = "no-reply@kelmah.com";

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Email configuration error: {0}")]
    Configuration(String),

    #[error("Email validation error: {0}")]
    Validation(String),

    #[error("AWS SES error: {0}")]
    AwsSes(String),
}

/// Account emails sent by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmailKind {
    Verification,
    PasswordReset,
    PasswordChanged,
}

impl EmailKind {
    pub const ALL: [EmailKind; 3] = [
        EmailKind::Verification,
        EmailKind::PasswordReset,
        EmailKind::PasswordChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::Verification => "email_verification",
            EmailKind::PasswordReset => "password_reset",
            EmailKind::PasswordChanged => "password_changed",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            EmailKind::Verification => "Verify your Kelmah email address",
            EmailKind::PasswordReset => "Reset your Kelmah password",
            EmailKind::PasswordChanged => "Your Kelmah password was changed",
        }
    }

    /// Frontend route the email links to
    pub fn link_path(&self) -> &'static str {
        match self {
            EmailKind::Verification => "verify-email",
            EmailKind::PasswordReset => "reset-password",
            EmailKind::PasswordChanged => "forgot-password",
        }
    }
}

impl fmt::Display for EmailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailKind {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EmailError::Validation(format!("Unknown email type: {s}")))
    }
}

/// Outgoing email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl EmailMessage {
    pub fn new(
        to: impl Into<String>,
        from: impl Into<String>,
        subject: impl Into<String>,
        body_text: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            reply_to: None,
            subject: subject.into(),
            body_text: body_text.into(),
            body_html: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_html(mut self, body_html: impl Into<String>) -> Self {
        self.body_html = Some(body_html.into());
        self
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_kind(self, kind: EmailKind) -> Self {
        self.with_metadata(EMAIL_TYPE, kind.as_str())
    }

    /// Kind recorded by `with_kind`, if any
    pub fn kind(&self) -> Option<EmailKind> {
        self.metadata.get(EMAIL_TYPE)?.parse().ok()
    }
}

/// Delivery receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailReceipt {
    pub message_id: String,
    pub sent_at: DateTime<Utc>,
    pub provider: String,
    pub metadata: HashMap<String, String>,
}

/// Delivery backend selected by `EMAIL_PROVIDER`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailProvider {
    Ses,
    #[default]
    Mock,
}

impl FromStr for EmailProvider {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ses" | "aws-ses" => Ok(EmailProvider::Ses),
            "mock" => Ok(EmailProvider::Mock),
            other => Err(EmailError::Configuration(format!(
                "Unknown email provider: {other}. Supported providers: ses, mock"
            ))),
        }
    }
}

impl fmt::Display for EmailProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailProvider::Ses => write!(f, "ses"),
            EmailProvider::Mock => write!(f, "mock"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    pub aws_region: Option<String>,
    /// Custom endpoint, e.g. LocalStack
    pub aws_endpoint_url: Option<String>,
    pub default_from: String,
    /// When false nothing is delivered or captured
    pub enabled: bool,
    /// SPA origin used to build links
    pub app_base_url: String,
}

impl EmailConfig {
    pub fn from_env() -> Result<Self, EmailError> {
        let provider = env_non_empty("EMAIL_PROVIDER")
            .map(|p| p.parse())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            provider,
            aws_region: env_non_empty("AWS_REGION"),
            aws_endpoint_url: env_non_empty("AWS_ENDPOINT_URL"),
            default_from: env_non_empty("FROM_EMAIL").unwrap_or_else(|| DEFAULT_FROM.to_string()),
            enabled: env_flag("EMAIL_ENABLED", true),
            app_base_url: frontend_url(),
        })
    }
}

#[async_trait::async_trait]
pub trait EmailService: Send + Sync {
    async fn send_email(&self, message: EmailMessage) -> Result<EmailReceipt, EmailError>;

    fn default_from(&self) -> String;

    /// SPA origin, without a trailing slash
    fn app_base_url(&self) -> &str;

    /// Frontend link for `kind`, carrying `token` when the flow needs one
    fn account_link(&self, kind: EmailKind, token: Option<&str>) -> String {
        let base = self.app_base_url().trim_end_matches('/');
        match token {
            Some(token) => format!("{base}/{}/{token}", kind.link_path()),
            None => format!("{base}/{}", kind.link_path()),
        }
    }

    /// Render and send one of the account emails
    async fn send_account_email(
        &self,
        kind: EmailKind,
        recipient_email: &str,
        first_name: &str,
        token: Option<&str>,
    ) -> Result<EmailReceipt, EmailError> {
        let url = self.account_link(kind, token);
        let (text, html) = content::render(kind, first_name, &url);

        let message = EmailMessage::new(recipient_email, self.default_from(), kind.subject(), text)
            .with_html(html)
            .with_kind(kind);

        self.send_email(message).await
    }

    async fn send_verification_email(
        &self,
        recipient_email: &str,
        first_name: &str,
        token: &str,
    ) -> Result<EmailReceipt, EmailError> {
        self.send_account_email(EmailKind::Verification, recipient_email, first_name, Some(token))
            .await
    }

    async fn send_password_reset_email(
        &self,
        recipient_email: &str,
        first_name: &str,
        token: &str,
    ) -> Result<EmailReceipt, EmailError> {
        self.send_account_email(EmailKind::PasswordReset, recipient_email, first_name, Some(token))
            .await
    }

    /// The link points at the forgot-password page in case the change was not theirs
    async fn send_password_changed_email(
        &self,
        recipient_email: &str,
        first_name: &str,
    ) -> Result<EmailReceipt, EmailError> {
        self.send_account_email(EmailKind::PasswordChanged, recipient_email, first_name, None)
            .await
    }
}

pub struct EmailServiceFactory;

impl EmailServiceFactory {
    pub async fn create(config: EmailConfig) -> Result<Box<dyn EmailService>, EmailError> {
        if !config.enabled {
            tracing::info!("Email delivery disabled");
            return Ok(Box::new(MockEmailService::new_disabled()));
        }

        tracing::info!(provider = %config.provider, "Creating email service");
        let service: Box<dyn EmailService> = match config.provider {
            EmailProvider::Ses => Box::new(aws_ses::SesEmailService::new(config).await?),
            EmailProvider::Mock => Box::new(MockEmailService::with_base_url(config.app_base_url)),
        };
        Ok(service)
    }
}
