//! In-memory email capture
//!
//! Used by default in development and by the integration tests, which read
//! verification and reset tokens back out of the captured links.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use kelmah_common::config::DEFAULT_FRONTEND_URL;

use crate::{EmailError, EmailKind, EmailMessage, EmailReceipt, EmailService, DEFAULT_FROM};

#[derive(Debug, Clone)]
pub struct CapturedEmail {
    pub message: EmailMessage,
    pub receipt: EmailReceipt,
    pub captured_at: DateTime<Utc>,
}

impl CapturedEmail {
    /// Token from the first `/{path}/{token}` link in either body
    pub fn link_token(&self, path: &str) -> Option<String> {
        let pattern = format!(r"/{}/([A-Za-z0-9_-]+)", regex::escape(path));
        let re = regex::Regex::new(&pattern).ok()?;

        std::iter::once(self.message.body_text.as_str())
            .chain(self.message.body_html.as_deref())
            .find_map(|body| re.captures(body))
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Token carried by this email's own link
    pub fn token(&self) -> Option<String> {
        self.message.kind().and_then(|kind| self.link_token(kind.link_path()))
    }
}

/// Captures every email instead of sending it. Clones share the mailbox.
#[derive(Debug, Clone)]
pub struct MockEmailService {
    mailbox: Arc<Mutex<Vec<CapturedEmail>>>,
    app_base_url: String,
    enabled: bool,
}

fn lock(mailbox: &Mutex<Vec<CapturedEmail>>) -> MutexGuard<'_, Vec<CapturedEmail>> {
    mailbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_FRONTEND_URL.to_string())
    }

    pub fn with_base_url(app_base_url: String) -> Self {
        Self {
            mailbox: Arc::new(Mutex::new(Vec::new())),
            app_base_url,
            enabled: true,
        }
    }

    /// Accepts sends without capturing anything
    pub fn new_disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn sent(&self) -> Vec<CapturedEmail> {
        lock(&self.mailbox).clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<CapturedEmail> {
        lock(&self.mailbox)
            .iter()
            .filter(|e| e.message.to == recipient)
            .cloned()
            .collect()
    }

    /// Most recent email of `kind` sent to `recipient`
    pub fn latest(&self, recipient: &str, kind: EmailKind) -> Option<CapturedEmail> {
        lock(&self.mailbox)
            .iter()
            .rev()
            .find(|e| e.message.to == recipient && e.message.kind() == Some(kind))
            .cloned()
    }

    pub fn latest_verification_token(&self, recipient: &str) -> Option<String> {
        self.latest(recipient, EmailKind::Verification)?.token()
    }

    pub fn latest_reset_token(&self, recipient: &str) -> Option<String> {
        self.latest(recipient, EmailKind::PasswordReset)?.token()
    }

    pub fn email_count(&self) -> usize {
        lock(&self.mailbox).len()
    }

    pub fn clear(&self) {
        lock(&self.mailbox).clear();
    }
}

impl Default for MockEmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EmailService for MockEmailService {
    async fn send_email(&self, message: EmailMessage) -> Result<EmailReceipt, EmailError> {
        let provider = if self.enabled { "mock" } else { "mock-disabled" };
        let receipt = EmailReceipt {
            message_id: format!("{provider}-{}", Uuid::new_v4()),
            sent_at: Utc::now(),
            provider: provider.to_string(),
            metadata: message.metadata.clone(),
        };

        if !self.enabled {
            tracing::debug!(to = %message.to, "Email delivery disabled, dropping message");
            return Ok(receipt);
        }

        tracing::info!(
            to = %message.to,
            email_type = message.kind().map_or("other", |k| k.as_str()),
            "Captured email"
        );

        lock(&self.mailbox).push(CapturedEmail {
            message,
            receipt: receipt.clone(),
            captured_at: receipt.sent_at,
        });

        Ok(receipt)
    }

    fn default_from(&self) -> String {
        DEFAULT_FROM.to_string()
    }

    fn app_base_url(&self) -> &str {
        &self.app_base_url
    }
}
