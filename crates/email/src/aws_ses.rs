//! Amazon SES delivery
//!
//! `AWS_ENDPOINT_URL` switches the client to a LocalStack-style endpoint with
//! static dummy credentials; without it the default AWS credential chain is
//! used.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_ses::config::SharedCredentialsProvider;
use aws_sdk_ses::types::{Body, Content, Destination, Message};
use aws_sdk_ses::Client as SesClient;
use chrono::Utc;

use crate::{EmailConfig, EmailError, EmailMessage, EmailReceipt, EmailService};

const DEFAULT_REGION: &str = "us-east-1";
const CHARSET: &str = "UTF-8";
const PROVIDER: &str = "aws-ses";

pub struct SesEmailService {
    client: SesClient,
    default_from: String,
    app_base_url: String,
}

async fn load_sdk_config(config: &EmailConfig) -> SdkConfig {
    let region = Region::new(
        config
            .aws_region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
    );
    let loader = aws_config::defaults(BehaviorVersion::latest()).region(region);

    match config.aws_endpoint_url.as_deref() {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "Using custom SES endpoint");
            let credentials = Credentials::new("test", "test", None, None, "kelmah-local-ses");
            loader
                .endpoint_url(endpoint)
                .credentials_provider(SharedCredentialsProvider::new(credentials))
                .load()
                .await
        }
        None => loader.load().await,
    }
}

fn utf8(data: &str, part: &str) -> Result<Content, EmailError> {
    Content::builder()
        .data(data)
        .charset(CHARSET)
        .build()
        .map_err(|e| EmailError::AwsSes(format!("Invalid {part}: {e}")))
}

/// SES message with a text body and an optional HTML alternative
fn to_ses_message(message: &EmailMessage) -> Result<Message, EmailError> {
    let mut body = Body::builder().text(utf8(&message.body_text, "text body")?);
    if let Some(html) = message.body_html.as_deref() {
        body = body.html(utf8(html, "HTML body")?);
    }

    Ok(Message::builder()
        .subject(utf8(&message.subject, "subject")?)
        .body(body.build())
        .build())
}

fn looks_like_address(address: &str) -> bool {
    matches!(address.split_once('@'), Some((local, domain)) if !local.is_empty() && !domain.is_empty())
}

impl SesEmailService {
    pub async fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let sdk_config = load_sdk_config(&config).await;

        Ok(Self {
            client: SesClient::new(&sdk_config),
            default_from: config.default_from,
            app_base_url: config.app_base_url,
        })
    }
}

#[async_trait::async_trait]
impl EmailService for SesEmailService {
    async fn send_email(&self, message: EmailMessage) -> Result<EmailReceipt, EmailError> {
        if !looks_like_address(&message.to) || !looks_like_address(&message.from) {
            return Err(EmailError::Validation(format!(
                "Cannot send from {:?} to {:?}",
                message.from, message.to
            )));
        }

        let mut request = self
            .client
            .send_email()
            .source(&message.from)
            .destination(Destination::builder().to_addresses(&message.to).build())
            .message(to_ses_message(&message)?);
        if let Some(reply_to) = &message.reply_to {
            request = request.reply_to_addresses(reply_to);
        }

        let output = request
            .send()
            .await
            .map_err(|e| EmailError::AwsSes(e.to_string()))?;
        let message_id = output.message_id().to_string();

        tracing::info!(
            message_id = %message_id,
            email_type = message.kind().map_or("other", |k| k.as_str()),
            "Email sent via SES"
        );

        Ok(EmailReceipt {
            message_id,
            sent_at: Utc::now(),
            provider: PROVIDER.to_string(),
            metadata: message.metadata,
        })
    }

    fn default_from(&self) -> String {
        self.default_from.clone()
    }

    fn app_base_url(&self) -> &str {
        &self.app_base_url
    }
}
