//! Shared email content templates
//!
//! Canonical content generators for account emails, used by both
//! production (SES) and mock email services.

use crate::EmailKind;

/// Wrap body paragraphs and an optional call-to-action in the Kelmah layout.
fn layout_html(heading: &str, paragraphs: &[String], action: Option<(&str, &str)>) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("                    <p>{}</p>\n", p))
        .collect();

    let button = match action {
        Some((label, url)) => format!(
            r#"
                    <div style="text-align: center; margin: 30px 0;">
                        <a href="{url}"
                           style="background-color: #1a7f37; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; display: inline-block; font-weight: bold;">
                            {label}
                        </a>
                    </div>

                    <p>Or copy and paste this link in your browser:</p>
                    <p style="background-color: #f5f5f5; padding: 10px; border-radius: 4px; word-break: break-all;">
                        <a href="{url}">{url}</a>
                    </p>
"#,
            url = url,
            label = label
        ),
        None => String::new(),
    };

    format!(
        r#"
            <html>
            <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
                <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
                    <h2 style="color: #1a7f37;">{heading}</h2>
{body}{button}
                    <hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">

                    <p style="color: #666; font-size: 12px;">
                        Thanks, The Kelmah Team
                    </p>
                </div>
            </body>
            </html>
            "#,
        heading = heading,
        body = body,
        button = button
    )
}

/// Plain-text body for the email verification message.
pub fn verification_text(first_name: &str, verify_url: &str) -> String {
    format!(
        "Hi {},\n\n\
        Welcome to Kelmah! Please confirm your email address by opening the link below:\n\
        {}\n\n\
        This link will expire in 24 hours.\n\n\
        If you did not create a Kelmah account, you can ignore this email.\n\n\
        Thanks,\n\
        The Kelmah Team",
        first_name, verify_url
    )
}

/// HTML body for the email verification message.
pub fn verification_html(first_name: &str, verify_url: &str) -> String {
    layout_html(
        "Confirm your email address",
        &[
            format!("Hi {},", first_name),
            "Welcome to Kelmah! Please confirm your email address to finish setting up your account.".to_string(),
            "<em>This link will expire in 24 hours.</em>".to_string(),
        ],
        Some(("Verify Email", verify_url)),
    )
}

/// Plain-text body for the password reset message.
pub fn password_reset_text(first_name: &str, reset_url: &str) -> String {
    format!(
        "Hi {},\n\n\
        We received a request to reset your Kelmah password. Open the link below to choose a new one:\n\
        {}\n\n\
        This link will expire in 1 hour.\n\n\
        If you did not request a reset, you can ignore this email and your password will stay the same.\n\n\
        Thanks,\n\
        The Kelmah Team",
        first_name, reset_url
    )
}

/// HTML body for the password reset message.
pub fn password_reset_html(first_name: &str, reset_url: &str) -> String {
    layout_html(
        "Reset your password",
        &[
            format!("Hi {},", first_name),
            "We received a request to reset your Kelmah password.".to_string(),
            "<em>This link will expire in 1 hour.</em> If you did not request a reset, you can ignore this email.".to_string(),
        ],
        Some(("Reset Password", reset_url)),
    )
}

/// Plain-text body for the password-changed notice.
pub fn password_changed_text(first_name: &str, recovery_url: &str) -> String {
    format!(
        "Hi {},\n\n\
        The password for your Kelmah account was just changed and your other sessions were signed out.\n\n\
        If this was not you, reset your password immediately:\n\
        {}\n\n\
        Thanks,\n\
        The Kelmah Team",
        first_name, recovery_url
    )
}

/// HTML body for the password-changed notice.
pub fn password_changed_html(first_name: &str, recovery_url: &str) -> String {
    layout_html(
        "Your password was changed",
        &[
            format!("Hi {},", first_name),
            "The password for your Kelmah account was just changed and your other sessions were signed out.".to_string(),
            "If this was not you, reset your password immediately.".to_string(),
        ],
        Some(("Reset Password", recovery_url)),
    )
}

/// Plain-text and HTML bodies for an account email
pub fn render(kind: EmailKind, first_name: &str, url: &str) -> (String, String) {
    match kind {
        EmailKind::Verification => (
            verification_text(first_name, url),
            verification_html(first_name, url),
        ),
        EmailKind::PasswordReset => (
            password_reset_text(first_name, url),
            password_reset_html(first_name, url),
        ),
        EmailKind::PasswordChanged => (
            password_changed_text(first_name, url),
            password_changed_html(first_name, url),
        ),
    }
}
