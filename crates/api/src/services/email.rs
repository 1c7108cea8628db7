//! Transactional email: verification codes and password reset links.
//!
//! Messages are rendered from Askama templates (HTML and plain text) and
//! delivered over SMTP via lettre. Without SMTP configuration the [`Mailer`]
//! logs the message instead, which is what local development uses.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use davila_core::Email;
use davila_core::verification::CODE_TTL;

use crate::config::EmailConfig;
use crate::services::password_reset::RESET_TOKEN_DAYS;

#[derive(Template)]
#[template(path = "email/verification_code.html")]
struct VerificationCodeHtml<'a> {
    code: &'a str,
    ttl_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/verification_code.txt")]
struct VerificationCodeText<'a> {
    code: &'a str,
    ttl_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    reset_url: &'a str,
    valid_days: i64,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    reset_url: &'a str,
    valid_days: i64,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Outgoing mail channel.
#[derive(Clone)]
pub enum Mailer {
    /// Deliver through an SMTP relay.
    Smtp(SmtpMailer),
    /// Write the message to the log. Used when SMTP is not configured.
    Log,
}

impl Mailer {
    /// Build the mailer from optional SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn from_config(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        match config {
            Some(config) => Ok(Self::Smtp(SmtpMailer::new(config)?)),
            None => {
                tracing::warn!("SMTP not configured, emails will be logged instead of sent");
                Ok(Self::Log)
            }
        }
    }

    /// Send a registration verification code.
    ///
    /// # Errors
    ///
    /// Returns error if the template fails to render or delivery fails.
    pub async fn send_verification_code(&self, to: &Email, code: &str) -> Result<(), MailError> {
        let ttl_minutes = CODE_TTL.num_minutes();
        let html = VerificationCodeHtml { code, ttl_minutes }.render()?;
        let text = VerificationCodeText { code, ttl_minutes }.render()?;

        self.deliver(to, "Código de verificación - Davila Tienda", &text, &html)
            .await
    }

    /// Send a password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if the template fails to render or delivery fails.
    pub async fn send_password_reset(&self, to: &Email, reset_url: &str) -> Result<(), MailError> {
        let valid_days = RESET_TOKEN_DAYS;
        let html = PasswordResetHtml {
            reset_url,
            valid_days,
        }
        .render()?;
        let text = PasswordResetText {
            reset_url,
            valid_days,
        }
        .render()?;

        self.deliver(to, "Recuperación de contraseña - Davila Tienda", &text, &html)
            .await
    }

    async fn deliver(
        &self,
        to: &Email,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), MailError> {
        match self {
            Self::Smtp(smtp) => {
                smtp.send_multipart_email(to.as_str(), subject, text_body, html_body)
                    .await
            }
            Self::Log => {
                tracing::info!(to = %to, subject = %subject, body = %text_body, "Email not sent (SMTP disabled)");
                Ok(())
            }
        }
    }
}

/// SMTP delivery through lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.transport.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_templates_include_code_and_ttl() {
        let html = VerificationCodeHtml {
            code: "482913",
            ttl_minutes: 10,
        }
        .render()
        .unwrap();
        let text = VerificationCodeText {
            code: "482913",
            ttl_minutes: 10,
        }
        .render()
        .unwrap();

        assert!(html.contains("482913"));
        assert!(text.contains("482913"));
        assert!(text.contains("10 minutos"));
    }

    #[test]
    fn test_password_reset_text_keeps_url_verbatim() {
        let url = "http://localhost:3000/reset-password?uid=MQ&token=abc-123";
        let text = PasswordResetText {
            reset_url: url,
            valid_days: 3,
        }
        .render()
        .unwrap();
        assert!(text.contains(url));
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_messages() {
        let to = Email::parse("cliente@example.com").unwrap();
        Mailer::Log
            .send_verification_code(&to, "123456")
            .await
            .unwrap();
    }
}
