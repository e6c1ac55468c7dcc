//! Email sending
//!
//! Outbound mail is fire-and-forget: callers queue a message on a
//! background task and failures are logged, never surfaced to the request
//! that triggered the send. The `Mailer` trait keeps the SMTP transport
//! swappable in tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::config::MailConfig;

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a single HTML message.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// SMTP mailer backed by lettre.
///
/// With no SMTP host configured, delivery is disabled and message bodies
/// are logged instead, which keeps local development working without a
/// relay.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    /// Create a boxed mailer for use with dependency injection
    pub fn boxed(config: MailConfig) -> Arc<dyn Mailer> {
        Arc::new(Self::new(config))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        if self.config.smtp_host.is_empty() {
            tracing::info!(to, subject, body = html_body, "SMTP disabled, logging mail");
            return Ok(());
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from_address);

        let email = Message::builder()
            .from(from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
                .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
                .credentials(creds)
                .port(self.config.smtp_port)
                .build();

        mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }
}

/// Queue a message on a background task; log on failure.
pub fn send_in_background(mailer: Arc<dyn Mailer>, to: String, subject: String, html_body: String) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&to, &subject, &html_body).await {
            tracing::error!(to, subject, "Failed to send email: {}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_smtp_logs_instead_of_failing() {
        let mailer = SmtpMailer::new(MailConfig::default());
        let result = mailer
            .send("user@example.com", "Hello", "<p>body</p>")
            .await;
        assert!(result.is_ok());
    }
}
