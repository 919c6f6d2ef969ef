//! Outbound mail.
//!
//! Mail leaves the process through an HTTP relay (`MAIL_RELAY_URL`), which
//! owns SMTP. Without a relay, [`LogMailer`] records what would have been
//! sent.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Relay request timeout.
const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail relay unreachable: {0}")]
    Delivery(#[from] reqwest::Error),

    #[error("Mail relay rejected message: {status} {body}")]
    Rejected { status: u16, body: String },
}

/// A single plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Posts messages as JSON to a mail relay.
pub struct HttpRelayMailer {
    client: Client,
    url: String,
    token: Option<String>,
    from: String,
}

impl HttpRelayMailer {
    pub fn new(url: impl Into<String>, token: Option<String>, from: impl Into<String>) -> Result<Self, MailError> {
        let client = Client::builder().timeout(RELAY_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
            from: from.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let mut request = self.client.post(&self.url).json(&RelayRequest {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        });
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(MailError::Rejected { status, body });
        }
        debug!(to = %message.to, "mail relayed");
        Ok(())
    }
}

/// Logs messages instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        info!(to = %message.to, subject = %message.subject, "no mail relay configured, message not sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        let message = MailMessage {
            to: "x@example.com".into(),
            subject: "s".into(),
            body: "b".into(),
        };
        assert!(LogMailer.send(&message).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_relay_is_a_delivery_error() {
        let mailer = HttpRelayMailer::new("http://127.0.0.1:9/send", None, "noreply@lectern.test").unwrap();
        let message = MailMessage {
            to: "x@example.com".into(),
            subject: "s".into(),
            body: "b".into(),
        };
        assert!(matches!(mailer.send(&message).await, Err(MailError::Delivery(_))));
    }
}
