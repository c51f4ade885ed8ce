/// Outgoing mail
///
/// Jobs hand an [`EmailMessage`] to a [`Mailer`]. Three transports exist:
///
/// - [`LogMailer`]: writes the message to the log (default)
/// - [`HttpMailer`]: POSTs the message as JSON to a relay
/// - [`MemoryMailer`]: keeps messages in memory for tests
///
/// # Example
///
/// ```no_run
/// use casho_worker::mail::{EmailMessage, LogMailer, Mailer};
///
/// # async fn example() -> Result<(), casho_worker::mail::MailError> {
/// let mailer = LogMailer;
/// mailer
///     .send(&EmailMessage {
///         from: "noreply@casho.app".to_string(),
///         to: vec!["jane@example.com".to_string()],
///         subject: "Hello".to_string(),
///         body: "Hi Jane".to_string(),
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Mail relay rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Message has no recipients")]
    NoRecipients,
}

/// A plain-text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Transport name for logs
    fn name(&self) -> &str;

    /// Delivers one message
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

fn ensure_recipients(message: &EmailMessage) -> Result<(), MailError> {
    if message.to.is_empty() {
        return Err(MailError::NoRecipients);
    }
    Ok(())
}

/// Logs messages instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        ensure_recipients(message)?;

        tracing::info!(
            to = ?message.to,
            subject = %message.subject,
            body = %message.body,
            "Email (log transport)"
        );

        Ok(())
    }
}

/// Delivers through an HTTP relay that accepts
/// `{"from", "to", "subject", "body"}` JSON
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    url: String,
}

impl HttpMailer {
    pub fn new(url: impl Into<String>) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        ensure_recipients(message)?;

        let response = self.client.post(&self.url).json(message).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to = ?message.to, subject = %message.subject, "Email relayed");
        Ok(())
    }
}

/// Records messages in memory
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first
    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        ensure_recipients(message)?;
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &[&str]) -> EmailMessage {
        EmailMessage {
            from: "noreply@casho.app".to_string(),
            to: to.iter().map(|s| s.to_string()).collect(),
            subject: "Subject".to_string(),
            body: "Body".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_mailer_records_messages() {
        let mailer = MemoryMailer::new();
        mailer.send(&message(&["a@example.com"])).await.unwrap();
        mailer.send(&message(&["b@example.com"])).await.unwrap();

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].to, vec!["b@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_message_without_recipients_is_rejected() {
        assert!(matches!(
            LogMailer.send(&message(&[])).await,
            Err(MailError::NoRecipients)
        ));
        assert!(MemoryMailer::new().send(&message(&[])).await.is_err());
    }
}
