//! Email sender abstraction.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::debug;

use crate::{MailError, Result};

/// Delivers a single HTML message to one recipient.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send `body` (HTML) with `subject` to `recipient`.
    async fn send_message(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// A message captured by [`MemorySender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Keeps messages in memory instead of delivering them.
///
/// Recipients marked with [`MemorySender::reject`] fail with
/// [`MailError::Rejected`].
///
/// ```
/// use skybell_mail::{EmailSender, MemorySender};
///
/// # tokio_test::block_on(async {
/// let sender = MemorySender::new();
/// sender.reject("bounce@example.com");
///
/// sender.send_message("alice@example.com", "Hi", "<p>Hello</p>").await.unwrap();
/// assert!(sender.send_message("bounce@example.com", "Hi", "<p>Hello</p>").await.is_err());
/// assert_eq!(sender.recipients(), ["alice@example.com"]);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemorySender {
    sent: Mutex<Vec<SentMessage>>,
    rejected: Mutex<HashSet<String>>,
}

impl MemorySender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `recipient` fail.
    pub fn reject(&self, recipient: impl Into<String>) {
        self.rejected.lock().insert(recipient.into());
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Recipients of accepted messages, in send order.
    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.recipient.clone()).collect()
    }
}

#[async_trait]
impl EmailSender for MemorySender {
    async fn send_message(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        if self.rejected.lock().contains(recipient) {
            return Err(MailError::Rejected {
                recipient: recipient.to_string(),
                reason: "recipient rejected".to_string(),
            });
        }

        debug!(to = recipient, subject, "Captured email");
        self.sent.lock().push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
