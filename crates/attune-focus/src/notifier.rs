//! User-visible notifications.

use async_trait::async_trait;
use attune_types::{Timestamp, now};
use futures::future::try_join_all;
use tracing::info;
use uuid::Uuid;

/// Maximum title length, in bytes.
pub const MAX_TITLE_LEN: usize = 255;
/// Maximum message length, in bytes.
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Delivery channel of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Push,
    InApp,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Push => "push",
            NotificationKind::InApp => "in_app",
        }
    }
}

/// Error type for notifications.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The notification failed validation.
    #[error("Invalid notification: {0}")]
    Invalid(&'static str),

    /// Delivery failed.
    #[error("Notification to '{recipient}' failed: {reason}")]
    Delivery { recipient: String, reason: String },
}

/// A validated notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub recipient: String,
    pub title: String,
    pub message: String,
    pub issued_at: Timestamp,
}

impl Notification {
    /// Build a notification, rejecting an empty recipient and empty or
    /// oversized title and message.
    pub fn new(
        kind: NotificationKind,
        recipient: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let recipient = recipient.into();
        let title = title.into();
        let message = message.into();

        if recipient.is_empty() {
            return Err(NotifyError::Invalid("recipient is required"));
        }
        if title.is_empty() || title.len() > MAX_TITLE_LEN {
            return Err(NotifyError::Invalid(
                "title is required and must be at most 255 bytes",
            ));
        }
        if message.is_empty() || message.len() > MAX_MESSAGE_LEN {
            return Err(NotifyError::Invalid(
                "message is required and must be at most 1024 bytes",
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            recipient,
            title,
            message,
            issued_at: now(),
        })
    }
}

/// Delivers notifications to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Deliver several notifications concurrently. Fails if any delivery fails.
    async fn send_batch(&self, notifications: &[Notification]) -> Result<(), NotifyError> {
        try_join_all(notifications.iter().map(|n| self.send(n))).await?;
        Ok(())
    }
}

/// Notifier that writes notifications to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            recipient = %notification.recipient,
            kind = notification.kind.as_str(),
            title = %notification.title,
            message = %notification.message,
            "Notification sent"
        );
        Ok(())
    }
}
