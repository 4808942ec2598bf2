//! Outbound notifications: Discord room webhooks and email.
//!
//! Services collect [`Notification`]s while their transaction runs; the HTTP layer hands
//! them to [`Notifier::dispatch`] after the commit. Delivery never affects the request.

mod discord;
mod email;

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

pub use discord::{DiscordClient, DiscordPayload, Embed, EMBED_COLOR};
pub use email::{
    login_otp_email, mailer_from_config, room_invite_email, verification_email, EmailMessage,
    LogMailer, Mailer, MemoryMailer, SmtpMailer,
};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook responded with status {0}")]
    Status(u16),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// A message to deliver once the primary write is committed.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Same payload posted to every listed webhook URL
    Discord {
        urls: Vec<String>,
        payload: DiscordPayload,
    },
    Email(EmailMessage),
}

impl Notification {
    /// Discord message for a room, or `None` when the room has no webhooks.
    pub fn room(urls: Vec<String>, payload: DiscordPayload) -> Option<Self> {
        if urls.is_empty() {
            None
        } else {
            Some(Notification::Discord { urls, payload })
        }
    }
}

/// Fire-and-forget delivery of notifications.
#[derive(Clone)]
pub struct Notifier {
    discord: DiscordClient,
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(discord: DiscordClient, mailer: Arc<dyn Mailer>) -> Self {
        Self { discord, mailer }
    }

    /// Delivers every notification and waits for the outcome. Failures are logged.
    pub async fn deliver(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            match notification {
                Notification::Discord { urls, payload } => {
                    self.discord.broadcast(&urls, &payload).await;
                }
                Notification::Email(message) => {
                    if let Err(e) = self.mailer.send(&message).await {
                        warn!("Failed to send email to {}: {}", message.to, e);
                    }
                }
            }
        }
    }

    /// Spawns [`Notifier::deliver`] on the runtime and returns immediately.
    pub fn dispatch(&self, notifications: Vec<Notification>) {
        if notifications.is_empty() {
            return;
        }
        let notifier = self.clone();
        tokio::spawn(async move { notifier.deliver(notifications).await });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_notification_skips_rooms_without_webhooks() {
        assert!(Notification::room(Vec::new(), DiscordPayload::text("hi")).is_none());
        assert!(Notification::room(vec!["https://x.io/h".to_string()], DiscordPayload::text("hi")).is_some());
    }

    #[tokio::test]
    async fn test_deliver_swallows_failures_and_sends_email() {
        let mailer = Arc::new(MemoryMailer::default());
        let notifier = Notifier::new(DiscordClient::new().unwrap(), mailer.clone());

        notifier
            .deliver(vec![
                Notification::Discord {
                    // nothing listens on port 9
                    urls: vec!["http://127.0.0.1:9/webhook".to_string()],
                    payload: DiscordPayload::text("unreachable"),
                },
                Notification::Email(verification_email("a@x.io", "ABC123")),
            ])
            .await;

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("ABC123"));
    }
}
