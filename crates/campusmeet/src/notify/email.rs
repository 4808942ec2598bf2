/// Email delivery: SMTP through lettre, or logging when no relay is configured
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::{Arc, Mutex};
use tracing::info;

use super::NotifyError;
use crate::config::SmtpConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Writes messages to the log instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        info!(
            "SMTP not configured; email to {} ({}):\n{}",
            message.to, message.subject, message.body
        );
        Ok(())
    }
}

/// Keeps every message in memory. Lets tests read the codes that were mailed out.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotifyError::Smtp(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let builder = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => builder.credentials(Credentials::new(user.clone(), pass.clone())),
            _ => builder,
        };

        let from = config
            .from
            .parse()
            .map_err(|e| NotifyError::Address(format!("{}: {}", config.from, e)))?;

        Ok(Self {
            transport: builder.port(config.port).build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| NotifyError::Address(format!("{}: {}", message.to, e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        info!("Sent \"{}\" to {}", message.subject, message.to);
        Ok(())
    }
}

/// SMTP when a relay is configured, logging otherwise.
pub fn mailer_from_config(smtp: Option<&SmtpConfig>) -> Result<Arc<dyn Mailer>, NotifyError> {
    match smtp {
        Some(config) => Ok(Arc::new(SmtpMailer::new(config)?)),
        None => Ok(Arc::new(LogMailer)),
    }
}

pub fn verification_email(to: &str, code: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Verify your CampusMeet email".to_string(),
        body: format!(
            "Your verification code is {code}.\n\nIt expires in 10 minutes. If you did not sign up, ignore this email."
        ),
    }
}

pub fn login_otp_email(to: &str, code: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Your CampusMeet login code".to_string(),
        body: format!("Your login code is {code}.\n\nIt expires in 10 minutes."),
    }
}

pub fn room_invite_email(to: &str, inviter: &str, room_name: &str, invite_code: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("{inviter} invited you to {room_name}"),
        body: format!(
            "{inviter} invited you to join the room \"{room_name}\" on CampusMeet.\n\nInvite code: {invite_code}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_code() {
        assert!(login_otp_email("a@x.io", "012345").body.contains("012345"));
        let invite = room_invite_email("b@x.io", "Ann", "Study group", "ABCD-123");
        assert!(invite.body.contains("ABCD-123"));
        assert_eq!(invite.subject, "Ann invited you to Study group");
    }

    #[test]
    fn test_smtp_mailer_rejects_bad_sender() {
        let config = SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: None,
            password: None,
            from: "not an address".to_string(),
            use_tls: false,
        };
        assert!(matches!(SmtpMailer::new(&config), Err(NotifyError::Address(_))));
    }

    #[tokio::test]
    async fn test_memory_mailer_records() {
        let mailer = MemoryMailer::default();
        mailer.send(&verification_email("a@x.io", "ABCDEF")).await.unwrap();
        assert_eq!(mailer.sent()[0].to, "a@x.io");
    }
}
