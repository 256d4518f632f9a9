use async_trait::async_trait;
use lettre::{
    message::{Mailbox, Message, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use tracing::info;
use villa_core::notify::{Notification, Notifier};
use villa_shared::Masked;

use crate::app_config::SmtpConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("SMTP configuration invalid: {0}")]
    Config(String),
    #[error("Invalid address {0}: {1}")]
    Address(String, String),
    #[error("Failed to build email: {0}")]
    Build(String),
    #[error("Failed to send email: {0}")]
    Transport(String),
}

/// Sends guest emails through an authenticated STARTTLS relay.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_mailbox: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailerError> {
        if config.username.is_empty() {
            return Err(MailerError::Config("SMTP username is empty".to_string()));
        }
        if config.from_email.is_empty() {
            return Err(MailerError::Config("From email is empty".to_string()));
        }

        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailerError::Config(format!("relay {}: {}", config.host, e)))?
            .port(config.port)
            .credentials(credentials)
            .build();

        let from_mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e: lettre::address::AddressError| {
                MailerError::Address(config.from_email.clone(), e.to_string())
            })?;

        Ok(Self { mailer, from_mailbox })
    }

    fn build(&self, notification: &Notification) -> Result<Message, MailerError> {
        let to: Mailbox = notification
            .recipient()
            .parse()
            .map_err(|e: lettre::address::AddressError| {
                MailerError::Address(Masked(notification.recipient()).to_string(), e.to_string())
            })?;

        Message::builder()
            .from(self.from_mailbox.clone())
            .to(to)
            .subject(notification.subject())
            .multipart(MultiPart::alternative_plain_html(
                notification.text_body(),
                notification.html_body(),
            ))
            .map_err(|e| MailerError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpMailer {
    async fn send(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let email = self.build(notification)?;
        self.mailer
            .send(email)
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        info!(
            kind = notification.kind(),
            to = %Masked(notification.recipient()),
            "Email sent"
        );
        Ok(())
    }
}

/// Development notifier: writes the email to the log instead of sending it.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Notifier for LogMailer {
    async fn send(
        &self,
        notification: &Notification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(email = %log_summary(notification), "Email (log only)");
        Ok(())
    }
}

/// Kind, masked recipient and subject. Bodies carry one-time codes and
/// never reach the log.
fn log_summary(notification: &Notification) -> String {
    format!(
        "{} to {}: {}",
        notification.kind(),
        Masked(notification.recipient()),
        notification.subject()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "secret".to_string(),
            from_email: "bookings@example.com".to_string(),
            from_name: "Villa Bookings".to_string(),
        }
    }

    #[test]
    fn test_rejects_empty_username() {
        let mut cfg = config();
        cfg.username.clear();
        assert!(matches!(SmtpMailer::new(&cfg), Err(MailerError::Config(_))));
    }

    #[tokio::test]
    async fn test_builds_message_for_valid_recipient() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let ok = mailer.build(&Notification::RegistrationCode {
            to: "guest@example.com".to_string(),
            code: 123456,
            ttl_seconds: 60,
        });
        assert!(ok.is_ok());

        let bad = mailer.build(&Notification::RegistrationCode {
            to: "not-an-address".to_string(),
            code: 123456,
            ttl_seconds: 60,
        });
        assert!(matches!(bad, Err(MailerError::Address(_, _))));
    }

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        let sent = LogMailer
            .send(&Notification::CancellationCode {
                to: "guest@example.com".to_string(),
                code: 654321,
                ttl_seconds: 30,
            })
            .await;
        assert!(sent.is_ok());
    }

    #[test]
    fn test_log_summary_omits_code_and_address() {
        let line = log_summary(&Notification::CancellationCode {
            to: "guest@example.com".to_string(),
            code: 654321,
            ttl_seconds: 30,
        });
        assert!(!line.contains("654321"));
        assert!(!line.contains("guest@example.com"));
        assert!(line.contains("g***@example.com"));
    }
}
