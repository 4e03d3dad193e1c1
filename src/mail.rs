use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Mail task failed: {0}")]
    Task(String),
}

/// Blocking delivery of one message to one recipient.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, config: &MailConfig) -> Result<Self, MailError> {
        let builder = if config.starttls {
            SmtpTransport::starttls_relay(host)?
        } else {
            SmtpTransport::relay(host)?
        };
        let mut builder = builder.port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.parse()?,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mail.to.parse()?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())?;

        self.transport.send(&message)?;
        Ok(())
    }
}

/// Used when no SMTP host is configured: the message is written to the log instead.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            "SMTP not configured, logging mail instead:\n{}",
            mail.body
        );
        Ok(())
    }
}

/// Pick the SMTP mailer when a host is configured, else the logging one.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.smtp_host {
        Some(host) => Ok(Arc::new(SmtpMailer::new(host, config)?)),
        None => {
            tracing::warn!("No [mail] smtp_host configured; reset emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Send on the blocking pool.
pub async fn deliver(mailer: Arc<dyn Mailer>, mail: OutgoingMail) -> Result<(), MailError> {
    tokio::task::spawn_blocking(move || mailer.send(&mail))
        .await
        .map_err(|e| MailError::Task(e.to_string()))?
}

pub fn password_reset(to: &str, reset_link: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Password Reset Request".to_string(),
        body: format!(
            "To reset your password, visit the following link:\n\
             {}\n\n\
             If you did not make this request then simply ignore this email \
             and no changes will be made.\n",
            reset_link
        ),
    }
}
