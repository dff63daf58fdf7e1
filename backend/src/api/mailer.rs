use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use resend_rs::{Resend, types::CreateEmailBaseOptions};
use std::sync::Arc;

use crate::config::{MailBackend, SmtpSettings};
use crate::error::MailError;

/// What the lead handlers hand to the email provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;

    /// Short backend name for log lines.
    fn backend(&self) -> &'static str;
}

pub struct ResendMailer {
    client: Resend,
}

impl ResendMailer {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Resend::new(api_key),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let request = CreateEmailBaseOptions::new(
            email.from.clone(),
            email.to.clone(),
            email.subject.clone(),
        )
        .with_html(&email.html);

        self.client
            .emails
            .send(request)
            .await
            .map_err(|e| MailError::Provider(e.to_string()))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "resend"
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| MailError::Transport(format!("Failed to create SMTP relay: {}", e)))?
            .port(settings.port);
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&email.from)?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML);
        for recipient in &email.to {
            builder = builder.to(parse_mailbox(recipient)?);
        }
        let message = builder
            .body(email.html.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "smtp"
    }
}

/// Development fallback when no provider is configured: the email only
/// goes to the log.
pub struct LogOnlyMailer;

#[async_trait]
impl Mailer for LogOnlyMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        tracing::info!(
            "[log-only mailer] to={:?} subject={:?} html_len={}",
            email.to,
            email.subject,
            email.html.len()
        );
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "log-only"
    }
}

pub fn build_mailer(backend: &MailBackend) -> Result<Arc<dyn Mailer>, MailError> {
    let mailer: Arc<dyn Mailer> = match backend {
        MailBackend::Resend { api_key } => Arc::new(ResendMailer::new(api_key)),
        MailBackend::Smtp(settings) => Arc::new(SmtpMailer::new(settings)?),
        MailBackend::LogOnly => Arc::new(LogOnlyMailer),
    };
    tracing::info!("Lead notifications will be delivered via {}", mailer.backend());
    Ok(mailer)
}
