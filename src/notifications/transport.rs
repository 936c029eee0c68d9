use std::sync::Arc;

use async_trait::async_trait;
use lettre::address::AddressError;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

use super::templates::RenderedEmail;
use super::{SendEmailRequest, SendEmailResponse};
use crate::config::MailConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("Relay error: {0}")]
    Relay(String),
}

impl MailError {
    /// Whether sending the same message again may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, MailError::Smtp(_) | MailError::Relay(_))
    }
}

/// Outbound mail transport. Returns the provider message id.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &RenderedEmail) -> Result<String, MailError>;
}

/// Picks the transport: remote relay, then SMTP, then the log transport.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn MailTransport>, MailError> {
    if let Some(url) = &config.relay_url {
        tracing::info!(url = %url, "Sending email through HTTP relay");
        return Ok(Arc::new(HttpRelayTransport::new(url.clone())));
    }

    if config.smtp_host.is_some() {
        let transport = SmtpMailTransport::new(config)?;
        tracing::info!(
            host = ?config.smtp_host,
            port = config.smtp_port,
            secure = config.smtp_secure,
            "Sending email through SMTP"
        );
        return Ok(Arc::new(transport));
    }

    tracing::warn!("No SMTP_HOST or MAIL_RELAY_URL configured, emails will only be logged");
    Ok(Arc::new(LogTransport))
}

// ============ SMTP ============

pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    domain: String,
}

impl SmtpMailTransport {
    /// `smtp_secure` selects implicit TLS; otherwise STARTTLS is required.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| MailError::Smtp("SMTP_HOST is not set".to_string()))?;

        let builder = if config.smtp_secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| MailError::Smtp(format!("SMTP relay error: {e}")))?;

        let mut builder = builder.port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_pass) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e: AddressError| MailError::Address(format!("{}: {e}", config.from)))?;
        let domain = from.email.domain().to_string();

        Ok(Self {
            transport: builder.build(),
            from,
            domain,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, email: &RenderedEmail) -> Result<String, MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e: AddressError| MailError::Address(format!("{}: {e}", email.to)))?;

        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.domain);
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        Ok(message_id)
    }
}

// ============ HTTP relay ============

/// Forwards to a remote mail endpoint speaking the
/// `{templateName, recipientEmail, reservationData}` contract.
pub struct HttpRelayTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpRelayTransport {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl MailTransport for HttpRelayTransport {
    async fn send(&self, email: &RenderedEmail) -> Result<String, MailError> {
        let request = SendEmailRequest {
            template_name: email.template,
            recipient_email: email.to.clone(),
            reservation_data: email.data.clone(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| MailError::Relay(e.to_string()))?;

        let status = response.status();
        let body: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| MailError::Relay(format!("Unreadable response ({status}): {e}")))?;

        match body {
            SendEmailResponse {
                success: true,
                message_id: Some(id),
                ..
            } => Ok(id),
            SendEmailResponse { error, .. } => Err(MailError::Relay(
                error.unwrap_or_else(|| format!("Relay rejected the message ({status})")),
            )),
        }
    }
}

// ============ Development ============

/// Logs instead of sending.
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, email: &RenderedEmail) -> Result<String, MailError> {
        let message_id = format!("log-{}", Uuid::new_v4());
        tracing::info!(
            to = %email.to,
            template = email.template.as_str(),
            subject = %email.subject,
            message_id = %message_id,
            "Email (not sent, no transport configured)"
        );
        Ok(message_id)
    }
}
