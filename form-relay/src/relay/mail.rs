//! Fallback delivery over SMTP.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::{Credentials, Mechanism},
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::info;

use crate::payload::{is_truthy, DecodedPayload};
use crate::Config;

/// Display name used for the sender mailbox.
pub const SENDER_NAME: &str = "website";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address {address}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Mail derived from a submission, built right before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl OutboundMailMessage {
    /// Derive the mail from the `name`, `from`, `to`, `subject` and `text` fields.
    pub fn from_payload(payload: &DecodedPayload, default_recipient: &str) -> Self {
        let to = if payload.get("to").map(is_truthy).unwrap_or(false) {
            payload.field_text("to")
        } else {
            default_recipient.to_string()
        };

        Self {
            to,
            subject: format!("From website: {}", payload.field_text("subject")),
            text: format!(
                "Email from {} by {}\n{}",
                payload.field_text("from"),
                payload.field_text("name"),
                payload.field_text("text")
            ),
        }
    }
}

/// Sends outbound mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutboundMailMessage) -> Result<(), MailError>;
}

/// SMTP relay mailer: implicit TLS, PLAIN auth.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Result<Self, MailError> {
        let sender = Mailbox::new(Some(SENDER_NAME.to_string()), parse_address(username)?);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            .port(port)
            .authentication(vec![Mechanism::Plain])
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { transport, sender })
    }

    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        Self::new(
            &config.api_host,
            config.api_port,
            &config.api_email,
            &config.api_key,
        )
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &OutboundMailMessage) -> Result<(), MailError> {
        let email = build_message(&self.sender, message)?;
        let response = self.transport.send(email).await?;

        info!(
            to = %message.to,
            smtp_code = %response.code(),
            "smtp_message_accepted"
        );

        Ok(())
    }
}

fn parse_address(raw: &str) -> Result<Address, MailError> {
    raw.trim()
        .parse()
        .map_err(|source| MailError::InvalidAddress {
            address: raw.to_string(),
            source,
        })
}

/// Build the RFC 5322 message for an outbound mail.
pub fn build_message(sender: &Mailbox, message: &OutboundMailMessage) -> Result<Message, MailError> {
    let to: Mailbox = message
        .to
        .trim()
        .parse()
        .map_err(|source| MailError::InvalidAddress {
            address: message.to.clone(),
            source,
        })?;

    Ok(Message::builder()
        .from(sender.clone())
        .to(to)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(message.text.clone())?)
}
