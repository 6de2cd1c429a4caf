//! Delivers signals as HTML email through an authenticated SMTP relay.

use crate::core::{ChannelKind, DeliveryMode, NotificationChannel, TradeSignal};
use crate::formatting::{email_subject, HtmlEmailFormatter, TextFormatter};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::{Category, Code, Detail, Severity};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument};

/// Errors that can occur while sending a single email.
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

impl EmailError {
    fn is_authentication_failure(&self) -> bool {
        match self {
            EmailError::Smtp(e) => is_auth_rejection(e.status()),
            _ => false,
        }
    }
}

/// True for the reply codes a relay uses to refuse credentials: 535 (bad
/// username or password) and 534 (mechanism too weak, e.g. app password needed).
fn is_auth_rejection(code: Option<Code>) -> bool {
    matches!(
        code,
        Some(Code {
            severity: Severity::PermanentNegativeCompletion,
            category: Category::Unspecified3,
            detail: Detail::Five | Detail::Four,
        })
    )
}

/// Sends one HTML message per signal from `sender` to `recipient`.
pub struct EmailChannel {
    sender: String,
    app_password: String,
    recipient: String,
    smtp_host: String,
    smtp_port: u16,
    timeout: Duration,
    formatter: HtmlEmailFormatter,
}

impl EmailChannel {
    pub fn new(
        sender: String,
        app_password: String,
        recipient: String,
        smtp_host: String,
        smtp_port: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            sender,
            app_password,
            recipient,
            smtp_host,
            smtp_port,
            timeout,
            formatter: HtmlEmailFormatter,
        }
    }

    fn build_message(&self, signal: &TradeSignal, mode: DeliveryMode) -> Result<Message, EmailError> {
        let message = Message::builder()
            .from(self.sender.parse()?)
            .to(self.recipient.parse()?)
            .subject(email_subject(signal, mode))
            .header(ContentType::TEXT_HTML)
            .body(self.formatter.format(signal, mode))?;
        Ok(message)
    }

    async fn deliver(&self, message: Message) -> Result<(), EmailError> {
        // `relay` connects with implicit TLS, which is what port 465 expects.
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.smtp_host)?
            .port(self.smtp_port)
            .credentials(Credentials::new(
                self.sender.clone(),
                self.app_password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();
        transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    #[instrument(skip_all, fields(channel = "email", symbol = %signal.symbol()))]
    async fn send(&self, signal: &TradeSignal, mode: DeliveryMode) -> bool {
        let result = match self.build_message(signal, mode) {
            Ok(message) => self.deliver(message).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(recipient = %self.recipient, "Email sent successfully.");
                true
            }
            Err(e) if e.is_authentication_failure() => {
                error!(error = %e, "Email authentication failed. Check GMAIL_ADDRESS and GMAIL_APP_PASSWORD");
                false
            }
            Err(e) => {
                error!(error = %e, "Failed to send email");
                false
            }
        }
    }
}
