//! # Invoice Mailer
//!
//! Delivers a rendered invoice to the customer's inbox.
//!
//! ## Message Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  From:    <smtp.from>                                                  │
//! │  To:      <customer email>                                             │
//! │  Subject: Factura de su compra                                         │
//! │  multipart/mixed                                                       │
//! │   ├── text/plain        "Adjuntamos la factura de su compra."          │
//! │   └── application/pdf   attachment; filename="factura-{id}.pdf"        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers hold an `Arc<dyn InvoiceMailer>`; tests swap in a recorder.
//! The mailer never retries. Retrying is the caller's decision.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::DispatchError;
use crate::render::RenderedInvoice;

// =============================================================================
// Mailer Trait
// =============================================================================

/// Sends a rendered invoice to one recipient.
#[async_trait]
pub trait InvoiceMailer: Send + Sync {
    async fn send(&self, to: &str, invoice: &RenderedInvoice) -> Result<(), DispatchError>;
}

// =============================================================================
// Settings
// =============================================================================

/// SMTP relay and message settings, the `[smtp]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    /// Default: smtp.gmail.com
    pub host: String,

    /// Submission port, STARTTLS. Default: 587
    pub port: u16,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Sender mailbox, e.g. `Facturas <facturas@example.com>`.
    pub from: String,

    pub subject: String,
    pub body: String,

    /// Upper bound for one delivery, connect included. Default: 30
    pub timeout_secs: u64,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        SmtpSettings {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
            from: String::new(),
            subject: "Factura de su compra".to_string(),
            body: "Adjuntamos la factura de su compra.".to_string(),
            timeout_secs: 30,
        }
    }
}

impl SmtpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(Credentials::new(user.clone(), pass.clone())),
            _ => None,
        }
    }
}

// =============================================================================
// SMTP Mailer
// =============================================================================

/// [`InvoiceMailer`] over an SMTP relay with STARTTLS.
pub struct SmtpMailer {
    settings: SmtpSettings,
    sender: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("host", &self.settings.host)
            .field("port", &self.settings.port)
            .field("sender", &self.sender.to_string())
            .finish()
    }
}

impl SmtpMailer {
    /// Builds the transport. No connection is opened until the first send.
    ///
    /// ## Errors
    /// * `DispatchError::InvalidAddress` - `from` is not a mailbox
    /// * `DispatchError::Connection` - TLS parameters for `host` are invalid
    pub fn new(settings: SmtpSettings) -> Result<Self, DispatchError> {
        let sender = parse_mailbox(&settings.from)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| DispatchError::Connection(e.to_string()))?
            .port(settings.port)
            .timeout(Some(settings.timeout()));

        if let Some(credentials) = settings.credentials() {
            builder = builder.credentials(credentials);
        }

        info!(
            host = %settings.host,
            port = settings.port,
            authenticated = settings.username.is_some(),
            "SMTP mailer configured"
        );

        Ok(SmtpMailer {
            transport: builder.build(),
            sender,
            settings,
        })
    }

    /// Assembles the MIME message for `to`.
    pub fn build_message(&self, to: &str, invoice: &RenderedInvoice) -> Result<Message, DispatchError> {
        let recipient = parse_mailbox(to)?;
        let pdf = ContentType::parse("application/pdf")
            .map_err(|e| DispatchError::Build(e.to_string()))?;

        Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(self.settings.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(self.settings.body.clone()))
                    .singlepart(
                        Attachment::new(invoice.filename.clone()).body(invoice.bytes.clone(), pdf),
                    ),
            )
            .map_err(|e| DispatchError::Build(e.to_string()))
    }
}

#[async_trait]
impl InvoiceMailer for SmtpMailer {
    async fn send(&self, to: &str, invoice: &RenderedInvoice) -> Result<(), DispatchError> {
        let message = self.build_message(to, invoice)?;

        debug!(to, filename = %invoice.filename, size = invoice.bytes.len(), "Sending invoice");

        let response = tokio::time::timeout(self.settings.timeout(), self.transport.send(message))
            .await
            .map_err(|_| {
                DispatchError::Connection(format!(
                    "no answer from {} within {}s",
                    self.settings.host, self.settings.timeout_secs
                ))
            })?
            .map_err(classify)?;

        info!(to, code = %response.code(), "Invoice delivered");
        Ok(())
    }
}

pub fn parse_mailbox(address: &str) -> Result<Mailbox, DispatchError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| DispatchError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Maps a transport error by its SMTP reply code.
///
/// ```text
/// 53x (530, 534, 535)   → Authentication
/// any other reply code  → Send
/// no reply (I/O, TLS)   → Connection
/// ```
fn classify(error: lettre::transport::smtp::Error) -> DispatchError {
    let message = error.to_string();

    match error.status().map(|code| code.to_string()) {
        Some(code) if code.starts_with("53") => {
            warn!(%code, "SMTP authentication rejected");
            DispatchError::Authentication(message)
        }
        Some(_) => DispatchError::Send(message),
        None => DispatchError::Connection(message),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
