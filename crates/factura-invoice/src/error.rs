//! # Invoice Error Types
//!
//! Rendering and dispatch fail for different reasons and are reported
//! separately: the server records which step broke against the sale.

use factura_core::CoreError;
use thiserror::Error;

/// Errors while producing the PDF.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// printpdf refused to build or serialize the document.
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    /// A configured asset (the logo) could not be loaded.
    #[error("Invoice asset '{path}' unusable: {reason}")]
    Asset { path: String, reason: String },

    /// The sale's figures could not be totalled.
    #[error("Invoice totals unavailable: {0}")]
    Totals(#[from] CoreError),
}

/// Errors while mailing a rendered invoice.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Sender or recipient is not a valid mailbox.
    #[error("Invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The MIME message could not be assembled.
    #[error("Failed to build message: {0}")]
    Build(String),

    /// Could not reach or negotiate with the relay (includes timeouts).
    #[error("SMTP connection failed: {0}")]
    Connection(String),

    /// The relay rejected the credentials.
    #[error("SMTP authentication failed: {0}")]
    Authentication(String),

    /// The relay refused the message.
    #[error("SMTP send failed: {0}")]
    Send(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = InvoiceError::Asset {
            path: "logo.png".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "Invoice asset 'logo.png' unusable: not found");

        let err = DispatchError::Authentication("535 bad credentials".to_string());
        assert!(err.to_string().contains("authentication"));
    }
}
