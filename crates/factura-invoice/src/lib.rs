//! # factura-invoice: Invoice Documents and Delivery
//!
//! Renders a sale into a PDF invoice and delivers it by email.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InvoiceData (sale + customer + lines)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InvoiceLayout::build   ← every string and figure on the page          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InvoiceRenderer::render ← printpdf, US Letter, Helvetica              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RenderedInvoice { filename: "factura-{id}.pdf", bytes }               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  dyn InvoiceMailer::send ← SmtpMailer (lettre) in production           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`layout`] - Issuer profile and the page content model
//! - [`render`] - PDF drawing
//! - [`mailer`] - The mailer seam and its SMTP implementation
//! - [`error`] - Render and dispatch errors

pub mod error;
pub mod layout;
pub mod mailer;
pub mod render;

pub use error::{DispatchError, InvoiceError};
pub use layout::{InvoiceLayout, IssuerProfile, SummaryRow};
pub use mailer::{parse_mailbox, InvoiceMailer, SmtpMailer, SmtpSettings};
pub use render::{InvoiceRenderer, RenderedInvoice};
