//! # factura-server: HTTP Service for Factura POS
//!
//! Registers sales over HTTP and delivers their invoices.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          factura-server                                 │
//! │                                                                         │
//! │  axum Router (routes/)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleService ──► factura-db (one transaction per sale)                 │
//! │       │                                                                 │
//! │       ├── inline ──► InvoiceDelivery ──► InvoiceRenderer ──► SMTP      │
//! │       │                                                                 │
//! │       └── queued ──► InvoiceQueue ──► InvoiceWorker ──► InvoiceDelivery│
//! │                                                                         │
//! │  Errors: ServiceError ──► ApiError { code, message, sale_id }          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML + environment configuration
//! - [`error`] - HTTP error codes
//! - [`routes`] - Handlers and the router
//! - [`services`] - Registration, delivery and the background worker
//! - [`state`] - Shared handler state and wiring

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::{AppConfig, ConfigError, DeliveryMode};
pub use error::{ApiError, ErrorCode};
pub use routes::router;
pub use state::AppState;
