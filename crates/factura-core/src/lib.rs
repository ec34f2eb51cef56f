//! # factura-core: Pure Business Logic for Factura POS
//!
//! Everything the point of sale decides without touching a disk or a socket:
//! money arithmetic, the shape of products, customers and sales, which
//! requested lines a sale accepts, and how invoice totals are derived.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Factura POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Sale terminal (browser, JSON over HTTP)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                apps/server (axum routes, SaleService)           │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────┐   ┌───────────────▼───────────────┐   │
//! │  │  factura-db (SQLite)        │   │  factura-invoice (PDF, SMTP)  │   │
//! │  └──────────────┬──────────────┘   └───────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────────────────────▼───────────────┐   │
//! │  │               ★ factura-core (THIS CRATE) ★                     │   │
//! │  │   types · money · sale · invoice · validation · error           │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, Customer, Sale, SaleLine, TaxRate
//! - [`money`] - Integer-cent money with half-up tax rounding
//! - [`sale`] - Line requests, line outcomes and the acceptance rule
//! - [`invoice`] - Invoice data bundle and totals
//! - [`validation`] - Input checks shared by every entry point
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use factura_core::money::Money;
//! use factura_core::types::TaxRate;
//!
//! let subtotal = Money::from_cents(3500); // $35.00
//! let iva = subtotal.calculate_tax(TaxRate::from_bps(1600));
//! assert_eq!(iva.to_string(), "$5.60");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use invoice::{InvoiceData, InvoiceTotals};
pub use money::Money;
pub use sale::{evaluate_line, LineOutcome, LineRequest, RegisteredSale, RejectionReason};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of requested lines accepted in one sale registration.
pub const MAX_SALE_LINES: usize = 100;

/// Default value-added tax rate applied on invoices (16%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 1600;

/// Maximum length of product and customer names.
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 100;
pub const MAX_NATIONAL_ID_LEN: usize = 20;

/// Largest catalog price, in cents ($10,000,000.00).
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Largest stock count a product may hold.
///
/// With [`MAX_PRICE_CENTS`] and [`MAX_SALE_LINES`] this keeps every sale
/// total below 10^17 cents, well inside i64.
pub const MAX_STOCK: i64 = 1_000_000;
