//! # factura-db: Database Layer for Factura POS
//!
//! SQLite storage for the catalog, customers and the sale ledger, using
//! sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Factura POS Data Flow                            │
//! │                                                                         │
//! │  POST /sales                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    factura-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────────┐  ┌──────────────┐ │   │
//! │  │   │   Database    │    │  Repositories     │  │  Migrations  │ │   │
//! │  │   │   (pool.rs)   │◄───│  ProductRepo      │  │  (embedded)  │ │   │
//! │  │   │  SqlitePool   │    │  CustomerRepo     │  │ 001_initial  │ │   │
//! │  │   │               │    │  SaleRepo         │  │ 002_invoice  │ │   │
//! │  │   │               │    │  ReportRepo       │  │              │ │   │
//! │  │   └───────────────┘    └───────────────────┘  └──────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  SQLite database file (WAL)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use factura_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("factura.db")).await?;
//! let products = db.products().list().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::customer::CustomerRepository;
pub use repository::product::ProductRepository;
pub use repository::report::{ReportWindow, ReportingRepository};
pub use repository::sale::SaleRepository;
