//! # Repository Module
//!
//! Database repository implementations for Factura POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP handler / SaleService                                            │
//! │       │                                                                 │
//! │       │  db.sales().register(&customer, &lines)                        │
//! │       ▼                                                                 │
//! │  SaleRepository ──── one transaction ────┐                             │
//! │       │                                  │                              │
//! │       ├── customer::resolve_or_create(tx) │  connection-level helpers   │
//! │       ├── product::fetch(tx)              │  shared by repositories     │
//! │       └── product::try_reserve_stock(tx) ─┘                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each repository owns a pool handle for standalone calls. Functions that
//! must join a caller's transaction take `&mut SqliteConnection` instead.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD and stock reservation
//! - [`customer::CustomerRepository`] - Customer lookup and natural-key resolution
//! - [`sale::SaleRepository`] - Sale registration and invoice status
//! - [`report::ReportingRepository`] - Dashboard aggregates

pub mod customer;
pub mod product;
pub mod report;
pub mod sale;
