//! # Services
//!
//! Orchestration between the ledger and invoice delivery.
//!
//! - [`sale_service`] - Sale registration, resend and download
//! - [`delivery`] - Render, send and record the invoice status
//! - [`worker`] - Background delivery for the queued mode

pub mod delivery;
pub mod sale_service;
pub mod worker;

use thiserror::Error;

use factura_core::{CoreError, ValidationError};
use factura_db::DbError;
use factura_invoice::{DispatchError, InvoiceError};

pub use delivery::InvoiceDelivery;
pub use sale_service::{RegisterSaleRequest, RegisterSaleResponse, SaleService};
pub use worker::{InvoiceQueue, InvoiceWorker};

/// Failures of a service call.
///
/// The invoice variants carry the sale id: the sale is already committed
/// when they occur, only the invoice is missing.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    #[error("Sale {sale_id} saved but its invoice could not be rendered: {source}")]
    InvoiceRender {
        sale_id: i64,
        #[source]
        source: InvoiceError,
    },

    #[error("Sale {sale_id} saved but its invoice could not be sent: {source}")]
    InvoiceDispatch {
        sale_id: i64,
        #[source]
        source: DispatchError,
    },

    #[error("Sale {sale_id} saved but the invoice queue is closed")]
    QueueClosed { sale_id: i64 },

    /// The invoice went out but marking the sale `sent` failed.
    #[error("Sale {sale_id} saved and its invoice sent, but the status was not recorded: {source}")]
    InvoiceStatus {
        sale_id: i64,
        #[source]
        source: DbError,
    },
}

impl ServiceError {
    /// The committed sale an error refers to, if any.
    pub fn sale_id(&self) -> Option<i64> {
        match self {
            ServiceError::InvoiceRender { sale_id, .. }
            | ServiceError::InvoiceDispatch { sale_id, .. }
            | ServiceError::QueueClosed { sale_id }
            | ServiceError::InvoiceStatus { sale_id, .. } => Some(*sale_id),
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
