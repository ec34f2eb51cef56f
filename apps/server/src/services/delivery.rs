//! # Invoice Delivery
//!
//! One delivery attempt for one sale, always from persisted state:
//!
//! ```text
//! get_invoice_data(sale_id) ──► render ──► send(customer.email) ──► mark sent
//!                                  │              │
//!                                  └──────┬───────┘
//!                                         ▼
//!                              mark failed (error text)
//! ```
//!
//! The status update happens after the mail relay answered, never inside
//! the sale transaction. If recording `sent` fails the mail is already out,
//! so the caller gets [`ServiceError::InvoiceStatus`]. If recording `failed`
//! fails, the render or dispatch error is still what gets returned.

use std::sync::Arc;
use tracing::{error, info, instrument};

use factura_core::InvoiceStatus;
use factura_db::Database;
use factura_invoice::{InvoiceMailer, InvoiceRenderer, RenderedInvoice};

use super::{ServiceError, ServiceResult};

/// Renders and mails invoices, recording the outcome on the sale.
#[derive(Clone)]
pub struct InvoiceDelivery {
    db: Database,
    renderer: Arc<InvoiceRenderer>,
    mailer: Arc<dyn InvoiceMailer>,
}

impl InvoiceDelivery {
    pub fn new(db: Database, renderer: InvoiceRenderer, mailer: Arc<dyn InvoiceMailer>) -> Self {
        InvoiceDelivery {
            db,
            renderer: Arc::new(renderer),
            mailer,
        }
    }

    /// Renders the invoice of `sale_id` without sending or recording anything.
    pub async fn render(&self, sale_id: i64) -> ServiceResult<RenderedInvoice> {
        let data = self.db.sales().get_invoice_data(sale_id).await.map_err(|e| {
            if e.is_not_found() {
                ServiceError::SaleNotFound(sale_id)
            } else {
                ServiceError::Database(e)
            }
        })?;

        self.renderer
            .render(&data)
            .map_err(|source| ServiceError::InvoiceRender { sale_id, source })
    }

    /// Renders, sends and records the result.
    ///
    /// A render or send failure is stored on the sale as `failed` before the
    /// error is returned.
    #[instrument(skip(self))]
    pub async fn deliver(&self, sale_id: i64) -> ServiceResult<()> {
        let data = self.db.sales().get_invoice_data(sale_id).await.map_err(|e| {
            if e.is_not_found() {
                ServiceError::SaleNotFound(sale_id)
            } else {
                ServiceError::Database(e)
            }
        })?;

        let outcome = match self.renderer.render(&data) {
            Ok(invoice) => self
                .mailer
                .send(&data.customer.email, &invoice)
                .await
                .map_err(|source| ServiceError::InvoiceDispatch { sale_id, source }),
            Err(source) => Err(ServiceError::InvoiceRender { sale_id, source }),
        };

        match outcome {
            Ok(()) => {
                info!(sale_id, to = %data.customer.email, "Invoice sent");
                self.db
                    .sales()
                    .mark_invoice_sent(sale_id)
                    .await
                    .map_err(|source| ServiceError::InvoiceStatus { sale_id, source })
            }
            Err(err) => {
                error!(sale_id, error = %err, "Invoice delivery failed");
                if let Err(status_err) = self
                    .db
                    .sales()
                    .mark_invoice_failed(sale_id, &err.to_string())
                    .await
                {
                    error!(sale_id, error = %status_err, "Could not record failed invoice");
                }
                Err(err)
            }
        }
    }

    /// Delivers unless the sale's invoice already went out.
    ///
    /// Returns whether a delivery was attempted.
    pub async fn deliver_if_unsent(&self, sale_id: i64) -> ServiceResult<bool> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or(ServiceError::SaleNotFound(sale_id))?;

        if sale.invoice_status == InvoiceStatus::Sent {
            return Ok(false);
        }

        self.deliver(sale_id).await.map(|()| true)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}
