//! # Application State
//!
//! Shared by every handler through `State<Arc<AppState>>`.

use std::sync::Arc;

use factura_db::Database;
use factura_invoice::{InvoiceMailer, InvoiceRenderer};

use crate::config::{AppConfig, DeliveryMode};
use crate::services::{InvoiceDelivery, InvoiceQueue, InvoiceWorker, SaleService};

pub struct AppState {
    pub db: Database,
    pub sales: SaleService,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the renderer, delivery, worker and sale service from `config`.
    ///
    /// The worker is returned even in inline mode: its startup sweep
    /// recovers sales left `pending` by an earlier run.
    pub fn build(
        db: Database,
        config: AppConfig,
        mailer: Arc<dyn InvoiceMailer>,
    ) -> (Arc<AppState>, InvoiceWorker, InvoiceQueue) {
        let mut renderer = InvoiceRenderer::new(
            config.issuer.clone(),
            config.invoice.tax_rate(),
            config.invoice.logo_path.clone(),
        )
        .with_offset(config.invoice.offset());
        if !config.invoice.show_logo {
            renderer = renderer.without_logo();
        }

        let delivery = InvoiceDelivery::new(db.clone(), renderer, mailer);
        let (worker, queue) = InvoiceWorker::new(delivery.clone(), config.invoice.queue_capacity);

        let sale_queue = match config.invoice.delivery {
            DeliveryMode::Queued => Some(queue.clone()),
            DeliveryMode::Inline => None,
        };
        let sales = SaleService::new(db.clone(), delivery, config.invoice.delivery, sale_queue);

        let state = AppState { db, sales, config };
        (Arc::new(state), worker, queue)
    }
}
