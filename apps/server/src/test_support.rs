//! Test doubles and fixtures shared by the server tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use factura_core::{NewProduct, Product};
use factura_db::{Database, DbConfig};
use factura_invoice::{DispatchError, InvoiceMailer, RenderedInvoice};

use crate::config::{AppConfig, DeliveryMode};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Accepts every message and keeps a copy.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvoiceMailer for RecordingMailer {
    async fn send(&self, to: &str, invoice: &RenderedInvoice) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            filename: invoice.filename.clone(),
            bytes: invoice.bytes.clone(),
        });
        Ok(())
    }
}

/// Rejects every message as a relay with bad credentials would.
#[derive(Debug)]
pub struct FailingMailer;

#[async_trait]
impl InvoiceMailer for FailingMailer {
    async fn send(&self, _to: &str, _invoice: &RenderedInvoice) -> Result<(), DispatchError> {
        Err(DispatchError::Authentication(
            "535 5.7.8 Username and Password not accepted".to_string(),
        ))
    }
}

/// Closes the database pool while "sending", so the status update that
/// follows fails. `deliver_ok` picks the send result.
pub struct ClosingMailer {
    db: Database,
    deliver_ok: bool,
    pub inner: RecordingMailer,
}

impl ClosingMailer {
    pub fn new(db: Database, deliver_ok: bool) -> Self {
        ClosingMailer {
            db,
            deliver_ok,
            inner: RecordingMailer::default(),
        }
    }
}

#[async_trait]
impl InvoiceMailer for ClosingMailer {
    async fn send(&self, to: &str, invoice: &RenderedInvoice) -> Result<(), DispatchError> {
        self.db.close().await;
        if self.deliver_ok {
            self.inner.send(to, invoice).await
        } else {
            Err(DispatchError::Connection("relay unreachable".to_string()))
        }
    }
}

/// In-memory database with two products:
/// Yerba Mate ($12.50, stock 10) and Azucar ($5.00, stock 2).
pub async fn seeded_db() -> (Database, Vec<Product>) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    let mut products = Vec::new();
    for (name, price_cents, stock) in [("Yerba Mate", 1250, 10), ("Azucar", 500, 2)] {
        let product = db
            .products()
            .insert(&NewProduct {
                name: name.to_string(),
                price_cents,
                stock,
            })
            .await
            .unwrap();
        products.push(product);
    }

    (db, products)
}

/// Full application state over [`seeded_db`], with its worker running.
pub async fn test_state(
    mode: DeliveryMode,
    mailer: Arc<dyn InvoiceMailer>,
) -> (Arc<AppState>, Vec<Product>) {
    let (db, products) = seeded_db().await;

    let mut config = AppConfig::default();
    config.invoice.delivery = mode;

    let (state, worker, _queue) = AppState::build(db, config, mailer);
    tokio::spawn(worker.run());
    (state, products)
}
