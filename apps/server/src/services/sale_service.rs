//! # Sale Service
//!
//! The registration use case: validate, commit, then deliver the invoice.
//!
//! ## Registration Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  RegisterSaleRequest                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. validate customer + line count   ──► ServiceError::Validation      │
//! │       │                                   (nothing saved)               │
//! │       ▼                                                                 │
//! │  2. sales().register()  one transaction ──► ServiceError::Database     │
//! │       │                                   (nothing saved)               │
//! │       ▼                                                                 │
//! │  3. delivery                                                           │
//! │     inline: render + send now  ──► ServiceError::Invoice* { sale_id }  │
//! │     queued: enqueue             ──► response says `pending`            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RegisterSaleResponse { accepted, rejected[], invoice_status }         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use factura_core::validation::{validate_customer, validate_line_count};
use factura_core::{
    CustomerDraft, InvoiceStatus, LineOutcome, LineRequest, RegisteredSale, RejectionReason, Sale,
};
use factura_db::Database;
use factura_invoice::RenderedInvoice;

use super::delivery::InvoiceDelivery;
use super::worker::InvoiceQueue;
use super::{ServiceError, ServiceResult};
use crate::config::DeliveryMode;

// =============================================================================
// Request / Response
// =============================================================================

/// Body of `POST /sales`. Also accepts the field names of the legacy
/// `/venta/nueva` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSaleRequest {
    #[serde(alias = "nombre_cliente")]
    pub customer_name: String,

    #[serde(alias = "email_cliente")]
    pub customer_email: String,

    #[serde(default, alias = "dni_cliente")]
    pub customer_national_id: Option<String>,

    #[serde(default, alias = "productos")]
    pub lines: Vec<LineInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    #[serde(alias = "producto_id")]
    pub product_id: i64,

    #[serde(alias = "cantidad")]
    pub quantity: i64,
}

impl RegisterSaleRequest {
    fn customer_draft(&self) -> CustomerDraft {
        CustomerDraft {
            name: self.customer_name.clone(),
            email: self.customer_email.clone(),
            national_id: self.customer_national_id.clone(),
        }
        .normalized()
    }

    fn line_requests(&self) -> Vec<LineRequest> {
        self.lines
            .iter()
            .map(|l| LineRequest::new(l.product_id, l.quantity))
            .collect()
    }
}

/// A requested line that was not sold. `index` is its position in the
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLine {
    pub index: usize,
    pub product_id: i64,
    pub quantity: i64,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSaleResponse {
    pub sale_id: i64,
    pub customer_id: i64,
    pub total_cents: i64,
    /// Number of lines sold.
    pub accepted: usize,
    pub rejected: Vec<RejectedLine>,
    pub invoice_status: InvoiceStatus,
}

impl RegisterSaleResponse {
    fn new(registered: &RegisteredSale, invoice_status: InvoiceStatus) -> Self {
        let rejected = registered
            .outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| match *outcome {
                LineOutcome::Rejected {
                    product_id,
                    quantity,
                    reason,
                } => Some(RejectedLine {
                    index,
                    product_id,
                    quantity,
                    reason,
                }),
                LineOutcome::Accepted { .. } => None,
            })
            .collect();

        RegisterSaleResponse {
            sale_id: registered.sale.id,
            customer_id: registered.customer.id,
            total_cents: registered.sale.total_cents,
            accepted: registered.accepted_count(),
            rejected,
            invoice_status,
        }
    }
}

// =============================================================================
// Service
// =============================================================================

#[derive(Clone)]
pub struct SaleService {
    db: Database,
    delivery: InvoiceDelivery,
    mode: DeliveryMode,
    queue: Option<InvoiceQueue>,
}

impl SaleService {
    /// `queue` is required for [`DeliveryMode::Queued`]; without one the
    /// service delivers inline.
    pub fn new(
        db: Database,
        delivery: InvoiceDelivery,
        mode: DeliveryMode,
        queue: Option<InvoiceQueue>,
    ) -> Self {
        let mode = match (mode, &queue) {
            (DeliveryMode::Queued, None) => DeliveryMode::Inline,
            (mode, _) => mode,
        };

        SaleService {
            db,
            delivery,
            mode,
            queue,
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Registers a sale and delivers (or schedules) its invoice.
    ///
    /// Rejected lines never fail the call; they are listed in the response.
    ///
    /// ## Errors
    /// * `Validation` / `Core` - bad customer data or too many lines, nothing saved
    /// * `Database` - the transaction failed, nothing saved
    /// * `InvoiceRender` / `InvoiceDispatch` - inline mode only, sale saved
    /// * `QueueClosed` - queued mode only, sale saved
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn register(&self, request: RegisterSaleRequest) -> ServiceResult<RegisterSaleResponse> {
        let draft = request.customer_draft();
        validate_customer(&draft)?;
        validate_line_count(request.lines.len())?;

        let registered = self
            .db
            .sales()
            .register(&draft, &request.line_requests())
            .await?;
        let sale_id = registered.sale.id;

        let status = match (self.mode, &self.queue) {
            (DeliveryMode::Queued, Some(queue)) => {
                queue.enqueue(sale_id).await?;
                InvoiceStatus::Pending
            }
            _ => {
                self.delivery.deliver(sale_id).await?;
                InvoiceStatus::Sent
            }
        };

        info!(sale_id, mode = %self.mode, invoice_status = %status, "Sale completed");
        Ok(RegisterSaleResponse::new(&registered, status))
    }

    /// Renders and sends the invoice again from the stored sale, whatever
    /// its current status. Returns the sale with its updated status.
    pub async fn resend_invoice(&self, sale_id: i64) -> ServiceResult<Sale> {
        self.delivery.deliver(sale_id).await?;
        self.db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or(ServiceError::SaleNotFound(sale_id))
    }

    /// Renders the invoice for download. Nothing is sent or recorded.
    pub async fn invoice_pdf(&self, sale_id: i64) -> ServiceResult<RenderedInvoice> {
        self.delivery.render(sale_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::worker::InvoiceWorker;
    use crate::test_support::{seeded_db, FailingMailer, RecordingMailer};
    use factura_core::{CoreError, TaxRate, ValidationError};
    use factura_invoice::{InvoiceMailer, InvoiceRenderer, IssuerProfile};
    use std::sync::Arc;

    fn inline_service(db: &Database, mailer: Arc<dyn InvoiceMailer>) -> SaleService {
        let renderer = InvoiceRenderer::new(IssuerProfile::default(), TaxRate::default(), None);
        let delivery = InvoiceDelivery::new(db.clone(), renderer, mailer);
        SaleService::new(db.clone(), delivery, DeliveryMode::Inline, None)
    }

    fn request(dni: Option<&str>, lines: &[(i64, i64)]) -> RegisterSaleRequest {
        RegisterSaleRequest {
            customer_name: "Ana Diaz".to_string(),
            customer_email: "ana@example.com".to_string(),
            customer_national_id: dni.map(str::to_string),
            lines: lines
                .iter()
                .map(|&(product_id, quantity)| LineInput {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_register_inline_sends_invoice() {
        let (db, products) = seeded_db().await;
        let mailer = Arc::new(RecordingMailer::default());
        let service = inline_service(&db, mailer.clone());

        // Yerba Mate: 1250 cents, stock 10
        let response = service
            .register(request(Some("30111222"), &[(products[0].id, 3)]))
            .await
            .unwrap();

        assert_eq!(response.accepted, 1);
        assert!(response.rejected.is_empty());
        assert_eq!(response.total_cents, 3750);
        assert_eq!(response.invoice_status, InvoiceStatus::Sent);

        let product = db.products().get_by_id(products[0].id).await.unwrap().unwrap();
        assert_eq!(product.stock, 7);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.com");
    }

    #[tokio::test]
    async fn test_rejected_lines_are_reported_with_index() {
        let (db, products) = seeded_db().await;
        let service = inline_service(&db, Arc::new(RecordingMailer::default()));

        // Azucar has stock 2
        let response = service
            .register(request(
                None,
                &[(products[1].id, 3), (products[0].id, 1), (999, 1), (products[0].id, 0)],
            ))
            .await
            .unwrap();

        assert_eq!(response.accepted, 1);
        assert_eq!(response.total_cents, 1250);

        let reasons: Vec<(usize, RejectionReason)> =
            response.rejected.iter().map(|r| (r.index, r.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (
                    0,
                    RejectionReason::InsufficientStock {
                        available: 2,
                        requested: 3
                    }
                ),
                (2, RejectionReason::ProductNotFound),
                (3, RejectionReason::NonPositiveQuantity),
            ]
        );

        let sugar = db.products().get_by_id(products[1].id).await.unwrap().unwrap();
        assert_eq!(sugar.stock, 2);
    }

    #[tokio::test]
    async fn test_empty_sale_still_dispatches_invoice() {
        let (db, _) = seeded_db().await;
        let mailer = Arc::new(RecordingMailer::default());
        let service = inline_service(&db, mailer.clone());

        let response = service.register(request(None, &[])).await.unwrap();
        assert_eq!(response.total_cents, 0);
        assert_eq!(response.accepted, 0);
        assert_eq!(mailer.sent().len(), 1);

        let lines = db.sales().get_lines(response.sale_id).await.unwrap();
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn test_same_national_id_reuses_customer() {
        let (db, products) = seeded_db().await;
        let service = inline_service(&db, Arc::new(RecordingMailer::default()));

        let first = service
            .register(request(Some(" 30111222 "), &[(products[0].id, 1)]))
            .await
            .unwrap();
        let second = service
            .register(request(Some("30111222"), &[(products[0].id, 1)]))
            .await
            .unwrap();

        assert_eq!(first.customer_id, second.customer_id);
        assert_eq!(db.customers().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_failure_keeps_sale() {
        let (db, products) = seeded_db().await;
        let service = inline_service(&db, Arc::new(FailingMailer));

        let err = service
            .register(request(None, &[(products[0].id, 2)]))
            .await
            .unwrap_err();

        let sale_id = err.sale_id().unwrap();
        assert!(matches!(err, ServiceError::InvoiceDispatch { .. }));

        let sale = db.sales().get_by_id(sale_id).await.unwrap().unwrap();
        assert_eq!(sale.total_cents, 2500);
        assert_eq!(sale.invoice_status, InvoiceStatus::Failed);
    }

    #[tokio::test]
    async fn test_validation_saves_nothing() {
        let (db, products) = seeded_db().await;
        let service = inline_service(&db, Arc::new(RecordingMailer::default()));

        let mut bad_email = request(None, &[(products[0].id, 1)]);
        bad_email.customer_email = "not-an-email".to_string();
        let err = service.register(bad_email).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InvalidFormat { .. })
        ));

        let too_many: Vec<(i64, i64)> = (0..101).map(|_| (products[0].id, 1)).collect();
        let err = service.register(request(None, &too_many)).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::TooManyLines { max: 100, requested: 101 })
        ));

        assert!(db.sales().list_recent(10).await.unwrap().is_empty());
        assert!(db.customers().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resend_after_failure() {
        let (db, products) = seeded_db().await;
        let failing = inline_service(&db, Arc::new(FailingMailer));
        let sale_id = failing
            .register(request(None, &[(products[0].id, 1)]))
            .await
            .unwrap_err()
            .sale_id()
            .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let working = inline_service(&db, mailer.clone());
        let sale = working.resend_invoice(sale_id).await.unwrap();

        assert_eq!(sale.invoice_status, InvoiceStatus::Sent);
        assert!(sale.invoice_error.is_none());
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_invoice_pdf_does_not_send() {
        let (db, products) = seeded_db().await;
        let mailer = Arc::new(RecordingMailer::default());
        let service = inline_service(&db, mailer.clone());

        let sale_id = service
            .register(request(None, &[(products[0].id, 1)]))
            .await
            .unwrap()
            .sale_id;

        let pdf = service.invoice_pdf(sale_id).await.unwrap();
        assert!(pdf.bytes.starts_with(b"%PDF"));
        assert_eq!(pdf.filename, format!("factura-{}.pdf", sale_id));
        assert_eq!(mailer.sent().len(), 1);

        assert!(matches!(
            service.invoice_pdf(999).await.unwrap_err(),
            ServiceError::SaleNotFound(999)
        ));
    }

    #[tokio::test]
    async fn test_queued_mode_responds_pending() {
        let (db, products) = seeded_db().await;
        let mailer = Arc::new(RecordingMailer::default());
        let renderer = InvoiceRenderer::new(IssuerProfile::default(), TaxRate::default(), None);
        let delivery = InvoiceDelivery::new(db.clone(), renderer, mailer.clone());
        let (worker, queue) = InvoiceWorker::new(delivery.clone(), 8);
        let service = SaleService::new(db.clone(), delivery, DeliveryMode::Queued, Some(queue));

        let response = service
            .register(request(None, &[(products[0].id, 1)]))
            .await
            .unwrap();
        assert_eq!(response.invoice_status, InvoiceStatus::Pending);
        assert!(mailer.sent().is_empty());

        // The worker has not run yet; the startup sweep finds the sale
        assert_eq!(worker.recover_pending().await.unwrap(), 1);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[test]
    fn test_legacy_field_names() {
        let body = r#"{
            "nombre_cliente": "Ana Diaz",
            "email_cliente": "ana@example.com",
            "dni_cliente": "30111222",
            "productos": [{"producto_id": 1, "cantidad": 2}]
        }"#;

        let parsed: RegisterSaleRequest = serde_json::from_str(body).unwrap();
        assert_eq!(parsed, request(Some("30111222"), &[(1, 2)]));
    }

    #[tokio::test]
    async fn test_queued_without_queue_falls_back_to_inline() {
        let (db, _) = seeded_db().await;
        let service = inline_service(&db, Arc::new(RecordingMailer::default()));
        let queued = SaleService::new(db, service.delivery.clone(), DeliveryMode::Queued, None);
        assert_eq!(queued.mode(), DeliveryMode::Inline);
    }
}
