//! # Invoice Worker
//!
//! Background delivery for `delivery = "queued"`.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /sales ──► commit ──► InvoiceQueue::enqueue(sale_id) ──► 200     │
//! │                                    │                                    │
//! │                                    ▼  mpsc                              │
//! │                          ┌───────────────────┐                          │
//! │                          │  InvoiceWorker    │                          │
//! │                          │  deliver_if_unsent│──► render ──► SMTP       │
//! │                          └───────────────────┘        │                 │
//! │                                                       ▼                 │
//! │                                          sales.invoice_status           │
//! │                                          pending → sent | failed        │
//! │                                                                         │
//! │  STARTUP: recover_pending() delivers every sale still `pending`,       │
//! │  i.e. commits whose delivery never ran before a crash or shutdown.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queued ids that were not processed before shutdown stay `pending` in the
//! database and are picked up by the next startup sweep.

use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::delivery::InvoiceDelivery;
use super::{ServiceError, ServiceResult};

/// Sales read per sweep query.
const SWEEP_BATCH: i64 = 100;

// =============================================================================
// Queue Handle
// =============================================================================

/// Handle for feeding and stopping the worker.
#[derive(Debug, Clone)]
pub struct InvoiceQueue {
    queue_tx: mpsc::Sender<i64>,
    shutdown_tx: mpsc::Sender<()>,
}

impl InvoiceQueue {
    /// Schedules delivery of `sale_id`. Waits if the channel is full.
    pub async fn enqueue(&self, sale_id: i64) -> ServiceResult<()> {
        self.queue_tx
            .send(sale_id)
            .await
            .map_err(|_| ServiceError::QueueClosed { sale_id })?;
        debug!(sale_id, "Invoice queued");
        Ok(())
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Invoice worker already stopped");
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

pub struct InvoiceWorker {
    delivery: InvoiceDelivery,
    queue_rx: mpsc::Receiver<i64>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl InvoiceWorker {
    /// Creates a worker and the handle that feeds it.
    pub fn new(delivery: InvoiceDelivery, capacity: usize) -> (Self, InvoiceQueue) {
        let (queue_tx, queue_rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = InvoiceWorker {
            delivery,
            queue_rx,
            shutdown_rx,
        };

        (worker, InvoiceQueue { queue_tx, shutdown_tx })
    }

    /// Delivers every sale still marked `pending`, oldest first.
    ///
    /// Call before the server accepts requests so the sweep cannot race a
    /// fresh registration. Returns the number of sales attempted.
    pub async fn recover_pending(&self) -> ServiceResult<usize> {
        let mut attempted = HashSet::new();

        loop {
            let ids = self
                .delivery
                .db()
                .sales()
                .list_pending_invoices(SWEEP_BATCH)
                .await?;

            let fresh: Vec<i64> = ids.into_iter().filter(|id| !attempted.contains(id)).collect();
            if fresh.is_empty() {
                break;
            }

            for sale_id in fresh {
                attempted.insert(sale_id);
                self.process(sale_id).await;
            }
        }

        if !attempted.is_empty() {
            info!(count = attempted.len(), "Recovered pending invoices");
        }

        Ok(attempted.len())
    }

    /// Runs the worker loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Invoice worker starting");

        loop {
            tokio::select! {
                received = self.queue_rx.recv() => match received {
                    Some(sale_id) => self.process(sale_id).await,
                    None => {
                        debug!("Invoice queue closed");
                        break;
                    }
                },

                _ = self.shutdown_rx.recv() => {
                    info!("Invoice worker shutting down");
                    break;
                }
            }
        }

        info!("Invoice worker stopped");
    }

    async fn process(&self, sale_id: i64) {
        match self.delivery.deliver_if_unsent(sale_id).await {
            Ok(true) => {}
            Ok(false) => debug!(sale_id, "Invoice already sent, skipping"),
            Err(e @ (ServiceError::InvoiceRender { .. } | ServiceError::InvoiceDispatch { .. })) => {
                // recorded as failed by InvoiceDelivery
                warn!(sale_id, error = %e, "Queued invoice not delivered");
            }
            Err(e) => error!(sale_id, error = %e, "Invoice worker error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seeded_db, RecordingMailer};
    use factura_core::{CustomerDraft, InvoiceStatus, LineRequest, TaxRate};
    use factura_db::Database;
    use factura_invoice::{InvoiceRenderer, IssuerProfile};
    use std::sync::Arc;
    use std::time::Duration;

    fn draft() -> CustomerDraft {
        CustomerDraft {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            national_id: None,
        }
    }

    fn delivery(db: &Database, mailer: Arc<RecordingMailer>) -> InvoiceDelivery {
        let renderer = InvoiceRenderer::new(IssuerProfile::default(), TaxRate::default(), None);
        InvoiceDelivery::new(db.clone(), renderer, mailer)
    }

    async fn wait_for_status(db: &Database, sale_id: i64, status: InvoiceStatus) {
        for _ in 0..200 {
            let sale = db.sales().get_by_id(sale_id).await.unwrap().unwrap();
            if sale.invoice_status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("sale {} never reached {}", sale_id, status);
    }

    #[tokio::test]
    async fn test_recover_pending_sweeps_unsent_sales() {
        let (db, _) = seeded_db().await;
        let mailer = Arc::new(RecordingMailer::default());

        let first = db.sales().register(&draft(), &[]).await.unwrap().sale.id;
        let second = db.sales().register(&draft(), &[]).await.unwrap().sale.id;
        let done = db.sales().register(&draft(), &[]).await.unwrap().sale.id;
        db.sales().mark_invoice_sent(done).await.unwrap();

        let (worker, _queue) = InvoiceWorker::new(delivery(&db, mailer.clone()), 8);
        assert_eq!(worker.recover_pending().await.unwrap(), 2);

        let filenames: Vec<String> = mailer.sent().into_iter().map(|m| m.filename).collect();
        assert_eq!(
            filenames,
            vec![
                format!("factura-{}.pdf", first),
                format!("factura-{}.pdf", second)
            ]
        );
        assert!(db.sales().list_pending_invoices(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queued_sale_is_delivered() {
        let (db, _) = seeded_db().await;
        let mailer = Arc::new(RecordingMailer::default());

        let (worker, queue) = InvoiceWorker::new(delivery(&db, mailer.clone()), 8);
        let task = tokio::spawn(worker.run());

        let sale_id = db
            .sales()
            .register(&draft(), &[LineRequest::new(1, 2)])
            .await
            .unwrap()
            .sale
            .id;
        queue.enqueue(sale_id).await.unwrap();

        wait_for_status(&db, sale_id, InvoiceStatus::Sent).await;
        assert_eq!(mailer.sent().len(), 1);

        queue.shutdown().await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_enqueue_after_stop_fails() {
        let (db, _) = seeded_db().await;
        let (worker, queue) =
            InvoiceWorker::new(delivery(&db, Arc::new(RecordingMailer::default())), 1);

        drop(worker);
        let err = queue.enqueue(7).await.unwrap_err();
        assert!(matches!(err, ServiceError::QueueClosed { sale_id: 7 }));
    }
}
