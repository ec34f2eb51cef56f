//! # Sale Repository
//!
//! The sale ledger: registration of a sale with its lines, reads for the
//! invoice, and invoice delivery status.
//!
//! ## Registration Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       register(draft, lines)                            │
//! │                                                                         │
//! │  BEGIN IMMEDIATE   (write lock up front, waits out other writers)      │
//! │   1. customer::resolve_or_create        (reuse by national ID)         │
//! │   2. INSERT sale (total 0, invoice pending)                            │
//! │   3. for each requested line, in order:                                │
//! │        product::fetch ─► evaluate_line ─► rejected? record, continue   │
//! │        product::try_reserve_stock ─► lost the race? record, continue   │
//! │        INSERT sale_line (name + price snapshot)                        │
//! │        total += quantity × unit price (checked, overflow aborts)       │
//! │   4. UPDATE sale total                                                 │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any database error drops the transaction: no customer, no sale, no    │
//! │  line and no stock change survives.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invoice Status
//! ```text
//!   pending ──mark_invoice_sent──► sent
//!      │
//!      └────mark_invoice_failed──► failed ──mark_invoice_sent──► sent
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::{customer, product};
use crate::error::{DbError, DbResult};
use factura_core::{
    evaluate_line, CoreError, CustomerDraft, InvoiceData, InvoiceStatus, LineOutcome, LineRequest,
    Money, Product, RegisteredSale, RejectionReason, Sale, SaleLine,
};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Registers a sale in one transaction.
    ///
    /// Lines are processed in submission order. A line that fails the
    /// acceptance rule is reported in `outcomes` and skipped; it never fails
    /// the call. An empty `requests` slice still records a zero-total sale.
    ///
    /// ## Errors
    /// Persistence failures, and `DbError::Core(AmountOverflow)` when a line
    /// or the sale total leaves the i64 cent range. Nothing is committed in
    /// either case.
    pub async fn register(
        &self,
        draft: &CustomerDraft,
        requests: &[LineRequest],
    ) -> DbResult<RegisteredSale> {
        // a deferred read-then-write cannot wait for a concurrent writer
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let (customer, created) = customer::resolve_or_create(&mut tx, draft).await?;
        debug!(customer_id = customer.id, created, "Customer resolved");

        let now = Utc::now();
        let sale_id = insert_sale(&mut tx, customer.id, now).await?;

        let mut lines = Vec::with_capacity(requests.len());
        let mut outcomes = Vec::with_capacity(requests.len());
        let mut total = Money::zero();

        for request in requests {
            let found = product::fetch(&mut tx, request.product_id).await?;

            let item = match evaluate_line(found.as_ref(), request.quantity) {
                Ok(item) => item,
                Err(reason) => {
                    debug!(sale_id, product_id = request.product_id, %reason, "Line rejected");
                    outcomes.push(LineOutcome::rejected(*request, reason));
                    continue;
                }
            };

            if !product::try_reserve_stock(&mut tx, item.id, request.quantity).await? {
                // Stock changed between the read and the conditional update.
                let available = product::fetch(&mut tx, item.id)
                    .await?
                    .map(|p| p.stock)
                    .unwrap_or(0);
                let reason = RejectionReason::InsufficientStock {
                    available,
                    requested: request.quantity,
                };
                warn!(sale_id, product_id = item.id, %reason, "Stock reservation lost");
                outcomes.push(LineOutcome::rejected(*request, reason));
                continue;
            }

            let outcome = LineOutcome::accepted(item, request.quantity)?;
            total = total.checked_add(outcome.line_total()).ok_or_else(|| {
                CoreError::AmountOverflow(format!("total of sale {}", sale_id))
            })?;

            lines.push(insert_line(&mut tx, sale_id, item, request.quantity, now).await?);
            outcomes.push(outcome);
        }

        sqlx::query("UPDATE sales SET total_cents = ?2 WHERE id = ?1")
            .bind(sale_id)
            .bind(total.cents())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let sale = Sale {
            id: sale_id,
            customer_id: customer.id,
            total_cents: total.cents(),
            invoice_status: InvoiceStatus::Pending,
            invoice_error: None,
            invoice_sent_at: None,
            created_at: now,
        };

        let registered = RegisteredSale {
            sale,
            customer,
            lines,
            outcomes,
        };

        info!(
            sale_id,
            customer_id = registered.customer.id,
            accepted = registered.accepted_count(),
            rejected = registered.rejected_count(),
            total_cents = registered.sale.total_cents,
            "Sale registered"
        );

        Ok(registered)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Lines of a sale in the order they were registered.
    pub async fn get_lines(&self, sale_id: i64) -> DbResult<Vec<SaleLine>> {
        let mut conn = self.pool.acquire().await?;
        fetch_lines(&mut conn, sale_id).await
    }

    /// Loads a sale with its customer and lines.
    ///
    /// Works for lines whose product was later deleted: the snapshot carries
    /// the name and price.
    pub async fn get_invoice_data(&self, sale_id: i64) -> DbResult<InvoiceData> {
        let mut conn = self.pool.acquire().await?;

        let sale = fetch(&mut conn, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        let customer = customer::fetch(&mut conn, sale.customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", sale.customer_id))?;

        let lines = fetch_lines(&mut conn, sale_id).await?;

        Ok(InvoiceData {
            sale,
            customer,
            lines,
        })
    }

    /// Most recent sales first.
    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, customer_id, total_cents, invoice_status, invoice_error,
                   invoice_sent_at, created_at
            FROM sales
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Records a successful delivery and clears any previous error.
    pub async fn mark_invoice_sent(&self, sale_id: i64) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales SET
                invoice_status = 'sent',
                invoice_error = NULL,
                invoice_sent_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        debug!(sale_id, "Invoice marked sent");
        Ok(())
    }

    pub async fn mark_invoice_failed(&self, sale_id: i64, error: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales SET
                invoice_status = 'failed',
                invoice_error = ?2
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        debug!(sale_id, error, "Invoice marked failed");
        Ok(())
    }

    /// Ids of sales whose invoice was never attempted, oldest first.
    pub async fn list_pending_invoices(&self, limit: i64) -> DbResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM sales
            WHERE invoice_status = 'pending'
            ORDER BY id
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

async fn insert_sale(
    conn: &mut SqliteConnection,
    customer_id: i64,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO sales (customer_id, total_cents, invoice_status, created_at)
        VALUES (?1, 0, 'pending', ?2)
        "#,
    )
    .bind(customer_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

async fn insert_line(
    conn: &mut SqliteConnection,
    sale_id: i64,
    product: &Product,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<SaleLine> {
    let result = sqlx::query(
        r#"
        INSERT INTO sale_lines (
            sale_id, product_id, product_name_snapshot,
            quantity, unit_price_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(sale_id)
    .bind(product.id)
    .bind(&product.name)
    .bind(quantity)
    .bind(product.price_cents)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(SaleLine {
        id: result.last_insert_rowid(),
        sale_id,
        product_id: Some(product.id),
        product_name_snapshot: product.name.clone(),
        quantity,
        unit_price_cents: product.price_cents,
        created_at: now,
    })
}

async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        SELECT id, customer_id, total_cents, invoice_status, invoice_error,
               invoice_sent_at, created_at
        FROM sales
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(sale)
}

async fn fetch_lines(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<SaleLine>> {
    let lines = sqlx::query_as::<_, SaleLine>(
        r#"
        SELECT id, sale_id, product_id, product_name_snapshot,
               quantity, unit_price_cents, created_at
        FROM sale_lines
        WHERE sale_id = ?1
        ORDER BY id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

// =============================================================================
// Unit Tests
// =============================================================================
