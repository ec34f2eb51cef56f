//! # Customer Repository
//!
//! Customers are never created from a screen. They appear the first time a
//! sale names them and are matched afterwards by national ID (DNI).
//!
//! ## Natural-Key Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  national_id present?                                                  │
//! │     │                                                                   │
//! │     ├── yes ─► SELECT by national_id ── found ──► reuse (no update)    │
//! │     │                   │                                               │
//! │     │                   └─ missing ─► INSERT … ON CONFLICT DO NOTHING  │
//! │     │                                  then SELECT again               │
//! │     │                                  (a racing insert wins cleanly)  │
//! │     │                                                                   │
//! │     └── no ──► INSERT a fresh customer every time                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use factura_core::{Customer, CustomerDraft};

/// Repository for customer reads.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    pub async fn find_by_national_id(&self, national_id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_national_id(&mut conn, national_id).await
    }

    /// Lists customers, newest first.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, national_id, created_at
            FROM customers
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, email, national_id, created_at
        FROM customers
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

pub async fn fetch_by_national_id(
    conn: &mut SqliteConnection,
    national_id: &str,
) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, email, national_id, created_at
        FROM customers
        WHERE national_id = ?1
        "#,
    )
    .bind(national_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

/// Returns the customer for `draft`, creating it when unknown.
///
/// The draft is expected to be normalized (trimmed, blank ID as `None`).
///
/// ## Returns
/// `(customer, created)` where `created` is true when a row was inserted.
pub async fn resolve_or_create(
    conn: &mut SqliteConnection,
    draft: &CustomerDraft,
) -> DbResult<(Customer, bool)> {
    let now = Utc::now();

    let Some(national_id) = draft.national_id.as_deref() else {
        let result = sqlx::query(
            r#"
            INSERT INTO customers (name, email, national_id, created_at)
            VALUES (?1, ?2, NULL, ?3)
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();
        debug!(customer_id = id, "Created customer without national ID");

        let customer = Customer {
            id,
            name: draft.name.clone(),
            email: draft.email.clone(),
            national_id: None,
            created_at: now,
        };
        return Ok((customer, true));
    };

    if let Some(existing) = fetch_by_national_id(conn, national_id).await? {
        debug!(customer_id = existing.id, "Reusing customer by national ID");
        return Ok((existing, false));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO customers (name, email, national_id, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(national_id) DO NOTHING
        "#,
    )
    .bind(&draft.name)
    .bind(&draft.email)
    .bind(national_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let created = result.rows_affected() == 1;

    let customer = fetch_by_national_id(conn, national_id)
        .await?
        .ok_or_else(|| DbError::not_found("Customer", national_id))?;

    debug!(customer_id = customer.id, created, "Resolved customer by national ID");
    Ok((customer, created))
}

// =============================================================================
// Unit Tests
// =============================================================================
