//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary. On every
//! open, sqlx compares it with `_sqlx_migrations` and applies what is
//! missing, in file order.
//!
//! ```text
//! 001_initial_schema.sql     products, customers, sales, sale_lines
//! 002_invoice_delivery.sql   invoice_status, invoice_error, invoice_sent_at
//! ```
//!
//! Applied files are checksummed; edit history by adding `NNN_*.sql`,
//! never by changing a released one.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    debug!(known = MIGRATOR.migrations.len(), "Migrator finished");
    Ok(())
}

/// `(embedded, applied)`, reported by `GET /health`.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}
