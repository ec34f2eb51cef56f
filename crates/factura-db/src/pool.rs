//! # Pool and Database Handle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  [database] in factura.toml                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig ──► Database::new ──► SqlitePool (WAL, foreign keys on)       │
//! │                     │                                                   │
//! │                     └── migrations applied once per open                │
//! │                                                                         │
//! │  Database (Clone) ──► products() customers() sales() reports()          │
//! │       ▲                                                                 │
//! │       └── shared by HTTP handlers and the invoice worker                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! WAL keeps dashboard reads from blocking on a sale that is being written.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::customer::CustomerRepository;
use crate::repository::product::ProductRepository;
use crate::repository::report::ReportingRepository;
use crate::repository::sale::SaleRepository;

const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the ledger lives and how many connections may touch it.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/factura/factura.db").max_connections(5);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// File path, or `:memory:` for a private throwaway database.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Upper bound on waiting for a free connection.
    pub acquire_timeout: Duration,
    /// `None` keeps idle connections forever. An in-memory database is lost
    /// with its last connection, so it needs `None`.
    pub idle_timeout: Option<Duration>,
    pub migrate_on_open: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            migrate_on_open: true,
        }
    }

    /// One pinned connection, so every repository sees the same database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: None,
            migrate_on_open: true,
        }
    }

    pub fn max_connections(self, max_connections: u32) -> Self {
        DbConfig {
            max_connections,
            ..self
        }
    }

    pub fn min_connections(self, min_connections: u32) -> Self {
        DbConfig {
            min_connections,
            ..self
        }
    }

    pub fn acquire_timeout(self, acquire_timeout: Duration) -> Self {
        DbConfig {
            acquire_timeout,
            ..self
        }
    }

    pub fn migrate_on_open(self, migrate_on_open: bool) -> Self {
        DbConfig {
            migrate_on_open,
            ..self
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        if self.is_in_memory() {
            return SqliteConnectOptions::from_str("sqlite::memory:")
                .map(|options| options.foreign_keys(true))
                .map_err(|e| DbError::ConnectionFailed(e.to_string()));
        }

        Ok(SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // off by default in SQLite
            .foreign_keys(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Entry point to the repositories. Clones share one pool.
///
/// ```rust,ignore
/// let registered = db.sales().register(&draft, &lines).await?;
/// let data = db.sales().get_invoice_data(registered.sale.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and migrates it unless
    /// `migrate_on_open` is off.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening ledger database");

        let options = config.connect_options()?;
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout);
        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(
            max = config.max_connections,
            min = config.min_connections,
            "Pool ready"
        );

        let db = Database { pool };
        if config.migrate_on_open {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Safe to call repeatedly; applied versions are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        info!("Schema up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn reports(&self) -> ReportingRepository {
        ReportingRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections, then closes them all.
    pub async fn close(&self) {
        info!("Closing ledger database");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
