//! # Storage Errors
//!
//! `DbError` is the only error type the repositories return. SQLite reports
//! constraint failures as plain text, so the `sqlx::Error` conversion reads
//! the message to tell a duplicate DNI from a dangling product reference or
//! a stock underflow.
//!
//! ```text
//! sqlx::Error ──► DbError ──► ServiceError ──► ApiError
//!                   │
//!                   └── UNIQUE / FOREIGN KEY / CHECK become 400s upstream
//! ```

use factura_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the row, e.g. `customers.national_id`.
    #[error("{field} must be unique ({value})")]
    UniqueViolation { field: String, value: String },

    #[error("dangling reference: {message}")]
    ForeignKeyViolation { message: String },

    /// Negative stock, non-positive quantity and similar table checks.
    #[error("row rejected by CHECK: {message}")]
    CheckViolation { message: String },

    #[error("cannot open database: {0}")]
    ConnectionFailed(String),

    #[error("schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("statement failed: {0}")]
    QueryFailed(String),

    #[error("timed out waiting for a pooled connection")]
    PoolExhausted,

    #[error("sqlite: {0}")]
    Internal(String),

    /// A domain rule failed inside a transaction, which was rolled back.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }

    fn from_constraint_message(msg: &str) -> Self {
        const UNIQUE: &str = "UNIQUE constraint failed: ";

        if let Some(column) = msg.strip_prefix(UNIQUE) {
            return DbError::UniqueViolation {
                field: column.to_string(),
                value: "duplicate".to_string(),
            };
        }
        if msg.contains("FOREIGN KEY constraint failed") {
            return DbError::ForeignKeyViolation {
                message: msg.to_string(),
            };
        }
        if msg.contains("CHECK constraint failed") {
            return DbError::CheckViolation {
                message: msg.to_string(),
            };
        }
        DbError::QueryFailed(msg.to_string())
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "?"),
            sqlx::Error::Database(db_err) => DbError::from_constraint_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_messages_map_to_kinds() {
        assert!(matches!(
            DbError::from_constraint_message("UNIQUE constraint failed: customers.national_id"),
            DbError::UniqueViolation { ref field, .. } if field == "customers.national_id"
        ));
        assert!(matches!(
            DbError::from_constraint_message("FOREIGN KEY constraint failed"),
            DbError::ForeignKeyViolation { .. }
        ));
        assert!(matches!(
            DbError::from_constraint_message("CHECK constraint failed: stock >= 0"),
            DbError::CheckViolation { .. }
        ));
        assert!(matches!(
            DbError::from_constraint_message("no such table: ventas"),
            DbError::QueryFailed(_)
        ));
    }
}
