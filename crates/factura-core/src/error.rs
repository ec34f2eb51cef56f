//! # Domain Errors
//!
//! What can go wrong before a sale ever reaches SQLite.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request body                                                           │
//! │       │  validation::*                                                  │
//! │       ▼                                                                 │
//! │  ValidationError ──(#[from])──► CoreError                               │
//! │                                    │                                    │
//! │                                    ▼                                    │
//! │  ServiceError (apps/server) ──► ApiError { code, message, sale_id }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A line that cannot be sold is not an error here. The ledger reports it as
//! [`crate::sale::LineOutcome::Rejected`] and the sale commits anyway.

use thiserror::Error;

/// Failures of a domain rule.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("a sale accepts at most {max} lines, {requested} were sent")]
    TooManyLines { max: usize, requested: usize },

    /// A line or sale total left the i64 cent range.
    #[error("amount out of range: {0}")]
    AmountOverflow(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A field of the incoming request is unusable.
///
/// Always raised before the first write.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Required { field: String },

    #[error("{field} exceeds {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must lie in {min}..={max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} is malformed: {reason}")]
    InvalidFormat { field: String, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
