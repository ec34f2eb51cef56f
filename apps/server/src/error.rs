//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Factura POS                            │
//! │                                                                         │
//! │  ValidationError ─► CoreError ─┐                                       │
//! │  DbError ──────────────────────┼─► ServiceError ─► ApiError ─► HTTP   │
//! │  InvoiceError / DispatchError ─┘                                       │
//! │                                                                         │
//! │  code                      status  saved?                              │
//! │  ────                      ──────  ──────                              │
//! │  VALIDATION_ERROR          400     nothing                             │
//! │  NOT_FOUND                 404     nothing                             │
//! │  DATABASE_ERROR            500     nothing                             │
//! │  INVOICE_RENDER_FAILED     502     sale saved, `sale_id` set           │
//! │  INVOICE_DISPATCH_FAILED   502     sale saved, `sale_id` set           │
//! │  INTERNAL                  500     sale saved if `sale_id` is set      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use factura_core::{CoreError, ValidationError};
use factura_db::DbError;

use crate::services::ServiceError;

/// Body of every error response.
///
/// ```json
/// {
///   "code": "INVOICE_DISPATCH_FAILED",
///   "message": "Sale 42 saved but its invoice could not be sent: ...",
///   "sale_id": 42
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Committed sale the failure refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Resource not found (404)
    NotFound,

    /// Database operation failed, nothing saved (500)
    DatabaseError,

    /// Sale saved, invoice not produced (502)
    InvoiceRenderFailed,

    /// Sale saved, invoice not sent (502)
    InvoiceDispatchFailed,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InvoiceRenderFailed | ErrorCode::InvoiceDispatchFailed => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            sale_id: None,
        }
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn with_sale(mut self, sale_id: Option<i64>) -> Self {
        self.sale_id = sale_id;
        self
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        if status.is_server_error() {
            error!(code = ?self.code, sale_id = ?self.sale_id, message = %self.message, "Request failed");
        }
        (status, Json(self)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// Converts database errors to API errors.
///
/// Constraint violations come from bad input the validators let through,
/// so they are reported as validation errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            DbError::Core(e) => e.into(),
            e @ (DbError::UniqueViolation { .. }
            | DbError::ForeignKeyViolation { .. }
            | DbError::CheckViolation { .. }) => ApiError::validation(e.to_string()),
            e => ApiError::new(ErrorCode::DatabaseError, e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    /// Every domain rule failure is the client's input.
    fn from(err: CoreError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let sale_id = err.sale_id();
        let api = match err {
            ServiceError::Validation(e) => e.into(),
            ServiceError::Core(e) => e.into(),
            ServiceError::Database(e) => e.into(),
            ServiceError::SaleNotFound(id) => ApiError::not_found("Sale", id),
            e @ ServiceError::InvoiceRender { .. } => {
                ApiError::new(ErrorCode::InvoiceRenderFailed, e.to_string())
            }
            e @ ServiceError::InvoiceDispatch { .. } => {
                ApiError::new(ErrorCode::InvoiceDispatchFailed, e.to_string())
            }
            e @ (ServiceError::QueueClosed { .. } | ServiceError::InvoiceStatus { .. }) => {
                ApiError::internal(e.to_string())
            }
        };
        api.with_sale(sale_id)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use factura_invoice::DispatchError;

    #[test]
    fn test_codes_serialize_screaming_snake() {
        let json = serde_json::to_value(ApiError::new(ErrorCode::InvoiceDispatchFailed, "x"))
            .unwrap();
        assert_eq!(json["code"], "INVOICE_DISPATCH_FAILED");
        assert!(json.get("sale_id").is_none());
    }

    #[test]
    fn test_db_error_mapping() {
        let api: ApiError = DbError::not_found("Product", 3).into();
        assert_eq!(api.code, ErrorCode::NotFound);
        assert_eq!(api.message, "Product not found: 3");

        let api: ApiError = DbError::CheckViolation {
            message: "CHECK constraint failed: stock >= 0".into(),
        }
        .into();
        assert_eq!(api.code, ErrorCode::ValidationError);

        let api: ApiError = DbError::PoolExhausted.into();
        assert_eq!(api.code, ErrorCode::DatabaseError);
        assert_eq!(api.code.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invoice_failure_carries_sale_id() {
        let err = ServiceError::InvoiceDispatch {
            sale_id: 42,
            source: DispatchError::Connection("refused".into()),
        };
        let api: ApiError = err.into();

        assert_eq!(api.code, ErrorCode::InvoiceDispatchFailed);
        assert_eq!(api.code.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(api.sale_id, Some(42));
        assert!(api.message.contains("Sale 42 saved"));
    }

    #[test]
    fn test_too_many_lines_is_validation() {
        let api: ApiError = ServiceError::Core(CoreError::TooManyLines {
            max: 100,
            requested: 101,
        })
        .into();
        assert_eq!(api.code, ErrorCode::ValidationError);
        assert_eq!(api.sale_id, None);
    }

    #[test]
    fn test_overflow_inside_transaction_is_validation() {
        let api: ApiError = DbError::Core(CoreError::AmountOverflow("line 1".into())).into();
        assert_eq!(api.code, ErrorCode::ValidationError);
        assert_eq!(api.message, "amount out of range: line 1");
    }

    #[test]
    fn test_unrecorded_status_keeps_sale_id() {
        let err = ServiceError::InvoiceStatus {
            sale_id: 7,
            source: DbError::ConnectionFailed("pool closed".into()),
        };
        let api: ApiError = err.into();

        assert_eq!(api.code, ErrorCode::Internal);
        assert_eq!(api.sale_id, Some(7));
        assert!(api.message.contains("Sale 7 saved"));
    }
}
