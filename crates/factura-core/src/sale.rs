//! # Sale Lines
//!
//! The per-line acceptance rule and the outcome reported back to callers.
//!
//! ## Line Evaluation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For each LineRequest, in submission order:                            │
//! │                                                                         │
//! │   product exists? ──no──► Rejected { ProductNotFound }                 │
//! │        │ yes                                                            │
//! │        ▼                                                                │
//! │   quantity > 0?  ──no──► Rejected { NonPositiveQuantity }              │
//! │        │ yes                                                            │
//! │        ▼                                                                │
//! │   stock ≥ qty?   ──no──► Rejected { InsufficientStock }                │
//! │        │ yes                                                            │
//! │        ▼                                                                │
//! │   Accepted { unit_price_cents, line_total_cents }                      │
//! │                                                                         │
//! │  A rejected line never fails the sale. It is reported and skipped.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Customer, Product, Sale, SaleLine};

// =============================================================================
// Requests
// =============================================================================

/// One requested line of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    pub product_id: i64,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        LineRequest {
            product_id,
            quantity,
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Why a requested line was not sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// No product with the requested id.
    ProductNotFound,
    /// Quantity was zero or negative.
    NonPositiveQuantity,
    /// Not enough units on hand when the line was processed.
    InsufficientStock { available: i64, requested: i64 },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::ProductNotFound => write!(f, "product not found"),
            RejectionReason::NonPositiveQuantity => write!(f, "quantity must be positive"),
            RejectionReason::InsufficientStock {
                available,
                requested,
            } => write!(
                f,
                "insufficient stock: available {}, requested {}",
                available, requested
            ),
        }
    }
}

/// What happened to one requested line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LineOutcome {
    Accepted {
        product_id: i64,
        quantity: i64,
        unit_price_cents: i64,
        line_total_cents: i64,
    },
    Rejected {
        product_id: i64,
        quantity: i64,
        reason: RejectionReason,
    },
}

impl LineOutcome {
    /// Outcome for a line that passed every check against `product`.
    ///
    /// Fails only when price × quantity does not fit in i64 cents.
    pub fn accepted(product: &Product, quantity: i64) -> CoreResult<Self> {
        let line_total = product
            .price()
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| {
                CoreError::AmountOverflow(format!(
                    "{} × {} of product {}",
                    product.price(),
                    quantity,
                    product.id
                ))
            })?;

        Ok(LineOutcome::Accepted {
            product_id: product.id,
            quantity,
            unit_price_cents: product.price_cents,
            line_total_cents: line_total.cents(),
        })
    }

    /// Line total of an accepted outcome, zero for a rejected one.
    pub fn line_total(&self) -> Money {
        match self {
            LineOutcome::Accepted {
                line_total_cents, ..
            } => Money::from_cents(*line_total_cents),
            LineOutcome::Rejected { .. } => Money::zero(),
        }
    }

    pub fn rejected(request: LineRequest, reason: RejectionReason) -> Self {
        LineOutcome::Rejected {
            product_id: request.product_id,
            quantity: request.quantity,
            reason,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, LineOutcome::Accepted { .. })
    }
}

/// Applies the acceptance rule to one line.
///
/// Checks run in a fixed order so the reported reason is deterministic:
/// existence, then quantity, then stock.
///
/// ## Example
/// ```rust
/// use factura_core::sale::{evaluate_line, RejectionReason};
///
/// assert_eq!(evaluate_line(None, 3).unwrap_err(), RejectionReason::ProductNotFound);
/// ```
pub fn evaluate_line(product: Option<&Product>, quantity: i64) -> Result<&Product, RejectionReason> {
    let product = product.ok_or(RejectionReason::ProductNotFound)?;

    if quantity <= 0 {
        return Err(RejectionReason::NonPositiveQuantity);
    }

    if !product.can_sell(quantity) {
        return Err(RejectionReason::InsufficientStock {
            available: product.stock,
            requested: quantity,
        });
    }

    Ok(product)
}

// =============================================================================
// Registered Sale
// =============================================================================

/// Everything a committed registration produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredSale {
    pub sale: Sale,
    pub customer: Customer,
    /// Persisted lines, in submission order.
    pub lines: Vec<SaleLine>,
    /// One outcome per requested line, in submission order.
    pub outcomes: Vec<LineOutcome>,
}

impl RegisteredSale {
    pub fn accepted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }

    pub fn rejected_count(&self) -> usize {
        self.outcomes.len() - self.accepted_count()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
