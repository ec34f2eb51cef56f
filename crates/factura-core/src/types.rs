//! # Domain Types
//!
//! Records shared by every layer of Factura POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (i64)       │   │  id (i64)       │   │  id = invoice № │       │
//! │  │  name           │   │  name, email    │   │  customer_id    │       │
//! │  │  price_cents    │   │  national_id ◄──┼── natural key      │       │
//! │  │  stock ≥ 0      │   │  (unique, opt.) │   │  total_cents    │       │
//! │  └────────┬────────┘   └─────────────────┘   │  invoice_status │       │
//! │           │ snapshot at sale time             └────────┬────────┘       │
//! │           ▼                                            │ 1..N           │
//! │  ┌──────────────────────────────────────────────────────▼────────┐      │
//! │  │  SaleLine: product_id (nullable), product_name_snapshot,      │      │
//! │  │            quantity > 0, unit_price_cents                     │      │
//! │  └───────────────────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every record uses a SQLite surrogate id. The sale id doubles as the
//! invoice number printed on the document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so the default IVA of 16% is 1600 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Percentage label without trailing zeros: `16%`, `8.25%`, `10.5%`.
    ///
    /// ## Example
    /// ```rust
    /// use factura_core::types::TaxRate;
    ///
    /// assert_eq!(TaxRate::from_bps(1600).label(), "16%");
    /// assert_eq!(TaxRate::from_bps(825).label(), "8.25%");
    /// ```
    pub fn label(&self) -> String {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        match (frac, frac % 10) {
            (0, _) => format!("{}%", whole),
            (_, 0) => format!("{}.{}%", whole, frac / 10),
            _ => format!("{}.{:02}%", whole, frac),
        }
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name, also frozen onto sale lines.
    pub name: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Sellable units on hand. Never negative.
    pub stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

/// Fields supplied when adding or editing a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer, created the first time a sale names them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,

    /// National identity document number (DNI). Unique when present.
    pub national_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Customer descriptor carried by a sale registration.
///
/// Name and email only matter when the customer does not exist yet;
/// an existing customer's stored details are never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerDraft {
    pub name: String,
    pub email: String,
    pub national_id: Option<String>,
}

impl CustomerDraft {
    /// Trims every field and turns a blank national ID into `None`.
    pub fn normalized(self) -> Self {
        let national_id = self
            .national_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        CustomerDraft {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            national_id,
        }
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Delivery state of the invoice attached to a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Sale committed, invoice not yet delivered.
    #[default]
    Pending,
    /// Invoice rendered and accepted by the mail relay.
    Sent,
    /// Rendering or delivery failed; see `invoice_error`.
    Failed,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "pending"),
            InvoiceStatus::Sent => write!(f, "sent"),
            InvoiceStatus::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A registered sale. Its id is the invoice number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    pub customer_id: i64,

    /// Sum of the accepted line totals, before tax.
    pub total_cents: i64,

    pub invoice_status: InvoiceStatus,
    pub invoice_error: Option<String>,

    #[ts(as = "Option<String>")]
    pub invoice_sent_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// One accepted line of a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub id: i64,
    pub sale_id: i64,

    /// `None` once the product has been removed from the catalog.
    pub product_id: Option<i64>,

    /// Product name at time of sale (frozen).
    pub product_name_snapshot: String,

    pub quantity: i64,

    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// quantity × unit price at sale time.
    pub fn line_total(&self) -> CoreResult<Money> {
        self.unit_price()
            .checked_multiply_quantity(self.quantity)
            .ok_or_else(|| CoreError::AmountOverflow(format!("line {}", self.id)))
    }
}

// =============================================================================
// Reporting
// =============================================================================

/// Figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    /// Units on hand across the whole catalog.
    pub total_stock_units: i64,
    /// Sum of every sale total.
    pub total_revenue_cents: i64,
    pub sales_today: i64,
    pub sales_last_7_days: i64,
    /// Best sellers by units, at most five.
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TopProduct {
    pub name: String,
    pub quantity_sold: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
