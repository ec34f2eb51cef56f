//! # Validation Module
//!
//! Input validation shared by the catalog endpoints and sale registration.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (serde)                                       │
//! │  └── Types and required fields                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, ranges, email shape                                      │
//! │  └── Line count per sale                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (stock >= 0), CHECK (quantity > 0)                          │
//! │  └── UNIQUE (national_id)                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-line stock and quantity rules are not validation failures; see
//! [`crate::sale::evaluate_line`].

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{CustomerDraft, NewProduct};
use crate::{
    MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_NATIONAL_ID_LEN, MAX_PRICE_CENTS, MAX_SALE_LINES, MAX_STOCK,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name: non-empty, at most 100 characters.
///
/// ## Example
/// ```rust
/// use factura_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Agua Mineral 500ml").is_ok());
/// assert!(validate_product_name("  ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, MAX_NAME_LEN)
}

pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_text("customer_name", name, MAX_NAME_LEN)
}

/// Validates an email address shape.
///
/// ## Rules
/// - Non-empty, at most 100 characters
/// - Exactly one `@` with text on both sides
/// - Domain contains a dot and no whitespace anywhere
///
/// The mail relay is the final judge; this only catches obvious typos
/// before a sale is written.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    validate_text("customer_email", email, MAX_EMAIL_LEN)?;

    let email = email.trim();
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "customer_email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(invalid("must contain exactly one '@'")),
    };

    if local.is_empty() || domain.is_empty() {
        return Err(invalid("must have text before and after '@'"));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must contain a dot"));
    }

    Ok(())
}

/// Validates an optional national ID. Blank counts as absent.
pub fn validate_national_id(national_id: Option<&str>) -> ValidationResult<()> {
    match national_id.map(str::trim) {
        Some(id) if id.chars().count() > MAX_NATIONAL_ID_LEN => Err(ValidationError::TooLong {
            field: "customer_national_id".to_string(),
            max: MAX_NATIONAL_ID_LEN,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

fn validate_range(field: &str, value: i64, max: i64) -> ValidationResult<()> {
    if !(0..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max,
        });
    }

    Ok(())
}

/// Validates a price in cents: zero up to [`MAX_PRICE_CENTS`].
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    validate_range("price", cents, MAX_PRICE_CENTS)
}

/// Validates a stock count: zero up to [`MAX_STOCK`].
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    validate_range("stock", stock, MAX_STOCK)
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_stock(product.stock)
}

pub fn validate_customer(customer: &CustomerDraft) -> ValidationResult<()> {
    validate_customer_name(&customer.name)?;
    validate_email(&customer.email)?;
    validate_national_id(customer.national_id.as_deref())
}

/// Validates the number of requested lines in one sale.
///
/// An empty list is valid and yields a zero-total sale.
pub fn validate_line_count(count: usize) -> CoreResult<()> {
    if count > MAX_SALE_LINES {
        return Err(CoreError::TooManyLines {
            max: MAX_SALE_LINES,
            requested: count,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
