//! # Invoice Layout
//!
//! Everything printed on an invoice, as plain strings, before any drawing.
//! Keeping this separate from [`crate::render`] lets tests check content
//! without parsing PDF output.
//!
//! ## Page Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FACTURA                                    │
//! │  ┌──────┐  Arca Continental                        Factura N°: 42      │
//! │  │ logo │  Calle Maria de Quiroga, ...             Fecha: 16/10/2026   │
//! │  └──────┘  RFC: http://www.arcacontal.com/                             │
//! │            Tel: 03804-901110                       Facturado a:        │
//! │                                                    Ana Diaz            │
//! │                                                    DNI: 30111222       │
//! │                                                    Email: ana@...      │
//! │  ┌──────────────────┬──────────┬─────────────┬──────────┐              │
//! │  │ Producto         │ Cantidad │ P. Unitario │ Subtotal │ ← accent     │
//! │  ├──────────────────┼──────────┼─────────────┼──────────┤              │
//! │  │ Yerba Mate       │    2     │     $12.50  │  $25.00  │              │
//! │  └──────────────────┴──────────┴─────────────┴──────────┘              │
//! │                                              Subtotal:    $35.00       │
//! │                                              IVA (16%):    $5.60       │
//! │                                            ┌─────────────────────┐     │
//! │                                            │ TOTAL:      $40.60  │     │
//! │                                            └─────────────────────┘     │
//! │  Gracias por su compra. ¡Esperamos verlo pronto!                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use factura_core::error::CoreResult;
use factura_core::{InvoiceData, InvoiceTotals, TaxRate};

pub const TITLE: &str = "FACTURA";

pub const TABLE_HEADER: [&str; 4] = ["Producto", "Cantidad", "P. Unitario", "Subtotal"];

// =============================================================================
// Issuer Profile
// =============================================================================

/// The business printed in the invoice header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerProfile {
    pub name: String,
    pub address: String,
    pub website: String,
    pub phone: String,
    /// Closing line under the totals.
    pub footer: String,
}

impl Default for IssuerProfile {
    fn default() -> Self {
        IssuerProfile {
            name: "Arca Continental".to_string(),
            address: "Calle Maria de Quiroga, Ciudad de La Rioja".to_string(),
            website: "RFC: http://www.arcacontal.com/".to_string(),
            phone: "Tel: 03804-901110".to_string(),
            footer: "Gracias por su compra. ¡Esperamos verlo pronto!".to_string(),
        }
    }
}

impl IssuerProfile {
    /// Header lines, name first. Blank fields are left out.
    pub fn lines(&self) -> Vec<String> {
        [&self.name, &self.address, &self.website, &self.phone]
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .collect()
    }
}

// =============================================================================
// Layout
// =============================================================================

/// One label/value row of the totals block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub label: String,
    pub value: String,
}

/// The resolved content of one invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceLayout {
    pub number: i64,
    pub issuer_lines: Vec<String>,
    /// Right-hand header block. Empty strings are vertical gaps.
    pub customer_lines: Vec<String>,
    /// `[name, quantity, unit price, line total]` per sale line.
    pub rows: Vec<[String; 4]>,
    /// Subtotal, tax, then the grand total (drawn emphasized).
    pub summary: Vec<SummaryRow>,
    pub footer: String,
    pub totals: InvoiceTotals,
}

impl InvoiceLayout {
    /// Resolves every printed string for `data`.
    ///
    /// `offset` is the local timezone the invoice date is printed in.
    /// Fails only when a line or total does not fit in i64 cents.
    pub fn build(
        data: &InvoiceData,
        issuer: &IssuerProfile,
        rate: TaxRate,
        offset: FixedOffset,
    ) -> CoreResult<Self> {
        let totals = data.totals(rate)?;
        let date = data.sale.created_at.with_timezone(&offset).format("%d/%m/%Y");

        let customer_lines = vec![
            format!("Factura N°: {}", data.number()),
            format!("Fecha: {}", date),
            String::new(),
            "Facturado a:".to_string(),
            data.customer.name.clone(),
            format!("DNI: {}", data.customer.national_id.as_deref().unwrap_or("-")),
            format!("Email: {}", data.customer.email),
        ];

        let rows = data
            .lines
            .iter()
            .map(|line| {
                Ok([
                    line.product_name_snapshot.clone(),
                    line.quantity.to_string(),
                    line.unit_price().to_string(),
                    line.line_total()?.to_string(),
                ])
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let summary = vec![
            SummaryRow {
                label: "Subtotal:".to_string(),
                value: totals.subtotal.to_string(),
            },
            SummaryRow {
                label: format!("IVA ({}):", rate.label()),
                value: totals.tax.to_string(),
            },
            SummaryRow {
                label: "TOTAL:".to_string(),
                value: totals.total.to_string(),
            },
        ];

        Ok(InvoiceLayout {
            number: data.number(),
            issuer_lines: issuer.lines(),
            customer_lines,
            rows,
            summary,
            footer: issuer.footer.clone(),
            totals,
        })
    }
}
