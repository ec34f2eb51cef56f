//! # Invoice Data
//!
//! The read shape an invoice is rendered from, and the totals printed in
//! its summary block.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Customer, Sale, SaleLine, TaxRate};

/// A persisted sale with everything needed to render its invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    pub sale: Sale,
    pub customer: Customer,
    pub lines: Vec<SaleLine>,
}

impl InvoiceData {
    /// Invoice number printed on the document.
    pub fn number(&self) -> i64 {
        self.sale.id
    }

    pub fn totals(&self, rate: TaxRate) -> CoreResult<InvoiceTotals> {
        InvoiceTotals::from_lines(&self.lines, rate)
    }
}

/// Summary block figures.
///
/// `subtotal` is recomputed from the lines rather than read from
/// `Sale.total_cents`; the two agree for every sale the ledger commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub rate: TaxRate,
}

impl InvoiceTotals {
    pub fn from_lines(lines: &[SaleLine], rate: TaxRate) -> CoreResult<Self> {
        let overflow = |what: &str| CoreError::AmountOverflow(what.to_string());

        let mut subtotal = Money::zero();
        for line in lines {
            subtotal = subtotal
                .checked_add(line.line_total()?)
                .ok_or_else(|| overflow("invoice subtotal"))?;
        }
        let tax = subtotal.calculate_tax(rate);
        let total = subtotal
            .checked_add(tax)
            .ok_or_else(|| overflow("invoice total"))?;

        Ok(InvoiceTotals {
            subtotal,
            tax,
            total,
            rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn line(quantity: i64, unit_price_cents: i64) -> SaleLine {
        SaleLine {
            id: 0,
            sale_id: 1,
            product_id: Some(1),
            product_name_snapshot: "Item".to_string(),
            quantity,
            unit_price_cents,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_totals_for_sample_sale() {
        let lines = vec![line(2, 1250), line(1, 1000)];
        let totals = InvoiceTotals::from_lines(&lines, TaxRate::from_bps(1600)).unwrap();

        assert_eq!(totals.subtotal.to_string(), "$35.00");
        assert_eq!(totals.tax.to_string(), "$5.60");
        assert_eq!(totals.total.to_string(), "$40.60");
    }

    #[test]
    fn test_totals_for_empty_sale() {
        let totals = InvoiceTotals::from_lines(&[], TaxRate::default()).unwrap();
        assert!(totals.subtotal.is_zero());
        assert!(totals.tax.is_zero());
        assert_eq!(totals.total.to_string(), "$0.00");
    }

    #[test]
    fn test_grand_total_is_subtotal_plus_tax() {
        let lines = vec![line(3, 333), line(7, 19)];
        let totals = InvoiceTotals::from_lines(&lines, TaxRate::from_bps(1600)).unwrap();

        // 999 + 133 = 1132; 1132 × 0.16 = 181.12 → 181
        assert_eq!(totals.subtotal.cents(), 1132);
        assert_eq!(totals.tax.cents(), 181);
        assert_eq!(totals.total.cents(), 1313);
    }

    #[test]
    fn test_totals_past_i64_are_an_error() {
        let lines = vec![line(1, i64::MAX - 10), line(1, 20)];
        assert!(matches!(
            InvoiceTotals::from_lines(&lines, TaxRate::default()),
            Err(CoreError::AmountOverflow(_))
        ));
    }
}
