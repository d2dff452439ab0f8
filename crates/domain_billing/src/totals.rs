//! Invoice-level totals assembled from line items

use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money};

use crate::error::BillingError;
use crate::line_item::{InvoiceLineItem, LineItemTotals};

/// Aggregated amounts for an invoice
///
/// Each component is the sum of the same component across every line item,
/// so `total_amount == subtotal - discount_amount + tax_amount` holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
}

impl InvoiceTotals {
    pub fn zero(currency: Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            subtotal: zero,
            discount_amount: zero,
            tax_amount: zero,
            total_amount: zero,
        }
    }

    fn accumulate(self, line: &LineItemTotals) -> Result<Self, BillingError> {
        Ok(Self {
            subtotal: self.subtotal.checked_add(&line.subtotal)?,
            discount_amount: self.discount_amount.checked_add(&line.discount)?,
            tax_amount: self.tax_amount.checked_add(&line.tax)?,
            total_amount: self.total_amount.checked_add(&line.total)?,
        })
    }
}

/// Sums line item totals into invoice totals
///
/// Tax comes from each item's stored snapshots. Every item must be priced in
/// `currency`.
pub fn calculate_invoice_totals(
    items: &[InvoiceLineItem],
    currency: Currency,
) -> Result<InvoiceTotals, BillingError> {
    items.iter().try_fold(InvoiceTotals::zero(currency), |acc, item| {
        if item.currency() != currency {
            return Err(BillingError::invalid_line_item(format!(
                "line item '{}' is priced in {}, invoice is in {}",
                item.description,
                item.currency(),
                currency
            )));
        }
        acc.accumulate(&item.totals()?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_item::LineItemTax;
    use core_kernel::{Rate, TaxRateId};
    use domain_tax::ItemType;
    use rust_decimal_macros::dec;

    fn cad(cents: i64) -> Money {
        Money::from_cents(cents, Currency::CAD)
    }

    fn tax(cents: i64, name: &str, rate: rust_decimal::Decimal) -> LineItemTax {
        LineItemTax {
            tax_rate_id: TaxRateId::new(),
            tax_amount: cad(cents),
            tax_rate_snapshot: Rate::new(rate),
            tax_name_snapshot: name.to_string(),
        }
    }

    #[test]
    fn test_empty_invoice_is_zero() {
        let totals = calculate_invoice_totals(&[], Currency::CAD).unwrap();
        assert_eq!(totals, InvoiceTotals::zero(Currency::CAD));
    }

    #[test]
    fn test_components_sum_across_items() {
        let items = vec![
            InvoiceLineItem::new("Monthly membership", ItemType::ClassEnrollment, cad(5000))
                .with_quantity(dec!(2))
                .with_discount_rate(dec!(10))
                .with_tax(tax(450, "GST", dec!(0.05))),
            InvoiceLineItem::new("Sparring gloves", ItemType::Product, cad(4000))
                .with_tax(tax(200, "GST", dec!(0.05)))
                .with_tax(tax(280, "PST_BC", dec!(0.07))),
        ];

        let totals = calculate_invoice_totals(&items, Currency::CAD).unwrap();
        assert_eq!(totals.subtotal, cad(14000));
        assert_eq!(totals.discount_amount, cad(1000));
        assert_eq!(totals.tax_amount, cad(930));
        assert_eq!(totals.total_amount, cad(13930));
    }

    #[test]
    fn test_mixed_currency_rejected() {
        let items = vec![
            InvoiceLineItem::new("Membership", ItemType::ClassEnrollment, cad(5000)),
            InvoiceLineItem::new(
                "Seminar",
                ItemType::IndividualSession,
                Money::from_cents(3000, Currency::USD),
            ),
        ];

        let err = calculate_invoice_totals(&items, Currency::CAD).unwrap_err();
        assert!(matches!(err, BillingError::InvalidLineItem(_)));
    }
}
