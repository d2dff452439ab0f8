//! Invoice DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{Currency, Money, Rate, TaxRateId};
use domain_billing::{InvoiceLineItem, InvoiceTotals, LineItemTax, LineItemTotals};
use domain_tax::ItemType;

#[derive(Debug, Deserialize, Validate)]
pub struct InvoiceTotalsRequest {
    #[validate(nested)]
    pub line_items: Vec<LineItemRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LineItemRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    pub item_type: ItemType,
    pub quantity: Decimal,
    #[validate(range(min = 0))]
    pub unit_price_cents: i64,
    /// Percent taken off the line subtotal
    #[serde(default)]
    pub discount_rate: Decimal,
    /// Stored tax snapshots; when absent taxes are computed from the rates
    /// that currently apply to `item_type`
    #[validate(nested)]
    pub taxes: Option<Vec<LineItemTaxRequest>>,
}

impl LineItemRequest {
    /// The line item and whether its taxes still need computing
    pub fn into_domain(self, currency: Currency) -> (InvoiceLineItem, bool) {
        let mut item = InvoiceLineItem::new(
            self.description,
            self.item_type,
            Money::from_cents(self.unit_price_cents, currency),
        )
        .with_quantity(self.quantity)
        .with_discount_rate(self.discount_rate);

        match self.taxes {
            Some(taxes) => {
                for tax in taxes {
                    item = item.with_tax(tax.into_domain(currency));
                }
                (item, false)
            }
            None => (item, true),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LineItemTaxRequest {
    pub tax_rate_id: TaxRateId,
    #[validate(range(min = 0))]
    pub tax_amount_cents: i64,
    pub tax_rate_snapshot: Decimal,
    #[validate(length(min = 1, max = 100))]
    pub tax_name_snapshot: String,
}

impl LineItemTaxRequest {
    fn into_domain(self, currency: Currency) -> LineItemTax {
        LineItemTax {
            tax_rate_id: self.tax_rate_id,
            tax_amount: Money::from_cents(self.tax_amount_cents, currency),
            tax_rate_snapshot: Rate::new(self.tax_rate_snapshot),
            tax_name_snapshot: self.tax_name_snapshot,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaxLineResponse {
    pub tax_rate_id: TaxRateId,
    pub tax_name_snapshot: String,
    pub tax_rate_snapshot: Decimal,
    pub tax_amount_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct LineItemTotalsResponse {
    pub description: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub taxes: Vec<TaxLineResponse>,
}

impl LineItemTotalsResponse {
    pub fn new(item: &InvoiceLineItem, totals: &LineItemTotals) -> Self {
        Self {
            description: item.description.clone(),
            subtotal_cents: totals.subtotal.to_cents(),
            discount_cents: totals.discount.to_cents(),
            tax_cents: totals.tax.to_cents(),
            total_cents: totals.total.to_cents(),
            taxes: item
                .taxes
                .iter()
                .map(|tax| TaxLineResponse {
                    tax_rate_id: tax.tax_rate_id,
                    tax_name_snapshot: tax.tax_name_snapshot.clone(),
                    tax_rate_snapshot: tax.tax_rate_snapshot.as_decimal(),
                    tax_amount_cents: tax.tax_amount.to_cents(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceTotalsResponse {
    pub currency: Currency,
    pub subtotal_cents: i64,
    pub discount_amount_cents: i64,
    pub tax_amount_cents: i64,
    pub total_amount_cents: i64,
    pub line_items: Vec<LineItemTotalsResponse>,
}

impl InvoiceTotalsResponse {
    pub fn new(currency: Currency, totals: &InvoiceTotals, line_items: Vec<LineItemTotalsResponse>) -> Self {
        Self {
            currency,
            subtotal_cents: totals.subtotal.to_cents(),
            discount_amount_cents: totals.discount_amount.to_cents(),
            tax_amount_cents: totals.tax_amount.to_cents(),
            total_amount_cents: totals.total_amount.to_cents(),
            line_items,
        }
    }
}
