//! Invoice line items and their tax snapshots

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, LineItemId, Money, Rate, TaxRateId};
use domain_tax::{ItemType, TaxRate};

use crate::error::BillingError;

/// A tax charged on a line item, frozen when the invoice was created
///
/// The name and rate are copied from the [`TaxRate`] so later edits to the
/// rate never change a historical invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemTax {
    pub tax_rate_id: TaxRateId,
    pub tax_amount: Money,
    pub tax_rate_snapshot: Rate,
    pub tax_name_snapshot: String,
}

impl LineItemTax {
    pub fn snapshot(rate: &TaxRate, tax_amount: Money) -> Self {
        Self {
            tax_rate_id: rate.id,
            tax_amount,
            tax_rate_snapshot: rate.rate,
            tax_name_snapshot: rate.name.clone(),
        }
    }
}

/// Computed amounts for one line item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

/// One billed line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub id: LineItemId,
    pub description: String,
    pub item_type: ItemType,
    pub quantity: Decimal,
    pub unit_price: Money,
    /// Percentage off the line subtotal, `0..=100`
    #[serde(default)]
    pub discount_rate: Decimal,
    #[serde(default)]
    pub taxes: Vec<LineItemTax>,
}

impl InvoiceLineItem {
    pub fn new(description: impl Into<String>, item_type: ItemType, unit_price: Money) -> Self {
        Self {
            id: LineItemId::new(),
            description: description.into(),
            item_type,
            quantity: Decimal::ONE,
            unit_price,
            discount_rate: Decimal::ZERO,
            taxes: Vec::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_discount_rate(mut self, discount_rate: Decimal) -> Self {
        self.discount_rate = discount_rate;
        self
    }

    pub fn with_tax(mut self, tax: LineItemTax) -> Self {
        self.taxes.push(tax);
        self
    }

    /// Computes and snapshots each tax on the discounted subtotal
    ///
    /// Rates outside `[0, 1]` are skipped. Existing taxes are replaced.
    pub fn with_taxes_from(mut self, rates: &[TaxRate]) -> Result<Self, BillingError> {
        let taxable = self.taxable_amount()?;
        let mut taxes = Vec::with_capacity(rates.len());
        for rate in rates.iter().filter(|r| r.rate.is_valid_fraction()) {
            taxes.push(LineItemTax::snapshot(rate, rate.rate.apply(&taxable)?));
        }
        self.taxes = taxes;
        Ok(self)
    }

    pub fn currency(&self) -> Currency {
        self.unit_price.currency()
    }

    pub fn validate(&self) -> Result<(), BillingError> {
        if self.description.trim().is_empty() {
            return Err(BillingError::invalid_line_item("description is required"));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(BillingError::invalid_line_item("quantity must be positive"));
        }
        if self.unit_price.is_negative() {
            return Err(BillingError::invalid_line_item("unit price cannot be negative"));
        }
        if self.discount_rate < Decimal::ZERO || self.discount_rate > dec!(100) {
            return Err(BillingError::invalid_line_item("discount rate must be between 0 and 100"));
        }
        Ok(())
    }

    /// `quantity × unit_price`, rounded once
    pub fn subtotal(&self) -> Result<Money, BillingError> {
        Ok(self.unit_price.multiply(self.quantity)?)
    }

    fn taxable_amount(&self) -> Result<Money, BillingError> {
        let subtotal = self.subtotal()?;
        let discount = subtotal.percentage(self.discount_rate)?;
        Ok(subtotal.checked_sub(&discount)?)
    }

    /// Subtotal, discount, stored tax and line total
    ///
    /// Tax is the sum of the snapshots; it is never recomputed from current
    /// rates.
    pub fn totals(&self) -> Result<LineItemTotals, BillingError> {
        self.validate()?;
        let currency = self.currency();
        let subtotal = self.subtotal()?;
        let discount = subtotal.percentage(self.discount_rate)?;
        let tax = Money::sum(self.taxes.iter().map(|t| &t.tax_amount), currency)?;
        let total = subtotal.checked_sub(&discount)?.checked_add(&tax)?;
        Ok(LineItemTotals {
            subtotal,
            discount,
            tax,
            total,
        })
    }
}
