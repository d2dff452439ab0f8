//! Tax DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{Currency, Money, StudentId, TaxRateId};
use domain_tax::{PaymentTaxBreakdown, PaymentTaxRequest, PaymentType};

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentTaxQuery {
    #[validate(range(min = 0))]
    pub subtotal_cents: i64,
    pub payment_type: PaymentType,
    /// Students the payment is for; store purchases use the first one
    #[serde(default)]
    pub student_ids: Vec<StudentId>,
}

impl PaymentTaxQuery {
    pub fn into_domain(self, currency: Currency) -> PaymentTaxRequest {
        PaymentTaxRequest {
            subtotal: Money::from_cents(self.subtotal_cents, currency),
            payment_type: self.payment_type,
            student_ids: self.student_ids,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentTaxLine {
    pub tax_rate_id: TaxRateId,
    pub tax_name: String,
    /// Fraction, e.g. 0.05
    pub tax_rate: Decimal,
    pub tax_amount_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct PaymentTaxResponse {
    pub total_tax_cents: i64,
    pub taxes: Vec<PaymentTaxLine>,
}

impl From<PaymentTaxBreakdown> for PaymentTaxResponse {
    fn from(breakdown: PaymentTaxBreakdown) -> Self {
        Self {
            total_tax_cents: breakdown.total_tax.to_cents(),
            taxes: breakdown
                .taxes
                .into_iter()
                .map(|tax| PaymentTaxLine {
                    tax_rate_id: tax.tax_rate_id,
                    tax_name: tax.tax_name,
                    tax_rate: tax.tax_rate.as_decimal(),
                    tax_amount_cents: tax.tax_amount.to_cents(),
                })
                .collect(),
        }
    }
}
