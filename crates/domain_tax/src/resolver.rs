//! Tax rate resolution and payment tax calculation

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use core_kernel::{age_on, Money, Rate, StudentId, TaxRateId, Timezone};

use crate::error::TaxError;
use crate::ports::{StudentAgePort, TaxRatePort};
use crate::rate::{ItemType, PaymentType, TaxRate, PST_EXEMPT_BELOW_AGE};

/// Input to [`TaxResolver::calculate_taxes_for_payment`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTaxRequest {
    pub subtotal: Money,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub student_ids: Vec<StudentId>,
}

/// One tax line of a payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTax {
    pub tax_rate_id: TaxRateId,
    pub tax_name: String,
    pub tax_rate: Rate,
    pub tax_amount: Money,
}

/// All taxes charged on a payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTaxBreakdown {
    pub total_tax: Money,
    pub taxes: Vec<PaymentTax>,
}

/// Keeps only the rates that apply to `item_type`
///
/// PST_BC is dropped for memberships and sessions, and for any item when
/// `exempt_from_pst` is set.
pub fn filter_applicable(rates: Vec<TaxRate>, item_type: ItemType, exempt_from_pst: bool) -> Vec<TaxRate> {
    let drop_pst = exempt_from_pst || item_type.is_pst_exempt();
    rates
        .into_iter()
        .filter(|rate| !(drop_pst && rate.is_pst_bc()))
        .collect()
}

/// Age-based PST exemption as of `today`
///
/// An unknown birth date is not exempt, so tax is charged.
pub fn is_pst_exempt_on(birth_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    birth_date.map_or(false, |born| age_on(born, today) < PST_EXEMPT_BELOW_AGE)
}

/// Resolves which tax rates apply and computes tax amounts
pub struct TaxResolver {
    rates: Arc<dyn TaxRatePort>,
    students: Arc<dyn StudentAgePort>,
    timezone: Timezone,
    today: Option<NaiveDate>,
}

impl TaxResolver {
    pub fn new(rates: Arc<dyn TaxRatePort>, students: Arc<dyn StudentAgePort>, timezone: Timezone) -> Self {
        Self {
            rates,
            students,
            timezone,
            today: None,
        }
    }

    /// Pins "today" for age calculation instead of reading the clock
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| self.timezone.today())
    }

    /// Returns the active tax rates that apply to an item of `item_type`
    #[instrument(skip(self))]
    pub async fn applicable_tax_rates(
        &self,
        item_type: ItemType,
        exempt_from_pst: bool,
    ) -> Result<Vec<TaxRate>, TaxError> {
        let rates = self.rates.list_active_tax_rates().await?;
        let applicable = filter_applicable(rates, item_type, exempt_from_pst);
        debug!(count = applicable.len(), "Resolved applicable tax rates");
        Ok(applicable)
    }

    /// True when the student is young enough to be PST exempt today
    pub async fn is_pst_exempt_student(&self, student_id: StudentId) -> Result<bool, TaxError> {
        let birth_date = self.students.student_birth_date(student_id).await?;
        if birth_date.is_none() {
            debug!(%student_id, "No birth date on file, PST applies");
        }
        Ok(is_pst_exempt_on(birth_date, self.today()))
    }

    /// Applicable rates for a store purchase made for `student_id`
    #[instrument(skip(self), fields(student_id = %student_id))]
    pub async fn applicable_tax_rates_for_store_purchase(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<TaxRate>, TaxError> {
        let exempt = self.is_pst_exempt_student(student_id).await?;
        self.applicable_tax_rates(ItemType::Product, exempt).await
    }

    /// Computes each applicable tax on the payment subtotal
    ///
    /// Each tax is `subtotal × rate`, rounded once. Rates outside `[0, 1]`
    /// are logged and skipped. No applicable rates yields a zero total.
    #[instrument(skip(self, request), fields(payment_type = ?request.payment_type, subtotal = %request.subtotal))]
    pub async fn calculate_taxes_for_payment(
        &self,
        request: &PaymentTaxRequest,
    ) -> Result<PaymentTaxBreakdown, TaxError> {
        let item_type = request.payment_type.item_type();

        let rates = match (request.payment_type, request.student_ids.first()) {
            (PaymentType::StorePurchase, Some(student_id)) => {
                self.applicable_tax_rates_for_store_purchase(*student_id).await?
            }
            _ => self.applicable_tax_rates(item_type, false).await?,
        };

        let currency = request.subtotal.currency();
        let mut total_tax = Money::zero(currency);
        let mut taxes = Vec::with_capacity(rates.len());

        for rate in rates {
            if !rate.rate.is_valid_fraction() {
                warn!(tax_rate_id = %rate.id, name = %rate.name, rate = %rate.rate.as_decimal(), "Skipping invalid tax rate");
                continue;
            }
            let tax_amount = rate.rate.apply(&request.subtotal)?;
            total_tax = total_tax.checked_add(&tax_amount)?;
            taxes.push(PaymentTax {
                tax_rate_id: rate.id,
                tax_name: rate.name,
                tax_rate: rate.rate,
                tax_amount,
            });
        }

        Ok(PaymentTaxBreakdown { total_tax, taxes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rates() -> Vec<TaxRate> {
        vec![
            TaxRate::new("GST", Rate::new(dec!(0.05))),
            TaxRate::new("PST_BC", Rate::new(dec!(0.07))).with_region("BC"),
        ]
    }

    #[test]
    fn test_class_enrollment_never_has_pst() {
        let applicable = filter_applicable(rates(), ItemType::ClassEnrollment, false);
        assert_eq!(applicable.len(), 1);
        assert!(applicable.iter().all(|r| !r.is_pst_bc()));
    }

    #[test]
    fn test_product_has_pst_unless_exempt() {
        assert_eq!(filter_applicable(rates(), ItemType::Product, false).len(), 2);
        assert_eq!(filter_applicable(rates(), ItemType::Product, true).len(), 1);
    }

    #[test]
    fn test_age_exemption_boundary() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let exactly_fifteen = NaiveDate::from_ymd_opt(2010, 9, 1).unwrap();
        let one_day_younger = NaiveDate::from_ymd_opt(2010, 9, 2).unwrap();

        assert!(!is_pst_exempt_on(Some(exactly_fifteen), today));
        assert!(is_pst_exempt_on(Some(one_day_younger), today));
        assert!(!is_pst_exempt_on(None, today));
    }

    mod service {
        use super::*;
        use crate::ports::mock::MockTaxPort;
        use core_kernel::Currency;

        fn resolver(port: MockTaxPort, today: NaiveDate) -> TaxResolver {
            let port = Arc::new(port);
            TaxResolver::new(port.clone(), port, Timezone::default()).with_today(today)
        }

        fn today() -> NaiveDate {
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
        }

        #[tokio::test]
        async fn test_store_purchase_for_young_student_skips_pst() {
            let port = MockTaxPort::with_rates(rates());
            let student = StudentId::new();
            port.set_birth_date(student, NaiveDate::from_ymd_opt(2015, 3, 10).unwrap()).await;

            let applicable = resolver(port, today())
                .applicable_tax_rates_for_store_purchase(student)
                .await
                .unwrap();

            assert_eq!(applicable.len(), 1);
            assert_eq!(applicable[0].name, "GST");
        }

        #[tokio::test]
        async fn test_store_purchase_without_birth_date_charges_pst() {
            let port = MockTaxPort::with_rates(rates());

            let applicable = resolver(port, today())
                .applicable_tax_rates_for_store_purchase(StudentId::new())
                .await
                .unwrap();

            assert_eq!(applicable.len(), 2);
        }

        #[tokio::test]
        async fn test_payment_taxes_accumulate() {
            let port = MockTaxPort::with_rates(rates());
            let request = PaymentTaxRequest {
                subtotal: Money::from_cents(10000, Currency::CAD),
                payment_type: PaymentType::Other,
                student_ids: vec![],
            };

            let breakdown = resolver(port, today())
                .calculate_taxes_for_payment(&request)
                .await
                .unwrap();

            assert_eq!(breakdown.taxes.len(), 2);
            assert_eq!(breakdown.total_tax.to_cents(), 1200);
        }

        #[tokio::test]
        async fn test_membership_payment_only_gst() {
            let port = MockTaxPort::with_rates(rates());
            let request = PaymentTaxRequest {
                subtotal: Money::from_cents(12000, Currency::CAD),
                payment_type: PaymentType::MonthlyGroup,
                student_ids: vec![StudentId::new()],
            };

            let breakdown = resolver(port, today())
                .calculate_taxes_for_payment(&request)
                .await
                .unwrap();

            assert_eq!(breakdown.taxes.len(), 1);
            assert_eq!(breakdown.total_tax.to_cents(), 600);
        }

        #[tokio::test]
        async fn test_invalid_rate_is_skipped() {
            let mut broken = TaxRate::new("BROKEN", Rate::new(dec!(-0.5)));
            broken.description = Some("negative rate".to_string());
            let port = MockTaxPort::with_rates(vec![broken, TaxRate::new("GST", Rate::new(dec!(0.05)))]);
            let request = PaymentTaxRequest {
                subtotal: Money::from_cents(10000, Currency::CAD),
                payment_type: PaymentType::IndividualSession,
                student_ids: vec![],
            };

            let breakdown = resolver(port, today())
                .calculate_taxes_for_payment(&request)
                .await
                .unwrap();

            assert_eq!(breakdown.taxes.len(), 1);
            assert_eq!(breakdown.total_tax.to_cents(), 500);
        }

        #[tokio::test]
        async fn test_no_rates_is_zero_tax() {
            let port = MockTaxPort::new();
            let request = PaymentTaxRequest {
                subtotal: Money::from_cents(10000, Currency::CAD),
                payment_type: PaymentType::StorePurchase,
                student_ids: vec![],
            };

            let breakdown = resolver(port, today())
                .calculate_taxes_for_payment(&request)
                .await
                .unwrap();

            assert!(breakdown.taxes.is_empty());
            assert!(breakdown.total_tax.is_zero());
        }

        #[tokio::test]
        async fn test_inactive_rates_are_ignored() {
            let mut retired = TaxRate::new("HST", Rate::new(dec!(0.13)));
            retired.is_active = false;
            let port = MockTaxPort::with_rates(vec![retired]);

            let applicable = resolver(port, today())
                .applicable_tax_rates(ItemType::Product, false)
                .await
                .unwrap();

            assert!(applicable.is_empty());
        }
    }
}
