//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the dojo's money, dates, tax rates
//! and identifiers. These fixtures are consistent and predictable for unit tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{
    Currency, FamilyId, Money, ProgramId, Rate, StudentId, TaxRateId, ValidityWindow,
};
use domain_tax::{TaxRate, PST_BC};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// One month of group classes
    pub fn cad_monthly_fee() -> Money {
        Money::from_cents(10_000, Currency::CAD)
    }

    /// A private lesson
    pub fn cad_private_lesson() -> Money {
        Money::from_cents(6_000, Currency::CAD)
    }

    /// A sparring glove pair from the store
    pub fn cad_gloves() -> Money {
        Money::from_cents(4_599, Currency::CAD)
    }

    pub fn cad_zero() -> Money {
        Money::zero(Currency::CAD)
    }

    /// A USD amount for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::from_cents(10_000, Currency::USD)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// First day of the fall term
    pub fn term_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap()
    }

    /// Last day of the fall term
    pub fn term_end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 20, 23, 59, 59).unwrap()
    }

    /// Mid-term timestamp for containment tests
    pub fn mid_term() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 15, 12, 0, 0).unwrap()
    }

    pub fn before_term() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap()
    }

    pub fn after_term() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap()
    }

    /// Validity window covering the fall term
    pub fn fall_term() -> ValidityWindow {
        ValidityWindow::new(Some(Self::term_start()), Some(Self::term_end())).unwrap()
    }

    /// Birth date of a student who is 10 during the fall 2024 term
    pub fn child_birth_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, 3, 15).unwrap()
    }

    /// Birth date of an adult student
    pub fn adult_birth_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(1989, 5, 15).unwrap()
    }
}

/// British Columbia tax rates
pub struct TaxFixtures;

impl TaxFixtures {
    /// 5% GST with a fixed identifier
    pub fn gst() -> TaxRate {
        let mut rate = TaxRate::new("GST", Rate::new(dec!(0.05))).with_region("CA");
        rate.id = IdFixtures::gst_id();
        rate
    }

    /// 7% provincial sales tax with a fixed identifier
    pub fn pst_bc() -> TaxRate {
        let mut rate = TaxRate::new(PST_BC, Rate::new(dec!(0.07))).with_region("BC");
        rate.id = IdFixtures::pst_id();
        rate
    }

    /// GST and PST, in that order
    pub fn bc_rates() -> Vec<TaxRate> {
        vec![Self::gst(), Self::pst_bc()]
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    fn fixed(uuid: &str) -> Uuid {
        Uuid::parse_str(uuid).unwrap()
    }

    pub fn family_id() -> FamilyId {
        FamilyId::from_uuid(Self::fixed("550e8400-e29b-41d4-a716-446655440001"))
    }

    pub fn student_id() -> StudentId {
        StudentId::from_uuid(Self::fixed("550e8400-e29b-41d4-a716-446655440002"))
    }

    pub fn program_id() -> ProgramId {
        ProgramId::from_uuid(Self::fixed("550e8400-e29b-41d4-a716-446655440003"))
    }

    pub fn gst_id() -> TaxRateId {
        TaxRateId::from_uuid(Self::fixed("550e8400-e29b-41d4-a716-446655440004"))
    }

    pub fn pst_id() -> TaxRateId {
        TaxRateId::from_uuid(Self::fixed("550e8400-e29b-41d4-a716-446655440005"))
    }
}

/// Fixture for decimal test data
pub struct DecimalFixtures;

impl DecimalFixtures {
    /// Sibling discount percentage
    pub fn sibling_percentage() -> Decimal {
        dec!(10)
    }

    /// Line item discount rate used in totals examples
    pub fn line_discount_rate() -> Decimal {
        dec!(10)
    }

    pub fn zero() -> Decimal {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_fixtures_currencies() {
        assert_eq!(MoneyFixtures::cad_monthly_fee().currency(), Currency::CAD);
        assert_eq!(MoneyFixtures::usd_100().currency(), Currency::USD);
    }

    #[test]
    fn test_temporal_fixtures_ordering() {
        let window = TemporalFixtures::fall_term();

        assert!(window.contains(TemporalFixtures::mid_term()));
        assert!(window.is_pending_at(TemporalFixtures::before_term()));
        assert!(window.is_expired_at(TemporalFixtures::after_term()));
    }

    #[test]
    fn test_tax_fixtures_are_deterministic() {
        assert_eq!(TaxFixtures::gst().id, TaxFixtures::gst().id);
        assert!(TaxFixtures::pst_bc().is_pst_bc());
        assert!(!TaxFixtures::gst().is_pst_bc());
    }
}
