//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use core_kernel::{Currency, FamilyId, Money, StudentId};
use domain_discount::{DiscountScope, DiscountValue};
use domain_tax::{ItemType, PaymentType};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating supported currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::CAD),
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::AUD),
    ]
}

/// Strategy for non-negative amounts in cents, up to $100,000
pub fn cents_strategy() -> impl Strategy<Value = i64> {
    0i64..10_000_000i64
}

/// Strategy for CAD subtotals
pub fn cad_money_strategy() -> impl Strategy<Value = Money> {
    cents_strategy().prop_map(|cents| Money::from_cents(cents, Currency::CAD))
}

/// Strategy for valid discount percentages, `0.01..=100` with two decimals
pub fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for valid fixed or percentage discount values
pub fn discount_value_strategy() -> impl Strategy<Value = DiscountValue> {
    prop_oneof![
        (1i64..100_000i64)
            .prop_map(|cents| DiscountValue::FixedAmount(Money::from_cents(cents, Currency::CAD))),
        percentage_strategy().prop_map(DiscountValue::Percentage),
    ]
}

/// Strategy for tax rate fractions between 0% and 20%
pub fn tax_fraction_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=2_000i64).prop_map(|n| Decimal::new(n, 4))
}

/// Strategy for invoice quantities, whole or fractional hours
pub fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        (1i64..20i64).prop_map(Decimal::from),
        (1i64..200i64).prop_map(|n| Decimal::new(n, 1)),
    ]
}

pub fn payment_type_strategy() -> impl Strategy<Value = PaymentType> {
    prop_oneof![
        Just(PaymentType::MonthlyGroup),
        Just(PaymentType::YearlyGroup),
        Just(PaymentType::IndividualSession),
        Just(PaymentType::EventRegistration),
        Just(PaymentType::StorePurchase),
        Just(PaymentType::Other),
    ]
}

pub fn item_type_strategy() -> impl Strategy<Value = ItemType> {
    prop_oneof![
        Just(ItemType::ClassEnrollment),
        Just(ItemType::IndividualSession),
        Just(ItemType::Product),
    ]
}

pub fn scope_strategy() -> impl Strategy<Value = DiscountScope> {
    prop_oneof![Just(DiscountScope::PerStudent), Just(DiscountScope::PerFamily)]
}

pub fn student_id_strategy() -> impl Strategy<Value = StudentId> {
    any::<[u8; 16]>().prop_map(|bytes| StudentId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

pub fn family_id_strategy() -> impl Strategy<Value = FamilyId> {
    any::<[u8; 16]>().prop_map(|bytes| FamilyId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

/// Strategy for birth dates of students aged roughly 4 to 60
pub fn birth_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1965i32..2021i32, 1u32..=12u32, 1u32..=28u32)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
}

/// Strategy for generating valid time ranges (start before end)
pub fn time_range_strategy() -> impl Strategy<Value = (DateTime<Utc>, DateTime<Utc>)> {
    (0i64..365i64, 1i64..365i64).prop_map(|(start_days, duration_days)| {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(start_days);
        let end = start + Duration::days(duration_days);
        (start, end)
    })
}

/// Strategy for explicit discount code text
pub fn code_text_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{3,6}[0-9]{1,4}".prop_map(|s| s)
}
