//! Custom Test Assertions
//!
//! Provides assertion helpers for money, validity windows, redemption checks
//! and invoice totals that give more meaningful failure messages than
//! standard assertions.

use chrono::{DateTime, Utc};
use core_kernel::{Currency, Money, ValidityWindow};
use domain_billing::InvoiceTotals;
use domain_discount::DiscountValidation;

/// Asserts that `money` is exactly `cents` in `currency`
pub fn assert_money(money: &Money, cents: i64, currency: Currency) {
    assert_eq!(
        money.currency(),
        currency,
        "Currency mismatch: actual={}, expected={}",
        money.currency(),
        currency
    );
    assert_eq!(
        money.to_cents(),
        cents,
        "Amount mismatch: actual={} cents, expected={} cents",
        money.to_cents(),
        cents
    );
}

/// Asserts that `money` is exactly `cents` CAD
pub fn assert_cad(money: &Money, cents: i64) {
    assert_money(money, cents, Currency::CAD);
}

pub fn assert_money_zero(money: &Money) {
    assert!(
        money.is_zero(),
        "Expected zero, got {}{}",
        money.currency().symbol(),
        money.to_major()
    );
}

/// Asserts that the parts add up to `total`
pub fn assert_money_sum_equals(parts: &[Money], total: &Money) {
    let sum: i64 = parts.iter().map(Money::to_cents).sum();
    assert_eq!(
        sum,
        total.to_cents(),
        "Parts sum to {} cents but total is {} cents",
        sum,
        total.to_cents()
    );
}

pub fn assert_window_contains(window: &ValidityWindow, instant: DateTime<Utc>) {
    assert!(
        window.contains(instant),
        "Expected {:?} to contain {}",
        window,
        instant
    );
}

pub fn assert_window_excludes(window: &ValidityWindow, instant: DateTime<Utc>) {
    assert!(
        !window.contains(instant),
        "Expected {:?} to exclude {}",
        window,
        instant
    );
}

/// Asserts a successful code check worth `cents`
pub fn assert_code_accepted(validation: &DiscountValidation, cents: i64) {
    assert!(
        validation.is_valid,
        "Expected code to be accepted, rejected with {:?}",
        validation.error_message
    );
    assert_eq!(validation.discount_amount.to_cents(), cents);
    assert!(validation.discount_code_id.is_some());
}

/// Asserts a rejected code check whose message contains `fragment`
pub fn assert_code_rejected(validation: &DiscountValidation, fragment: &str) {
    assert!(!validation.is_valid, "Expected code to be rejected");
    assert_money_zero(&validation.discount_amount);

    let message = validation.error_message.as_deref().unwrap_or_default();
    assert!(
        message.contains(fragment),
        "Rejection message {:?} does not mention {:?}",
        message,
        fragment
    );
}

/// Asserts invoice totals in cents, in the order subtotal, discount, tax, total
pub fn assert_invoice_totals(totals: &InvoiceTotals, expected: [i64; 4]) {
    let actual = [
        totals.subtotal.to_cents(),
        totals.discount_amount.to_cents(),
        totals.tax_amount.to_cents(),
        totals.total_amount.to_cents(),
    ];
    assert_eq!(
        actual, expected,
        "Invoice totals [subtotal, discount, tax, total] mismatch"
    );
}

/// Asserts that a result is Ok and returns the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Asserts that an error matches a specific variant
#[macro_export]
macro_rules! assert_err_variant {
    ($result:expr, $pattern:pat) => {
        match $result {
            Ok(value) => panic!("Expected Err matching {}, got Ok({:?})", stringify!($pattern), value),
            Err(ref e) => {
                assert!(
                    matches!(e, $pattern),
                    "Error {:?} does not match pattern {}",
                    e,
                    stringify!($pattern)
                );
            }
        }
    };
}
