//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;
use core_kernel::temporal::{Timezone, TemporalError};

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("discount value must be positive");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "discount value must be positive"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_not_found() {
    let error = CoreError::not_found("Student not found");

    match error {
        CoreError::NotFound(msg) => assert_eq!(msg, "Student not found"),
        _ => panic!("Expected NotFound error"),
    }
}

#[test]
fn test_core_error_from_money_error() {
    let money_error = MoneyError::CurrencyMismatch("CAD".to_string(), "USD".to_string());
    let core_error: CoreError = money_error.into();

    assert!(matches!(core_error, CoreError::Money(_)));
}

#[test]
fn test_core_error_from_unknown_timezone() {
    let err = Timezone::parse("Nowhere/Special").unwrap_err();
    assert_eq!(err, TemporalError::UnknownTimezone("Nowhere/Special".to_string()));

    let core_error: CoreError = err.into();
    assert!(core_error.to_string().contains("Nowhere/Special"));
}

#[test]
fn test_core_error_configuration() {
    let error = CoreError::configuration("Missing database url");
    assert!(format!("{}", error).contains("Configuration error"));
}
