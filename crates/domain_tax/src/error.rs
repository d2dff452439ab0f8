//! Tax domain errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError};

/// Errors that can occur while resolving or computing taxes
#[derive(Debug, Error)]
pub enum TaxError {
    /// Storage failure while reading rates or student data
    #[error("Tax data unavailable: {0}")]
    Port(#[from] PortError),

    /// Arithmetic failure while computing an amount
    #[error("Tax calculation error: {0}")]
    Money(#[from] MoneyError),
}
