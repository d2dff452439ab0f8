//! Billing domain errors

use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// A line item failed validation
    #[error("Invalid line item: {0}")]
    InvalidLineItem(String),

    /// The invoice is not in a state that allows the operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl BillingError {
    pub fn invalid_line_item(message: impl Into<String>) -> Self {
        BillingError::InvalidLineItem(message.into())
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        BillingError::InvalidOperation(message.into())
    }
}
