//! Discount domain errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError, TemporalError};

/// Errors that can occur in the discount domain
#[derive(Debug, Error)]
pub enum DiscountError {
    /// Input rejected before anything was written
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Scope and owner of a discount code disagree
    #[error("Invalid discount scope: {0}")]
    InvalidScope(String),

    /// Rule conditions contain an unknown key or a mistyped value
    #[error("Invalid rule conditions: {0}")]
    InvalidConditions(String),

    #[error("Discount template not found: {0}")]
    TemplateNotFound(String),

    #[error("Discount code not found: {0}")]
    CodeNotFound(String),

    #[error("Automation rule not found: {0}")]
    RuleNotFound(String),

    /// Every generated candidate collided with an existing code
    #[error("Failed to allocate a unique discount code with prefix {prefix} after {attempts} attempts")]
    CodeAllocationExhausted {
        prefix: String,
        attempts: u32,
    },

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Temporal(#[from] TemporalError),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl DiscountError {
    pub fn validation(message: impl Into<String>) -> Self {
        DiscountError::Validation(message.into())
    }

    pub fn invalid_scope(message: impl Into<String>) -> Self {
        DiscountError::InvalidScope(message.into())
    }

    pub fn invalid_conditions(message: impl Into<String>) -> Self {
        DiscountError::InvalidConditions(message.into())
    }

    /// True for errors caused by caller input rather than storage
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DiscountError::Validation(_)
                | DiscountError::InvalidScope(_)
                | DiscountError::InvalidConditions(_)
                | DiscountError::Money(_)
                | DiscountError::Temporal(_)
        )
    }
}
