//! Checking and redeeming discount codes at checkout
//!
//! An invalid code is an expected input, so validation answers with
//! `is_valid: false` and a message instead of an error. Only storage
//! failures are returned as errors.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use core_kernel::{DiscountCodeId, DiscountUsageId, FamilyId, Money, PaymentId, StudentId};
use domain_tax::PaymentType;

use crate::code::{CodeOwner, DiscountCode, DiscountUsage};
use crate::error::DiscountError;
use crate::ports::DiscountStorePort;

/// A code presented at checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateDiscountRequest {
    pub code: String,
    pub family_id: Option<FamilyId>,
    pub student_id: Option<StudentId>,
    pub subtotal: Money,
    /// Category being paid for; unchecked when absent
    pub applicable_to: Option<PaymentType>,
}

/// Outcome of validating a code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountValidation {
    pub is_valid: bool,
    pub discount_code_id: Option<DiscountCodeId>,
    pub discount_amount: Money,
    pub error_message: Option<String>,
}

impl DiscountValidation {
    fn valid(code: &DiscountCode, amount: Money) -> Self {
        Self {
            is_valid: true,
            discount_code_id: Some(code.id),
            discount_amount: amount,
            error_message: None,
        }
    }

    fn invalid(subtotal: &Money, message: &str) -> Self {
        Self {
            is_valid: false,
            discount_code_id: None,
            discount_amount: Money::zero(subtotal.currency()),
            error_message: Some(message.to_string()),
        }
    }
}

/// A code being redeemed against a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyDiscountRequest {
    #[serde(flatten)]
    pub validation: ValidateDiscountRequest,
    pub payment_id: Option<PaymentId>,
}

/// Outcome of redeeming a code; `usage` is set only when it was recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountApplication {
    pub validation: DiscountValidation,
    pub usage: Option<DiscountUsage>,
}

pub const MSG_NOT_FOUND: &str = "Invalid discount code";
pub const MSG_INACTIVE: &str = "This discount code is no longer active";
pub const MSG_NOT_YET_VALID: &str = "This discount code is not yet valid";
pub const MSG_EXPIRED: &str = "This discount code has expired";
pub const MSG_MAX_USES: &str = "This discount code has reached its maximum number of uses";
pub const MSG_WRONG_FAMILY: &str = "This discount code is not valid for this family";
pub const MSG_WRONG_STUDENT: &str = "This discount code is not valid for this student";
pub const MSG_NOT_APPLICABLE: &str = "This discount code does not apply to this purchase";

/// Why `code` cannot be used for `request` at `now`, if anything
pub fn rejection_reason(
    code: &DiscountCode,
    request: &ValidateDiscountRequest,
    now: DateTime<Utc>,
) -> Option<&'static str> {
    if !code.is_active {
        return Some(MSG_INACTIVE);
    }
    if code.validity.is_pending_at(now) {
        return Some(MSG_NOT_YET_VALID);
    }
    if code.validity.is_expired_at(now) {
        return Some(MSG_EXPIRED);
    }
    if code.is_exhausted() {
        return Some(MSG_MAX_USES);
    }
    match code.owner {
        CodeOwner::Family(family_id) if request.family_id != Some(family_id) => {
            return Some(MSG_WRONG_FAMILY)
        }
        CodeOwner::Student(student_id) if request.student_id != Some(student_id) => {
            return Some(MSG_WRONG_STUDENT)
        }
        _ => {}
    }
    if let Some(category) = request.applicable_to {
        if !code.applies_to(category) {
            return Some(MSG_NOT_APPLICABLE);
        }
    }
    None
}

/// Validates and redeems codes
pub struct DiscountRedemption {
    store: Arc<dyn DiscountStorePort>,
}

impl DiscountRedemption {
    pub fn new(store: Arc<dyn DiscountStorePort>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn validate_discount_code(
        &self,
        request: &ValidateDiscountRequest,
    ) -> Result<DiscountValidation, DiscountError> {
        Ok(self.check(request).await?.0)
    }

    /// Validates the code, then records the usage and bumps `times_used`
    /// in one atomic step
    #[instrument(skip(self, request), fields(code = %request.validation.code))]
    pub async fn apply_discount_code(
        &self,
        request: &ApplyDiscountRequest,
    ) -> Result<DiscountApplication, DiscountError> {
        let subtotal = request.validation.subtotal;
        let (validation, code) = self.check(&request.validation).await?;
        let code = match code {
            Some(code) if validation.is_valid => code,
            _ => return Ok(DiscountApplication { validation, usage: None }),
        };

        let usage = DiscountUsage {
            id: DiscountUsageId::new_v7(),
            discount_code_id: code.id,
            family_id: request.validation.family_id,
            student_id: request.validation.student_id,
            payment_id: request.payment_id,
            amount_discounted: validation.discount_amount,
            used_at: Utc::now(),
        };

        match self.store.record_code_usage(&usage).await {
            Ok(updated) => {
                info!(code_id = %code.id, times_used = updated.times_used, amount = %usage.amount_discounted, "Applied discount code");
                Ok(DiscountApplication {
                    validation,
                    usage: Some(usage),
                })
            }
            Err(e) if e.is_conflict() => Ok(DiscountApplication {
                validation: DiscountValidation::invalid(&subtotal, MSG_MAX_USES),
                usage: None,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn check(
        &self,
        request: &ValidateDiscountRequest,
    ) -> Result<(DiscountValidation, Option<DiscountCode>), DiscountError> {
        let code = match self.store.find_code_by_code(request.code.trim()).await? {
            Some(code) => code,
            None => {
                debug!("Discount code not found");
                return Ok((DiscountValidation::invalid(&request.subtotal, MSG_NOT_FOUND), None));
            }
        };

        if let Some(reason) = rejection_reason(&code, request, Utc::now()) {
            debug!(code_id = %code.id, reason, "Discount code rejected");
            return Ok((DiscountValidation::invalid(&request.subtotal, reason), Some(code)));
        }

        let amount = code.value.amount_off(&request.subtotal)?;
        Ok((DiscountValidation::valid(&code, amount), Some(code)))
    }
}
