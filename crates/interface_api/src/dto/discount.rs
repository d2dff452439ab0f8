//! Discount DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use core_kernel::{
    AutomationRuleId, Currency, DiscountCodeId, DiscountEventId, DiscountTemplateId,
    DiscountUsageId, FamilyId, Money, PaymentId, ProgramId, StudentId,
};
use domain_discount::{
    clearable, ApplyDiscountRequest, AutomationRule, DiscountApplication, DiscountCode,
    DiscountEventType, DiscountScope, DiscountTemplate, DiscountType, DiscountValidation,
    DiscountValue, NewAutomationRule, NewDiscountCode, NewDiscountEvent, NewDiscountTemplate,
    RecordedEvent, RuleProcessing, RuleUpdate, TemplateUpdate, UsageType, ValidateDiscountRequest,
};
use domain_tax::PaymentType;

use super::default_true;
use crate::error::ApiError;

fn discount_value(
    discount_type: DiscountType,
    value: Decimal,
    currency: Currency,
) -> Result<DiscountValue, ApiError> {
    Ok(DiscountValue::from_columns(discount_type, value, None, currency)?)
}

// Templates

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Percent for percentages, dollars for fixed amounts
    pub discount_value: Decimal,
    #[serde(default)]
    pub usage_type: UsageType,
    /// Payment categories the discount applies to; empty means all
    #[serde(default)]
    pub applicable_to: Vec<PaymentType>,
    pub scope: DiscountScope,
    #[validate(range(min = 1))]
    pub max_uses: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateTemplateRequest {
    pub fn into_domain(self, currency: Currency) -> Result<NewDiscountTemplate, ApiError> {
        Ok(NewDiscountTemplate {
            value: discount_value(self.discount_type, self.discount_value, currency)?,
            name: self.name,
            description: self.description,
            usage_type: self.usage_type,
            applicable_to: self.applicable_to,
            scope: self.scope,
            max_uses: self.max_uses,
            is_active: self.is_active,
        })
    }
}

/// Partial template update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTemplateRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    pub usage_type: Option<UsageType>,
    pub applicable_to: Option<Vec<PaymentType>>,
    pub scope: Option<DiscountScope>,
    #[validate(range(min = 1))]
    pub max_uses: Option<i32>,
    pub is_active: Option<bool>,
}

impl UpdateTemplateRequest {
    pub fn into_domain(self, currency: Currency) -> Result<TemplateUpdate, ApiError> {
        let value = match (self.discount_type, self.discount_value) {
            (Some(discount_type), Some(value)) => Some(discount_value(discount_type, value, currency)?),
            (None, None) => None,
            _ => {
                return Err(ApiError::Validation(
                    "discount_type and discount_value must be updated together".to_string(),
                ))
            }
        };
        Ok(TemplateUpdate {
            name: self.name,
            description: self.description,
            value,
            usage_type: self.usage_type,
            applicable_to: self.applicable_to,
            scope: self.scope,
            max_uses: self.max_uses,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListTemplatesQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub id: DiscountTemplateId,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub discount_value_cents: Option<i64>,
    pub usage_type: UsageType,
    pub applicable_to: Vec<PaymentType>,
    pub scope: DiscountScope,
    pub max_uses: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DiscountTemplate> for TemplateResponse {
    fn from(template: DiscountTemplate) -> Self {
        let (discount_type, discount_value, discount_value_cents) = template.value.to_columns();
        Self {
            id: template.id,
            name: template.name,
            description: template.description,
            discount_type,
            discount_value,
            discount_value_cents,
            usage_type: template.usage_type,
            applicable_to: template.applicable_to,
            scope: template.scope,
            max_uses: template.max_uses,
            is_active: template.is_active,
            created_at: template.created_at,
            updated_at: template.updated_at,
        }
    }
}

// Codes

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCodeRequest {
    /// Generated when absent
    #[validate(length(min = 3, max = 32))]
    pub code: Option<String>,
    pub template_id: Option<DiscountTemplateId>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub usage_type: UsageType,
    #[serde(default)]
    pub applicable_to: Vec<PaymentType>,
    pub scope: DiscountScope,
    pub family_id: Option<FamilyId>,
    pub student_id: Option<StudentId>,
    #[validate(range(min = 1))]
    pub max_uses: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl CreateCodeRequest {
    pub fn into_domain(self, currency: Currency) -> Result<NewDiscountCode, ApiError> {
        Ok(NewDiscountCode {
            value: discount_value(self.discount_type, self.discount_value, currency)?,
            code: self.code,
            template_id: self.template_id,
            name: self.name,
            description: self.description,
            usage_type: self.usage_type,
            applicable_to: self.applicable_to,
            scope: self.scope,
            family_id: self.family_id,
            student_id: self.student_id,
            max_uses: self.max_uses,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            created_automatically: false,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub id: DiscountCodeId,
    pub code: String,
    pub template_id: Option<DiscountTemplateId>,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub discount_value_cents: Option<i64>,
    pub usage_type: UsageType,
    pub applicable_to: Vec<PaymentType>,
    pub scope: DiscountScope,
    pub family_id: Option<FamilyId>,
    pub student_id: Option<StudentId>,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_automatically: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DiscountCode> for CodeResponse {
    fn from(code: DiscountCode) -> Self {
        let (discount_type, discount_value, discount_value_cents) = code.value.to_columns();
        Self {
            id: code.id,
            scope: code.owner.scope(),
            family_id: code.owner.family_id(),
            student_id: code.owner.student_id(),
            code: code.code,
            template_id: code.template_id,
            name: code.name,
            description: code.description,
            discount_type,
            discount_value,
            discount_value_cents,
            usage_type: code.usage_type,
            applicable_to: code.applicable_to,
            max_uses: code.max_uses,
            times_used: code.times_used,
            valid_from: code.validity.from,
            valid_until: code.validity.until,
            is_active: code.is_active,
            created_automatically: code.created_automatically,
            created_at: code.created_at,
        }
    }
}

/// A code presented at checkout
#[derive(Debug, Deserialize, Validate)]
pub struct ValidateCodeRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub family_id: Option<FamilyId>,
    pub student_id: Option<StudentId>,
    #[validate(range(min = 0))]
    pub subtotal_cents: i64,
    pub applicable_to: Option<PaymentType>,
}

impl ValidateCodeRequest {
    pub fn into_domain(self, currency: Currency) -> ValidateDiscountRequest {
        ValidateDiscountRequest {
            code: self.code,
            family_id: self.family_id,
            student_id: self.student_id,
            subtotal: Money::from_cents(self.subtotal_cents, currency),
            applicable_to: self.applicable_to,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyCodeRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub check: ValidateCodeRequest,
    pub payment_id: Option<PaymentId>,
}

impl ApplyCodeRequest {
    pub fn into_domain(self, currency: Currency) -> ApplyDiscountRequest {
        ApplyDiscountRequest {
            validation: self.check.into_domain(currency),
            payment_id: self.payment_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub is_valid: bool,
    pub discount_code_id: Option<DiscountCodeId>,
    pub discount_amount_cents: i64,
    pub error_message: Option<String>,
}

impl From<DiscountValidation> for ValidationResponse {
    fn from(validation: DiscountValidation) -> Self {
        Self {
            is_valid: validation.is_valid,
            discount_code_id: validation.discount_code_id,
            discount_amount_cents: validation.discount_amount.to_cents(),
            error_message: validation.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    #[serde(flatten)]
    pub validation: ValidationResponse,
    /// Set when the usage was recorded
    pub usage_id: Option<DiscountUsageId>,
}

impl From<DiscountApplication> for ApplicationResponse {
    fn from(application: DiscountApplication) -> Self {
        Self {
            usage_id: application.usage.as_ref().map(|u| u.id),
            validation: application.validation.into(),
        }
    }
}

// Rules

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub event_type: DiscountEventType,
    /// Templates minted in order each time the rule fires
    #[validate(length(min = 1))]
    pub template_ids: Vec<DiscountTemplateId>,
    #[serde(default)]
    pub conditions: Value,
    #[serde(default)]
    pub applicable_programs: Vec<ProgramId>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 3650))]
    pub code_valid_days: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<CreateRuleRequest> for NewAutomationRule {
    fn from(request: CreateRuleRequest) -> Self {
        NewAutomationRule {
            name: request.name,
            description: request.description,
            event_type: request.event_type,
            template_ids: request.template_ids,
            conditions: request.conditions,
            applicable_programs: request.applicable_programs,
            valid_from: request.valid_from,
            valid_until: request.valid_until,
            code_valid_days: request.code_valid_days,
            is_active: request.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    /// `null` clears the description
    #[serde(default, deserialize_with = "clearable")]
    #[validate(length(max = 2000))]
    pub description: Option<Option<String>>,
    pub event_type: Option<DiscountEventType>,
    #[validate(length(min = 1))]
    pub template_ids: Option<Vec<DiscountTemplateId>>,
    pub conditions: Option<Value>,
    pub applicable_programs: Option<Vec<ProgramId>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    /// `null` makes minted codes open-ended
    #[serde(default, deserialize_with = "clearable")]
    #[validate(range(min = 1, max = 3650))]
    pub code_valid_days: Option<Option<u32>>,
    pub is_active: Option<bool>,
}

impl From<UpdateRuleRequest> for RuleUpdate {
    fn from(request: UpdateRuleRequest) -> Self {
        RuleUpdate {
            name: request.name,
            description: request.description,
            event_type: request.event_type,
            template_ids: request.template_ids,
            conditions: request.conditions,
            applicable_programs: request.applicable_programs,
            valid_from: request.valid_from,
            valid_until: request.valid_until,
            code_valid_days: request.code_valid_days,
            is_active: request.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RuleResponse {
    pub id: AutomationRuleId,
    pub name: String,
    pub description: Option<String>,
    pub event_type: DiscountEventType,
    pub template_ids: Vec<DiscountTemplateId>,
    pub uses_multiple_templates: bool,
    pub conditions: Value,
    pub applicable_programs: Vec<ProgramId>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub code_valid_days: Option<u32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AutomationRule> for RuleResponse {
    fn from(rule: AutomationRule) -> Self {
        Self {
            id: rule.id,
            template_ids: rule.templates.as_slice().to_vec(),
            uses_multiple_templates: rule.templates.uses_multiple_templates(),
            conditions: rule.conditions.to_json(),
            name: rule.name,
            description: rule.description,
            event_type: rule.event_type,
            applicable_programs: rule.applicable_programs,
            valid_from: rule.validity.from,
            valid_until: rule.validity.until,
            code_valid_days: rule.code_valid_days,
            is_active: rule.is_active,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

// Events

#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    pub event_type: DiscountEventType,
    pub student_id: Option<StudentId>,
    pub family_id: Option<FamilyId>,
    #[serde(default)]
    pub event_data: Value,
}

impl From<RecordEventRequest> for NewDiscountEvent {
    fn from(request: RecordEventRequest) -> Self {
        NewDiscountEvent {
            event_type: request.event_type,
            student_id: request.student_id,
            family_id: request.family_id,
            event_data: request.event_data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event_id: DiscountEventId,
    pub event_type: DiscountEventType,
    pub student_id: Option<StudentId>,
    pub family_id: Option<FamilyId>,
    pub created_at: DateTime<Utc>,
    /// Every code minted for the event
    pub assigned_codes: Vec<String>,
    pub rules: Vec<RuleProcessing>,
}

impl From<RecordedEvent> for EventResponse {
    fn from(recorded: RecordedEvent) -> Self {
        let assigned_codes = recorded
            .report
            .assigned_codes()
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            event_id: recorded.event.id,
            event_type: recorded.event.event_type,
            student_id: recorded.event.student_id,
            family_id: recorded.event.family_id,
            created_at: recorded.event.created_at,
            assigned_codes,
            rules: recorded.report.rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_fixed_template_value_is_posted_in_dollars() {
        let request: CreateTemplateRequest = serde_json::from_value(json!({
            "name": "Sibling discount",
            "discount_type": "fixed_amount",
            "discount_value": "25.50",
            "scope": "per_family"
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let template = request.into_domain(Currency::CAD).unwrap();
        assert_eq!(
            template.value,
            DiscountValue::FixedAmount(Money::from_cents(2550, Currency::CAD))
        );
        assert_eq!(template.usage_type, UsageType::OneTime);
        assert!(template.is_active);
    }

    #[test]
    fn test_sub_cent_fixed_amount_is_rejected() {
        let request = CreateTemplateRequest {
            name: "Odd".to_string(),
            description: None,
            discount_type: DiscountType::FixedAmount,
            discount_value: dec!(1.005),
            usage_type: UsageType::OneTime,
            applicable_to: vec![],
            scope: DiscountScope::PerStudent,
            max_uses: None,
            is_active: true,
        };
        assert!(matches!(request.into_domain(Currency::CAD), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_update_requires_type_and_value_together() {
        let update = UpdateTemplateRequest {
            discount_value: Some(dec!(15)),
            ..Default::default()
        };
        assert!(update.into_domain(Currency::CAD).is_err());

        let update = UpdateTemplateRequest {
            discount_type: Some(DiscountType::Percentage),
            discount_value: Some(dec!(15)),
            ..Default::default()
        };
        let update = update.into_domain(Currency::CAD).unwrap();
        assert_eq!(update.value, Some(DiscountValue::Percentage(dec!(15))));
    }

    #[test]
    fn test_field_validation() {
        let request = CreateRuleRequest {
            name: String::new(),
            description: None,
            event_type: DiscountEventType::BeltPromotion,
            template_ids: vec![],
            conditions: Value::Null,
            applicable_programs: vec![],
            valid_from: None,
            valid_until: None,
            code_valid_days: Some(0),
            is_active: true,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("template_ids"));
        assert!(fields.contains_key("code_valid_days"));
    }

    #[test]
    fn test_apply_request_flattens_checkout_fields() {
        let request: ApplyCodeRequest = serde_json::from_value(json!({
            "code": "welcome10",
            "subtotal_cents": 10000,
            "applicable_to": "monthly_group"
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let domain = request.into_domain(Currency::CAD);
        assert_eq!(domain.validation.subtotal, Money::from_cents(10000, Currency::CAD));
        assert_eq!(domain.validation.applicable_to, Some(PaymentType::MonthlyGroup));
        assert!(domain.payment_id.is_none());
    }
}
