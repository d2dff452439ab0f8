//! Discount templates and the values they carry
//!
//! A template is a blueprint: it is never redeemed directly, only copied
//! into [`DiscountCode`](crate::code::DiscountCode)s by an administrator or
//! by the automation engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{cents_to_dollars, dollars_to_cents, Currency, DiscountTemplateId, Money};
use domain_tax::PaymentType;

use crate::error::DiscountError;

/// Fractional digits the percentage column keeps
const PERCENTAGE_SCALE: u32 = 2;

/// Storage discriminator for [`DiscountValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    FixedAmount,
    Percentage,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::FixedAmount => "fixed_amount",
            DiscountType::Percentage => "percentage",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fixed_amount" => Some(DiscountType::FixedAmount),
            "percentage" => Some(DiscountType::Percentage),
            _ => None,
        }
    }
}

/// The amount a discount takes off
///
/// Fixed amounts are money; percentages are plain numbers in `0..=100`
/// with no currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "discount_type", content = "discount_value", rename_all = "snake_case")]
pub enum DiscountValue {
    FixedAmount(Money),
    Percentage(Decimal),
}

impl DiscountValue {
    pub fn discount_type(&self) -> DiscountType {
        match self {
            DiscountValue::FixedAmount(_) => DiscountType::FixedAmount,
            DiscountValue::Percentage(_) => DiscountType::Percentage,
        }
    }

    pub fn validate(&self) -> Result<(), DiscountError> {
        match self {
            DiscountValue::FixedAmount(amount) if !amount.is_positive() => Err(
                DiscountError::validation("Fixed discount amount must be greater than zero"),
            ),
            DiscountValue::Percentage(pct) if *pct <= Decimal::ZERO || *pct > dec!(100) => Err(
                DiscountError::validation("Percentage discount must be between 0 and 100"),
            ),
            DiscountValue::Percentage(pct) if pct.normalize().scale() > PERCENTAGE_SCALE => Err(
                DiscountError::validation("Percentage discount allows at most 2 decimal places"),
            ),
            _ => Ok(()),
        }
    }

    /// Amount taken off `subtotal`
    ///
    /// A fixed discount never exceeds the subtotal. A percentage is rounded
    /// once to the nearest cent.
    pub fn amount_off(&self, subtotal: &Money) -> Result<Money, DiscountError> {
        let amount = match self {
            DiscountValue::FixedAmount(value) => value.min(subtotal)?,
            DiscountValue::Percentage(pct) => subtotal.percentage(*pct)?,
        };
        Ok(amount)
    }

    /// Splits into the stored columns `(type, legacy dollars value, cents)`
    ///
    /// Percentages are stored in the legacy column and carry no cents.
    pub fn to_columns(&self) -> (DiscountType, Decimal, Option<i64>) {
        match self {
            DiscountValue::FixedAmount(amount) => (
                DiscountType::FixedAmount,
                cents_to_dollars(amount.to_cents()),
                Some(amount.to_cents()),
            ),
            DiscountValue::Percentage(pct) => (DiscountType::Percentage, *pct, None),
        }
    }

    /// Rebuilds the value from stored columns
    ///
    /// Fixed amounts prefer the cents column and fall back to the legacy
    /// dollars column for rows written before it existed.
    pub fn from_columns(
        discount_type: DiscountType,
        legacy_value: Decimal,
        value_cents: Option<i64>,
        currency: Currency,
    ) -> Result<Self, DiscountError> {
        match discount_type {
            DiscountType::FixedAmount => {
                let cents = match value_cents {
                    Some(cents) => cents,
                    None => dollars_to_cents(legacy_value)?,
                };
                Ok(DiscountValue::FixedAmount(Money::from_cents(cents, currency)))
            }
            DiscountType::Percentage => Ok(DiscountValue::Percentage(legacy_value)),
        }
    }
}

/// Whether a code can be used once or repeatedly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    #[default]
    OneTime,
    Ongoing,
}

impl UsageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageType::OneTime => "one_time",
            UsageType::Ongoing => "ongoing",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "one_time" => Some(UsageType::OneTime),
            "ongoing" => Some(UsageType::Ongoing),
            _ => None,
        }
    }
}

/// Who a discount is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountScope {
    PerStudent,
    PerFamily,
}

impl DiscountScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountScope::PerStudent => "per_student",
            DiscountScope::PerFamily => "per_family",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "per_student" => Some(DiscountScope::PerStudent),
            "per_family" => Some(DiscountScope::PerFamily),
            _ => None,
        }
    }
}

/// A reusable discount blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountTemplate {
    pub id: DiscountTemplateId,
    pub name: String,
    pub description: Option<String>,
    pub value: DiscountValue,
    pub usage_type: UsageType,
    /// Payment categories the discount can be redeemed against
    pub applicable_to: Vec<PaymentType>,
    pub scope: DiscountScope,
    pub max_uses: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DiscountTemplate {
    /// Builds a template from a validated request
    pub fn create(request: NewDiscountTemplate) -> Result<Self, DiscountError> {
        request.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: DiscountTemplateId::new_v7(),
            name: request.name.trim().to_string(),
            description: request.description,
            value: request.value,
            usage_type: request.usage_type,
            applicable_to: request.applicable_to,
            scope: request.scope,
            max_uses: request.max_uses,
            is_active: request.is_active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies an update in place, validating the result
    pub fn apply_update(&mut self, update: TemplateUpdate) -> Result<(), DiscountError> {
        let mut next = self.clone();
        if let Some(name) = update.name {
            next.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            next.description = Some(description);
        }
        if let Some(value) = update.value {
            next.value = value;
        }
        if let Some(usage_type) = update.usage_type {
            next.usage_type = usage_type;
        }
        if let Some(applicable_to) = update.applicable_to {
            next.applicable_to = applicable_to;
        }
        if let Some(scope) = update.scope {
            next.scope = scope;
        }
        if let Some(max_uses) = update.max_uses {
            next.max_uses = Some(max_uses);
        }
        if let Some(is_active) = update.is_active {
            next.is_active = is_active;
        }
        validate_fields(&next.name, &next.value, next.max_uses)?;
        next.updated_at = Utc::now();
        *self = next;
        Ok(())
    }

    /// True when the template can be redeemed against `category`
    ///
    /// An empty list applies to every category.
    pub fn applies_to(&self, category: PaymentType) -> bool {
        self.applicable_to.is_empty() || self.applicable_to.contains(&category)
    }
}

/// Request for creating a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDiscountTemplate {
    pub name: String,
    pub description: Option<String>,
    pub value: DiscountValue,
    #[serde(default)]
    pub usage_type: UsageType,
    #[serde(default)]
    pub applicable_to: Vec<PaymentType>,
    pub scope: DiscountScope,
    pub max_uses: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl NewDiscountTemplate {
    pub fn validate(&self) -> Result<(), DiscountError> {
        validate_fields(&self.name, &self.value, self.max_uses)
    }
}

/// Partial update of a template; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: Option<DiscountValue>,
    pub usage_type: Option<UsageType>,
    pub applicable_to: Option<Vec<PaymentType>>,
    pub scope: Option<DiscountScope>,
    pub max_uses: Option<i32>,
    pub is_active: Option<bool>,
}

fn validate_fields(name: &str, value: &DiscountValue, max_uses: Option<i32>) -> Result<(), DiscountError> {
    if name.trim().is_empty() {
        return Err(DiscountError::validation("Template name is required"));
    }
    value.validate()?;
    if matches!(max_uses, Some(n) if n < 1) {
        return Err(DiscountError::validation("max_uses must be at least 1"));
    }
    Ok(())
}
