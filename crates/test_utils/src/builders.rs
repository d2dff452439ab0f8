//! Test Data Builders
//!
//! Provides builder patterns for constructing discount and invoice requests
//! with sensible defaults. Tests specify only the fields they care about.

use chrono::{DateTime, Utc};
use core_kernel::{
    Currency, DiscountTemplateId, FamilyId, Money, ProgramId, StudentId,
};
use domain_billing::{InvoiceLineItem, LineItemTax};
use domain_discount::{
    DiscountEventType, DiscountScope, DiscountValue, NewAutomationRule, NewDiscountCode,
    NewDiscountEvent, NewDiscountTemplate, UsageType,
};
use domain_tax::{ItemType, PaymentType, TaxRate};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::fixtures::{DecimalFixtures, MoneyFixtures};

/// Builder for discount template requests
pub struct TemplateBuilder {
    name: String,
    value: DiscountValue,
    usage_type: UsageType,
    applicable_to: Vec<PaymentType>,
    scope: DiscountScope,
    max_uses: Option<i32>,
    is_active: bool,
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateBuilder {
    /// A one-time 10% per-student template
    pub fn new() -> Self {
        Self {
            name: "Welcome discount".to_string(),
            value: DiscountValue::Percentage(DecimalFixtures::sibling_percentage()),
            usage_type: UsageType::OneTime,
            applicable_to: Vec::new(),
            scope: DiscountScope::PerStudent,
            max_uses: None,
            is_active: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn percentage(mut self, percentage: Decimal) -> Self {
        self.value = DiscountValue::Percentage(percentage);
        self
    }

    pub fn fixed_cents(mut self, cents: i64) -> Self {
        self.value = DiscountValue::FixedAmount(Money::from_cents(cents, Currency::CAD));
        self
    }

    pub fn ongoing(mut self) -> Self {
        self.usage_type = UsageType::Ongoing;
        self
    }

    pub fn per_family(mut self) -> Self {
        self.scope = DiscountScope::PerFamily;
        self
    }

    pub fn for_categories(mut self, categories: Vec<PaymentType>) -> Self {
        self.applicable_to = categories;
        self
    }

    pub fn with_max_uses(mut self, max_uses: i32) -> Self {
        self.max_uses = Some(max_uses);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn build(self) -> NewDiscountTemplate {
        NewDiscountTemplate {
            name: self.name,
            description: None,
            value: self.value,
            usage_type: self.usage_type,
            applicable_to: self.applicable_to,
            scope: self.scope,
            max_uses: self.max_uses,
            is_active: self.is_active,
        }
    }
}

/// Builder for manually issued discount codes
pub struct CodeBuilder {
    code: Option<String>,
    template_id: Option<DiscountTemplateId>,
    value: DiscountValue,
    applicable_to: Vec<PaymentType>,
    scope: DiscountScope,
    family_id: Option<FamilyId>,
    student_id: Option<StudentId>,
    max_uses: Option<i32>,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
}

impl CodeBuilder {
    /// A 10% code owned by `family_id`
    pub fn for_family(family_id: FamilyId) -> Self {
        Self::with_owner(DiscountScope::PerFamily, Some(family_id), None)
    }

    /// A 10% code owned by `student_id`
    pub fn for_student(student_id: StudentId) -> Self {
        Self::with_owner(DiscountScope::PerStudent, None, Some(student_id))
    }

    fn with_owner(
        scope: DiscountScope,
        family_id: Option<FamilyId>,
        student_id: Option<StudentId>,
    ) -> Self {
        Self {
            code: None,
            template_id: None,
            value: DiscountValue::Percentage(DecimalFixtures::sibling_percentage()),
            applicable_to: Vec::new(),
            scope,
            family_id,
            student_id,
            max_uses: None,
            valid_from: None,
            valid_until: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn from_template(mut self, template_id: DiscountTemplateId) -> Self {
        self.template_id = Some(template_id);
        self
    }

    pub fn fixed_cents(mut self, cents: i64) -> Self {
        self.value = DiscountValue::FixedAmount(Money::from_cents(cents, Currency::CAD));
        self
    }

    pub fn for_categories(mut self, categories: Vec<PaymentType>) -> Self {
        self.applicable_to = categories;
        self
    }

    pub fn with_max_uses(mut self, max_uses: i32) -> Self {
        self.max_uses = Some(max_uses);
        self
    }

    pub fn valid_between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.valid_from = Some(from);
        self.valid_until = Some(until);
        self
    }

    pub fn build(self) -> NewDiscountCode {
        NewDiscountCode {
            code: self.code,
            template_id: self.template_id,
            name: "Test code".to_string(),
            description: None,
            value: self.value,
            usage_type: UsageType::OneTime,
            applicable_to: self.applicable_to,
            scope: self.scope,
            family_id: self.family_id,
            student_id: self.student_id,
            max_uses: self.max_uses,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            created_automatically: false,
        }
    }
}

/// Builder for automation rules
pub struct RuleBuilder {
    name: String,
    event_type: DiscountEventType,
    template_ids: Vec<DiscountTemplateId>,
    conditions: Value,
    applicable_programs: Vec<ProgramId>,
    code_valid_days: Option<u32>,
    is_active: bool,
}

impl RuleBuilder {
    /// An active rule on `event_type` minting `template_ids` in order
    pub fn on(event_type: DiscountEventType, template_ids: Vec<DiscountTemplateId>) -> Self {
        Self {
            name: format!("{} rule", event_type.as_str()),
            event_type,
            template_ids,
            conditions: Value::Null,
            applicable_programs: Vec::new(),
            code_valid_days: None,
            is_active: true,
        }
    }

    pub fn with_conditions(mut self, conditions: Value) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn for_programs(mut self, programs: Vec<ProgramId>) -> Self {
        self.applicable_programs = programs;
        self
    }

    pub fn codes_valid_for(mut self, days: u32) -> Self {
        self.code_valid_days = Some(days);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn build(self) -> NewAutomationRule {
        NewAutomationRule {
            name: self.name,
            description: None,
            event_type: self.event_type,
            template_ids: self.template_ids,
            conditions: self.conditions,
            applicable_programs: self.applicable_programs,
            valid_from: None,
            valid_until: None,
            code_valid_days: self.code_valid_days,
            is_active: self.is_active,
        }
    }
}

/// An event about a student in a family
pub fn student_event(
    event_type: DiscountEventType,
    student_id: StudentId,
    family_id: FamilyId,
) -> NewDiscountEvent {
    NewDiscountEvent {
        event_type,
        student_id: Some(student_id),
        family_id: Some(family_id),
        event_data: Value::Null,
    }
}

/// Builder for invoice line items
pub struct LineItemBuilder {
    item: InvoiceLineItem,
}

impl Default for LineItemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineItemBuilder {
    /// One month of group classes at $100
    pub fn new() -> Self {
        Self {
            item: InvoiceLineItem::new(
                "Monthly membership",
                ItemType::ClassEnrollment,
                MoneyFixtures::cad_monthly_fee(),
            ),
        }
    }

    pub fn product(description: &str, unit_price_cents: i64) -> Self {
        Self {
            item: InvoiceLineItem::new(
                description,
                ItemType::Product,
                Money::from_cents(unit_price_cents, Currency::CAD),
            ),
        }
    }

    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.item = self.item.with_quantity(quantity);
        self
    }

    pub fn discount_rate(mut self, rate: Decimal) -> Self {
        self.item = self.item.with_discount_rate(rate);
        self
    }

    /// Snapshots `rate` with an explicit amount
    pub fn tax(mut self, rate: &TaxRate, cents: i64) -> Self {
        let tax = LineItemTax::snapshot(rate, Money::from_cents(cents, self.item.currency()));
        self.item = self.item.with_tax(tax);
        self
    }

    pub fn build(self) -> InvoiceLineItem {
        self.item
    }
}
