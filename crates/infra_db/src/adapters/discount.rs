//! PostgreSQL Discount Adapter
//!
//! Implements [`DiscountStorePort`] on top of [`DiscountRepository`].
//!
//! Fixed-amount values are written to both the cents column and the legacy
//! dollars column; percentages only to the legacy column. Reads prefer the
//! cents column. Rules keep their first template in the legacy
//! `discount_template_id` column and the full sequence in
//! `automation_rule_discount_templates`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use core_kernel::{
    AutomationRuleId, Currency, DiscountAssignmentId, DiscountCodeId, DiscountEventId,
    DiscountTemplateId, DomainPort, FamilyId, HealthCheckResult, HealthCheckable, PortError,
    ProgramId, StudentId, ValidityWindow,
};
use domain_discount::{
    AssignmentKey, AutomationRule, CodeOwner, DiscountAssignment, DiscountCode, DiscountEvent,
    DiscountEventType, DiscountScope, DiscountStorePort, DiscountTemplate, DiscountType,
    DiscountUsage, DiscountValue, MintedCode, RuleConditions, TemplateSequence, UsageType,
};
use domain_tax::PaymentType;

use super::{parse_column, parse_currency, probe, transformation};
use crate::repositories::discount::{
    AutomationRuleRow, DiscountAssignmentRow, DiscountCodeRow, DiscountEventRow,
    DiscountRepository, DiscountTemplateRow, DiscountUsageRow, RuleWithTemplates,
};

const ADAPTER_ID: &str = "postgres-discount-store";

/// PostgreSQL-backed implementation of [`DiscountStorePort`]
#[derive(Debug, Clone)]
pub struct PostgresDiscountStore {
    repository: DiscountRepository,
    pool: PgPool,
    /// Written to the currency column of percentage rows
    default_currency: Currency,
}

impl PostgresDiscountStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: DiscountRepository::new(pool.clone()),
            pool,
            default_currency: Currency::default(),
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.default_currency = currency;
        self
    }

    pub fn repository(&self) -> &DiscountRepository {
        &self.repository
    }
}

impl DomainPort for PostgresDiscountStore {}

#[async_trait]
impl HealthCheckable for PostgresDiscountStore {
    async fn health_check(&self) -> HealthCheckResult {
        probe(&self.pool, ADAPTER_ID).await
    }
}

#[async_trait]
impl DiscountStorePort for PostgresDiscountStore {
    #[instrument(skip(self, template), fields(template_id = %template.id))]
    async fn create_template(&self, template: &DiscountTemplate) -> Result<(), PortError> {
        let row = template_to_row(template, self.default_currency);
        Ok(self.repository.insert_template(&row).await?)
    }

    async fn get_template(&self, id: DiscountTemplateId) -> Result<Option<DiscountTemplate>, PortError> {
        self.repository
            .get_template(id.into())
            .await?
            .map(row_to_template)
            .transpose()
    }

    async fn list_templates(&self, active_only: bool) -> Result<Vec<DiscountTemplate>, PortError> {
        self.repository
            .list_templates(active_only)
            .await?
            .into_iter()
            .map(row_to_template)
            .collect()
    }

    async fn update_template(&self, template: &DiscountTemplate) -> Result<(), PortError> {
        let row = template_to_row(template, self.default_currency);
        self.repository
            .update_template(&row)
            .await
            .map_err(|e| not_found_as(e, "DiscountTemplate", template.id))
    }

    async fn delete_template(&self, id: DiscountTemplateId) -> Result<(), PortError> {
        self.repository
            .delete_template(id.into())
            .await
            .map_err(|e| not_found_as(e, "DiscountTemplate", id))
    }

    #[instrument(skip(self, code), fields(code = %code.code))]
    async fn insert_code(&self, code: &DiscountCode) -> Result<(), PortError> {
        let row = code_to_row(code, self.default_currency);
        Ok(self.repository.insert_code(&row).await?)
    }

    async fn get_code(&self, id: DiscountCodeId) -> Result<Option<DiscountCode>, PortError> {
        self.repository.get_code(id.into()).await?.map(row_to_code).transpose()
    }

    async fn find_code_by_code(&self, code: &str) -> Result<Option<DiscountCode>, PortError> {
        self.repository
            .find_code_by_code(code)
            .await?
            .map(row_to_code)
            .transpose()
    }

    async fn list_codes_for(&self, owner: CodeOwner) -> Result<Vec<DiscountCode>, PortError> {
        let rows = match owner {
            CodeOwner::Family(id) => self.repository.list_codes_for_family(id.into()).await?,
            CodeOwner::Student(id) => self.repository.list_codes_for_student(id.into()).await?,
        };
        rows.into_iter().map(row_to_code).collect()
    }

    async fn deactivate_code(&self, id: DiscountCodeId) -> Result<(), PortError> {
        self.repository
            .deactivate_code(id.into())
            .await
            .map_err(|e| not_found_as(e, "DiscountCode", id))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, PortError> {
        Ok(self.repository.code_exists(code).await?)
    }

    #[instrument(skip(self, rule), fields(rule_id = %rule.id))]
    async fn create_rule(&self, rule: &AutomationRule) -> Result<(), PortError> {
        let (row, templates) = rule_to_row(rule)?;
        Ok(self.repository.insert_rule(&row, &templates).await?)
    }

    async fn get_rule(&self, id: AutomationRuleId) -> Result<Option<AutomationRule>, PortError> {
        self.repository.get_rule(id.into()).await?.map(row_to_rule).transpose()
    }

    async fn update_rule(&self, rule: &AutomationRule) -> Result<(), PortError> {
        let (row, templates) = rule_to_row(rule)?;
        self.repository
            .update_rule(&row, &templates)
            .await
            .map_err(|e| not_found_as(e, "AutomationRule", rule.id))
    }

    async fn list_rules(&self) -> Result<Vec<AutomationRule>, PortError> {
        self.repository
            .list_rules()
            .await?
            .into_iter()
            .map(row_to_rule)
            .collect()
    }

    async fn list_rules_in_effect(
        &self,
        event_type: DiscountEventType,
        at: DateTime<Utc>,
    ) -> Result<Vec<AutomationRule>, PortError> {
        let rows = self
            .repository
            .list_rules_in_effect(event_type.as_str(), at)
            .await?;
        Ok(readable_rules(rows))
    }

    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn insert_event(&self, event: &DiscountEvent) -> Result<(), PortError> {
        let row = DiscountEventRow {
            id: event.id.into(),
            event_type: event.event_type.as_str().to_string(),
            student_id: event.student_id.map(Uuid::from),
            family_id: event.family_id.map(Uuid::from),
            event_data: event.event_data.clone(),
            created_at: event.created_at,
        };
        Ok(self.repository.insert_event(&row).await?)
    }

    async fn find_assignment(&self, key: &AssignmentKey) -> Result<Option<DiscountAssignment>, PortError> {
        let row = self
            .repository
            .find_assignment(
                key.automation_rule_id.into(),
                key.student_id.map(Uuid::from),
                key.family_id.map(Uuid::from),
            )
            .await?;
        Ok(row.map(row_to_assignment))
    }

    async fn list_assignments_for_rule(
        &self,
        rule_id: AutomationRuleId,
    ) -> Result<Vec<DiscountAssignment>, PortError> {
        let rows = self.repository.list_assignments_for_rule(rule_id.into()).await?;
        Ok(rows.into_iter().map(row_to_assignment).collect())
    }

    #[instrument(skip(self, minted), fields(count = minted.len()))]
    async fn mint_assigned_codes(&self, minted: &[MintedCode]) -> Result<(), PortError> {
        let rows: Vec<_> = minted
            .iter()
            .map(|m| {
                (
                    code_to_row(&m.code, self.default_currency),
                    assignment_to_row(&m.assignment),
                )
            })
            .collect();

        self.repository.mint_assigned_codes(&rows).await.map_err(|e| {
            if e.is_duplicate() {
                debug!(error = %e, "Mint rejected by unique constraint");
            }
            PortError::from(e)
        })
    }

    #[instrument(skip(self, usage), fields(code_id = %usage.discount_code_id))]
    async fn record_code_usage(&self, usage: &DiscountUsage) -> Result<DiscountCode, PortError> {
        let row = DiscountUsageRow {
            id: usage.id.into(),
            discount_code_id: usage.discount_code_id.into(),
            family_id: usage.family_id.map(Uuid::from),
            student_id: usage.student_id.map(Uuid::from),
            payment_id: usage.payment_id.map(Uuid::from),
            amount_discounted_cents: usage.amount_discounted.to_cents(),
            currency: usage.amount_discounted.currency().code().to_string(),
            used_at: usage.used_at,
        };

        match self.repository.record_code_usage(&row).await? {
            Some(updated) => row_to_code(updated),
            None => {
                if self.repository.get_code(row.discount_code_id).await?.is_some() {
                    warn!("Discount code has no uses left");
                    Err(PortError::conflict(format!(
                        "Discount code {} has no uses left",
                        usage.discount_code_id
                    )))
                } else {
                    Err(PortError::not_found("DiscountCode", usage.discount_code_id))
                }
            }
        }
    }
}

/// Reports a missing row as `NotFound` for the given entity
fn not_found_as(
    error: crate::error::DatabaseError,
    entity: &str,
    id: impl std::fmt::Display,
) -> PortError {
    if error.is_not_found() {
        PortError::not_found(entity, id)
    } else {
        PortError::from(error)
    }
}

fn value_columns(value: &DiscountValue, fallback: Currency) -> (String, Decimal, Option<i64>, String) {
    let (discount_type, legacy_value, cents) = value.to_columns();
    let currency = match value {
        DiscountValue::FixedAmount(amount) => amount.currency(),
        DiscountValue::Percentage(_) => fallback,
    };
    (
        discount_type.as_str().to_string(),
        legacy_value,
        cents,
        currency.code().to_string(),
    )
}

fn read_value(
    discount_type: &str,
    legacy_value: Decimal,
    cents: Option<i64>,
    currency: &str,
) -> Result<DiscountValue, PortError> {
    let discount_type = parse_column(discount_type, DiscountType::parse, "discount_type")?;
    DiscountValue::from_columns(discount_type, legacy_value, cents, parse_currency(currency)?)
        .map_err(transformation)
}

fn categories_to_column(categories: &[PaymentType]) -> Vec<String> {
    categories.iter().map(|c| c.as_str().to_string()).collect()
}

fn read_categories(values: &[String]) -> Result<Vec<PaymentType>, PortError> {
    values
        .iter()
        .map(|v| parse_column(v, PaymentType::parse, "applicable_to"))
        .collect()
}

fn template_to_row(template: &DiscountTemplate, fallback: Currency) -> DiscountTemplateRow {
    let (discount_type, discount_value, discount_value_cents, currency) =
        value_columns(&template.value, fallback);
    DiscountTemplateRow {
        id: template.id.into(),
        name: template.name.clone(),
        description: template.description.clone(),
        discount_type,
        discount_value,
        discount_value_cents,
        currency,
        usage_type: template.usage_type.as_str().to_string(),
        applicable_to: categories_to_column(&template.applicable_to),
        scope: template.scope.as_str().to_string(),
        max_uses: template.max_uses,
        is_active: template.is_active,
        created_at: template.created_at,
        updated_at: template.updated_at,
    }
}

fn row_to_template(row: DiscountTemplateRow) -> Result<DiscountTemplate, PortError> {
    Ok(DiscountTemplate {
        id: DiscountTemplateId::from(row.id),
        value: read_value(
            &row.discount_type,
            row.discount_value,
            row.discount_value_cents,
            &row.currency,
        )?,
        usage_type: parse_column(&row.usage_type, UsageType::parse, "usage_type")?,
        applicable_to: read_categories(&row.applicable_to)?,
        scope: parse_column(&row.scope, DiscountScope::parse, "scope")?,
        name: row.name,
        description: row.description,
        max_uses: row.max_uses,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn code_to_row(code: &DiscountCode, fallback: Currency) -> DiscountCodeRow {
    let (discount_type, discount_value, discount_value_cents, currency) =
        value_columns(&code.value, fallback);
    DiscountCodeRow {
        id: code.id.into(),
        code: code.code.clone(),
        discount_template_id: code.template_id.map(Uuid::from),
        name: code.name.clone(),
        description: code.description.clone(),
        discount_type,
        discount_value,
        discount_value_cents,
        currency,
        usage_type: code.usage_type.as_str().to_string(),
        applicable_to: categories_to_column(&code.applicable_to),
        scope: code.owner.scope().as_str().to_string(),
        family_id: code.owner.family_id().map(Uuid::from),
        student_id: code.owner.student_id().map(Uuid::from),
        max_uses: code.max_uses,
        times_used: code.times_used,
        valid_from: code.validity.from,
        valid_until: code.validity.until,
        is_active: code.is_active,
        created_automatically: code.created_automatically,
        created_at: code.created_at,
    }
}

fn row_to_code(row: DiscountCodeRow) -> Result<DiscountCode, PortError> {
    let scope = parse_column(&row.scope, DiscountScope::parse, "scope")?;
    let owner = CodeOwner::for_scope(
        scope,
        row.family_id.map(FamilyId::from),
        row.student_id.map(StudentId::from),
    )
    .map_err(transformation)?;

    Ok(DiscountCode {
        id: DiscountCodeId::from(row.id),
        template_id: row.discount_template_id.map(DiscountTemplateId::from),
        value: read_value(
            &row.discount_type,
            row.discount_value,
            row.discount_value_cents,
            &row.currency,
        )?,
        usage_type: parse_column(&row.usage_type, UsageType::parse, "usage_type")?,
        applicable_to: read_categories(&row.applicable_to)?,
        owner,
        validity: ValidityWindow {
            from: row.valid_from,
            until: row.valid_until,
        },
        code: row.code,
        name: row.name,
        description: row.description,
        max_uses: row.max_uses,
        times_used: row.times_used,
        is_active: row.is_active,
        created_automatically: row.created_automatically,
        created_at: row.created_at,
    })
}

fn rule_to_row(rule: &AutomationRule) -> Result<(AutomationRuleRow, Vec<Uuid>), PortError> {
    let conditions = match rule.conditions.to_json() {
        Value::Null => None,
        value => Some(value),
    };
    let code_valid_days = rule
        .code_valid_days
        .map(i32::try_from)
        .transpose()
        .map_err(|_| PortError::validation_field("code_valid_days is too large", "code_valid_days"))?;

    let row = AutomationRuleRow {
        id: rule.id.into(),
        name: rule.name.clone(),
        description: rule.description.clone(),
        event_type: rule.event_type.as_str().to_string(),
        discount_template_id: rule.templates.first().into(),
        uses_multiple_templates: rule.templates.uses_multiple_templates(),
        conditions,
        applicable_programs: rule.applicable_programs.iter().copied().map(Uuid::from).collect(),
        valid_from: rule.validity.from,
        valid_until: rule.validity.until,
        code_valid_days,
        is_active: rule.is_active,
        created_at: rule.created_at,
        updated_at: rule.updated_at,
    };
    let templates = rule.templates.iter().copied().map(Uuid::from).collect();
    Ok((row, templates))
}

/// Converts rule rows, skipping any row that no longer parses
///
/// One unreadable rule must not keep the others of its event type from
/// running.
fn readable_rules(rows: Vec<RuleWithTemplates>) -> Vec<AutomationRule> {
    rows.into_iter()
        .filter_map(|stored| {
            let rule_id = stored.rule.id;
            match row_to_rule(stored) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    error!(rule_id = %rule_id, error = %e, "Skipping unreadable automation rule");
                    None
                }
            }
        })
        .collect()
}

fn row_to_rule(stored: RuleWithTemplates) -> Result<AutomationRule, PortError> {
    let RuleWithTemplates { rule: row, template_ids } = stored;

    let templates = TemplateSequence::new(
        template_ids.into_iter().map(DiscountTemplateId::from).collect(),
    )
    .map_err(transformation)?;
    let conditions = RuleConditions::from_json(row.conditions.as_ref().unwrap_or(&Value::Null))
        .map_err(transformation)?;
    let code_valid_days = row
        .code_valid_days
        .map(u32::try_from)
        .transpose()
        .map_err(transformation)?;

    Ok(AutomationRule {
        id: AutomationRuleId::from(row.id),
        event_type: parse_column(&row.event_type, DiscountEventType::parse, "event_type")?,
        templates,
        conditions,
        applicable_programs: row.applicable_programs.into_iter().map(ProgramId::from).collect(),
        validity: ValidityWindow {
            from: row.valid_from,
            until: row.valid_until,
        },
        code_valid_days,
        name: row.name,
        description: row.description,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn assignment_to_row(assignment: &DiscountAssignment) -> DiscountAssignmentRow {
    DiscountAssignmentRow {
        id: assignment.id.into(),
        automation_rule_id: assignment.automation_rule_id.into(),
        discount_event_id: assignment.discount_event_id.into(),
        student_id: assignment.student_id.map(Uuid::from),
        family_id: assignment.family_id.map(Uuid::from),
        discount_code_id: assignment.discount_code_id.into(),
        sequence_order: assignment.sequence_order,
        assigned_at: assignment.assigned_at,
    }
}

fn row_to_assignment(row: DiscountAssignmentRow) -> DiscountAssignment {
    DiscountAssignment {
        id: DiscountAssignmentId::from(row.id),
        automation_rule_id: AutomationRuleId::from(row.automation_rule_id),
        discount_event_id: DiscountEventId::from(row.discount_event_id),
        student_id: row.student_id.map(StudentId::from),
        family_id: row.family_id.map(FamilyId::from),
        discount_code_id: DiscountCodeId::from(row.discount_code_id),
        sequence_order: row.sequence_order,
        assigned_at: row.assigned_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Money;
    use domain_discount::{NewAutomationRule, NewDiscountTemplate};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn template(value: DiscountValue) -> DiscountTemplate {
        DiscountTemplate::create(NewDiscountTemplate {
            name: "Sibling discount".to_string(),
            description: None,
            value,
            usage_type: UsageType::Ongoing,
            applicable_to: vec![PaymentType::MonthlyGroup, PaymentType::YearlyGroup],
            scope: DiscountScope::PerFamily,
            max_uses: None,
            is_active: true,
        })
        .unwrap()
    }

    #[test]
    fn test_fixed_template_round_trips_through_row() {
        let original = template(DiscountValue::FixedAmount(Money::from_cents(2550, Currency::CAD)));
        let row = template_to_row(&original, Currency::CAD);

        assert_eq!(row.discount_type, "fixed_amount");
        assert_eq!(row.discount_value, dec!(25.50));
        assert_eq!(row.discount_value_cents, Some(2550));
        assert_eq!(row.applicable_to, vec!["monthly_group", "yearly_group"]);
        assert_eq!(row_to_template(row).unwrap(), original);
    }

    #[test]
    fn test_percentage_uses_fallback_currency() {
        let original = template(DiscountValue::Percentage(dec!(15)));
        let row = template_to_row(&original, Currency::USD);

        assert_eq!(row.currency, "USD");
        assert_eq!(row.discount_value_cents, None);
        assert_eq!(row_to_template(row).unwrap().value, DiscountValue::Percentage(dec!(15)));
    }

    #[test]
    fn test_legacy_dollars_row_reads_as_cents() {
        let mut row = template_to_row(
            &template(DiscountValue::FixedAmount(Money::from_cents(1000, Currency::CAD))),
            Currency::CAD,
        );
        row.discount_value = dec!(12.34);
        row.discount_value_cents = None;

        let read = row_to_template(row).unwrap();
        assert_eq!(read.value, DiscountValue::FixedAmount(Money::from_cents(1234, Currency::CAD)));
    }

    #[test]
    fn test_unknown_enum_value_is_transformation_error() {
        let mut row = template_to_row(&template(DiscountValue::Percentage(dec!(5))), Currency::CAD);
        row.scope = "per_household".to_string();

        let err = row_to_template(row).unwrap_err();
        assert!(matches!(err, PortError::Transformation { .. }));
    }

    #[test]
    fn test_code_row_with_both_owners_is_rejected() {
        let owner = CodeOwner::Family(FamilyId::new());
        let code = DiscountCode::from_template(
            &template(DiscountValue::Percentage(dec!(10))),
            "AUTOABC12345".to_string(),
            owner,
            ValidityWindow::unbounded(),
        );
        let mut row = code_to_row(&code, Currency::CAD);
        assert_eq!(row.scope, "per_family");
        assert_eq!(row_to_code(row.clone()).unwrap(), code);

        row.student_id = Some(Uuid::new_v4());
        assert!(row_to_code(row).is_err());
    }

    #[test]
    fn test_rule_row_keeps_sequence_and_legacy_column() {
        let first = DiscountTemplateId::new();
        let second = DiscountTemplateId::new();
        let rule = AutomationRule::create(NewAutomationRule {
            name: "Yellow belt reward".to_string(),
            description: None,
            event_type: DiscountEventType::BeltPromotion,
            template_ids: vec![first, second],
            conditions: json!({ "belt_rank": "yellow" }),
            applicable_programs: vec![],
            valid_from: None,
            valid_until: None,
            code_valid_days: Some(30),
            is_active: true,
        })
        .unwrap();

        let (row, templates) = rule_to_row(&rule).unwrap();
        assert_eq!(row.discount_template_id, Uuid::from(first));
        assert!(row.uses_multiple_templates);
        assert_eq!(row.conditions, Some(json!({ "belt_rank": "yellow" })));
        assert_eq!(row.code_valid_days, Some(30));

        let read = row_to_rule(RuleWithTemplates { rule: row, template_ids: templates }).unwrap();
        assert_eq!(read, rule);
    }

    #[test]
    fn test_rule_without_sequence_rows_falls_back_to_legacy_template() {
        let legacy = Uuid::new_v4();
        let row = AutomationRuleRow {
            id: Uuid::new_v4(),
            name: "Welcome".to_string(),
            description: None,
            event_type: "student_enrollment".to_string(),
            discount_template_id: legacy,
            uses_multiple_templates: false,
            conditions: None,
            applicable_programs: vec![],
            valid_from: None,
            valid_until: None,
            code_valid_days: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let rule = row_to_rule(RuleWithTemplates { rule: row, template_ids: vec![legacy] }).unwrap();
        assert_eq!(rule.templates.first(), DiscountTemplateId::from(legacy));
        assert!(rule.conditions.is_empty());
    }

    fn stored_rule(conditions: Option<Value>) -> RuleWithTemplates {
        let template = Uuid::new_v4();
        RuleWithTemplates {
            rule: AutomationRuleRow {
                id: Uuid::new_v4(),
                name: "Enrollment".to_string(),
                description: None,
                event_type: "student_enrollment".to_string(),
                discount_template_id: template,
                uses_multiple_templates: false,
                conditions,
                applicable_programs: vec![],
                valid_from: None,
                valid_until: None,
                code_valid_days: None,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            template_ids: vec![template],
        }
    }

    #[test]
    fn test_unreadable_rule_rows_are_skipped() {
        let good = stored_rule(Some(json!({ "min_family_size": 2 })));
        let good_id = good.rule.id;
        let rows = vec![
            stored_rule(Some(json!({ "favourite_colour": "blue" }))),
            good,
            stored_rule(Some(json!({ "attendance_count": "fifty" }))),
        ];

        let rules = readable_rules(rows);
        assert_eq!(rules.len(), 1);
        assert_eq!(Uuid::from(rules[0].id), good_id);
    }
}
