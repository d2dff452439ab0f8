//! Discount repository implementation
//!
//! SQL for templates, codes, automation rules, events, assignments and code
//! usage. Rows mirror the tables column for column; the discount adapter
//! maps them to domain types.
//!
//! Writes that span several tables run in one transaction: a rule and its
//! template sequence, a rule firing's codes and assignments, and a code
//! redemption with its usage counter.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgExecutor, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::DatabaseError;

const TEMPLATE_COLUMNS: &str = "id, name, description, discount_type, discount_value, \
    discount_value_cents, currency, usage_type, applicable_to, scope, max_uses, is_active, \
    created_at, updated_at";

const CODE_COLUMNS: &str = "id, code, discount_template_id, name, description, discount_type, \
    discount_value, discount_value_cents, currency, usage_type, applicable_to, scope, family_id, \
    student_id, max_uses, times_used, valid_from, valid_until, is_active, created_automatically, \
    created_at";

const RULE_COLUMNS: &str = "id, name, description, event_type, discount_template_id, \
    uses_multiple_templates, conditions, applicable_programs, valid_from, valid_until, \
    code_valid_days, is_active, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "id, automation_rule_id, discount_event_id, student_id, \
    family_id, discount_code_id, sequence_order, assigned_at";

/// Repository for the discount tables
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: PgPool,
}

impl DiscountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    #[instrument(skip(self, row), fields(template_id = %row.id))]
    pub async fn insert_template(&self, row: &DiscountTemplateRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO discount_templates (
                id, name, description, discount_type, discount_value, discount_value_cents,
                currency, usage_type, applicable_to, scope, max_uses, is_active,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.discount_type)
        .bind(row.discount_value)
        .bind(row.discount_value_cents)
        .bind(&row.currency)
        .bind(&row.usage_type)
        .bind(&row.applicable_to)
        .bind(&row.scope)
        .bind(row.max_uses)
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_template(&self, id: Uuid) -> Result<Option<DiscountTemplateRow>, DatabaseError> {
        let row = sqlx::query_as::<_, DiscountTemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM discount_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_templates(&self, active_only: bool) -> Result<Vec<DiscountTemplateRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, DiscountTemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM discount_templates \
             WHERE ($1 = FALSE OR is_active) ORDER BY name"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self, row), fields(template_id = %row.id))]
    pub async fn update_template(&self, row: &DiscountTemplateRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE discount_templates SET
                name = $2, description = $3, discount_type = $4, discount_value = $5,
                discount_value_cents = $6, currency = $7, usage_type = $8, applicable_to = $9,
                scope = $10, max_uses = $11, is_active = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.discount_type)
        .bind(row.discount_value)
        .bind(row.discount_value_cents)
        .bind(&row.currency)
        .bind(&row.usage_type)
        .bind(&row.applicable_to)
        .bind(&row.scope)
        .bind(row.max_uses)
        .bind(row.is_active)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("DiscountTemplate", row.id));
        }
        Ok(())
    }

    /// Deletes a template; rules still referencing it block the delete
    pub async fn delete_template(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM discount_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("DiscountTemplate", id));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Codes
    // ------------------------------------------------------------------

    #[instrument(skip(self, row), fields(code = %row.code))]
    pub async fn insert_code(&self, row: &DiscountCodeRow) -> Result<(), DatabaseError> {
        insert_code_with(&self.pool, row).await
    }

    pub async fn get_code(&self, id: Uuid) -> Result<Option<DiscountCodeRow>, DatabaseError> {
        let row = sqlx::query_as::<_, DiscountCodeRow>(&format!(
            "SELECT {CODE_COLUMNS} FROM discount_codes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Case-insensitive lookup by code text
    pub async fn find_code_by_code(&self, code: &str) -> Result<Option<DiscountCodeRow>, DatabaseError> {
        let row = sqlx::query_as::<_, DiscountCodeRow>(&format!(
            "SELECT {CODE_COLUMNS} FROM discount_codes WHERE UPPER(code) = UPPER($1)"
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_codes_for_family(&self, family_id: Uuid) -> Result<Vec<DiscountCodeRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, DiscountCodeRow>(&format!(
            "SELECT {CODE_COLUMNS} FROM discount_codes WHERE family_id = $1 ORDER BY created_at"
        ))
        .bind(family_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_codes_for_student(&self, student_id: Uuid) -> Result<Vec<DiscountCodeRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, DiscountCodeRow>(&format!(
            "SELECT {CODE_COLUMNS} FROM discount_codes WHERE student_id = $1 ORDER BY created_at"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn deactivate_code(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE discount_codes SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("DiscountCode", id));
        }
        Ok(())
    }

    pub async fn code_exists(&self, code: &str) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM discount_codes WHERE UPPER(code) = UPPER($1))",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    // ------------------------------------------------------------------
    // Automation rules
    // ------------------------------------------------------------------

    /// Inserts a rule and its ordered template list
    #[instrument(skip(self, row, templates), fields(rule_id = %row.id))]
    pub async fn insert_rule(&self, row: &AutomationRuleRow, templates: &[Uuid]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO discount_automation_rules (
                id, name, description, event_type, discount_template_id,
                uses_multiple_templates, conditions, applicable_programs, valid_from,
                valid_until, code_valid_days, is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.event_type)
        .bind(row.discount_template_id)
        .bind(row.uses_multiple_templates)
        .bind(&row.conditions)
        .bind(&row.applicable_programs)
        .bind(row.valid_from)
        .bind(row.valid_until)
        .bind(row.code_valid_days)
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_rule_templates(&mut tx, row.id, templates).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replaces a rule's columns and template list
    #[instrument(skip(self, row, templates), fields(rule_id = %row.id))]
    pub async fn update_rule(&self, row: &AutomationRuleRow, templates: &[Uuid]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE discount_automation_rules SET
                name = $2, description = $3, event_type = $4, discount_template_id = $5,
                uses_multiple_templates = $6, conditions = $7, applicable_programs = $8,
                valid_from = $9, valid_until = $10, code_valid_days = $11, is_active = $12,
                updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.event_type)
        .bind(row.discount_template_id)
        .bind(row.uses_multiple_templates)
        .bind(&row.conditions)
        .bind(&row.applicable_programs)
        .bind(row.valid_from)
        .bind(row.valid_until)
        .bind(row.code_valid_days)
        .bind(row.is_active)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("AutomationRule", row.id));
        }

        sqlx::query("DELETE FROM automation_rule_discount_templates WHERE automation_rule_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        insert_rule_templates(&mut tx, row.id, templates).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_rule(&self, id: Uuid) -> Result<Option<RuleWithTemplates>, DatabaseError> {
        let row = sqlx::query_as::<_, AutomationRuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM discount_automation_rules WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_templates(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn list_rules(&self) -> Result<Vec<RuleWithTemplates>, DatabaseError> {
        let rows = sqlx::query_as::<_, AutomationRuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM discount_automation_rules ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        self.attach_templates(rows).await
    }

    /// Active rules for an event type whose window contains `at`
    ///
    /// Both window bounds are inclusive.
    pub async fn list_rules_in_effect(
        &self,
        event_type: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<RuleWithTemplates>, DatabaseError> {
        let rows = sqlx::query_as::<_, AutomationRuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM discount_automation_rules \
             WHERE event_type = $1 AND is_active \
               AND (valid_from IS NULL OR valid_from <= $2) \
               AND (valid_until IS NULL OR valid_until >= $2) \
             ORDER BY created_at, id"
        ))
        .bind(event_type)
        .bind(at)
        .fetch_all(&self.pool)
        .await?;
        self.attach_templates(rows).await
    }

    /// Loads the template sequence for each rule
    ///
    /// Rules written before the junction table existed have no sequence
    /// rows; their legacy single template is used instead.
    async fn attach_templates(
        &self,
        rows: Vec<AutomationRuleRow>,
    ) -> Result<Vec<RuleWithTemplates>, DatabaseError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let links = sqlx::query_as::<_, RuleTemplateRow>(
            r#"
            SELECT automation_rule_id, discount_template_id
            FROM automation_rule_discount_templates
            WHERE automation_rule_id = ANY($1)
            ORDER BY automation_rule_id, sequence_order
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|rule| {
                let mut template_ids: Vec<Uuid> = links
                    .iter()
                    .filter(|l| l.automation_rule_id == rule.id)
                    .map(|l| l.discount_template_id)
                    .collect();
                if template_ids.is_empty() {
                    template_ids.push(rule.discount_template_id);
                }
                RuleWithTemplates { rule, template_ids }
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Events and assignments
    // ------------------------------------------------------------------

    #[instrument(skip(self, row), fields(event_id = %row.id, event_type = %row.event_type))]
    pub async fn insert_event(&self, row: &DiscountEventRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO discount_events (id, event_type, student_id, family_id, event_data, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(row.id)
        .bind(&row.event_type)
        .bind(row.student_id)
        .bind(row.family_id)
        .bind(&row.event_data)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// First assignment for a rule and student/family pair, nulls matching nulls
    pub async fn find_assignment(
        &self,
        rule_id: Uuid,
        student_id: Option<Uuid>,
        family_id: Option<Uuid>,
    ) -> Result<Option<DiscountAssignmentRow>, DatabaseError> {
        let row = sqlx::query_as::<_, DiscountAssignmentRow>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM discount_assignments \
             WHERE automation_rule_id = $1 \
               AND student_id IS NOT DISTINCT FROM $2 \
               AND family_id IS NOT DISTINCT FROM $3 \
             ORDER BY sequence_order LIMIT 1"
        ))
        .bind(rule_id)
        .bind(student_id)
        .bind(family_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_assignments_for_rule(
        &self,
        rule_id: Uuid,
    ) -> Result<Vec<DiscountAssignmentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, DiscountAssignmentRow>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM discount_assignments \
             WHERE automation_rule_id = $1 ORDER BY assigned_at, sequence_order"
        ))
        .bind(rule_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Writes every code and assignment of one rule firing, or none of them
    ///
    /// A second firing for the same rule, student/family pair and position
    /// hits the unique index and fails with `DuplicateEntry`.
    #[instrument(skip(self, minted), fields(count = minted.len()))]
    pub async fn mint_assigned_codes(
        &self,
        minted: &[(DiscountCodeRow, DiscountAssignmentRow)],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        for (code, assignment) in minted {
            insert_code_with(&mut *tx, code).await?;
            sqlx::query(
                r#"
                INSERT INTO discount_assignments (
                    id, automation_rule_id, discount_event_id, student_id, family_id,
                    discount_code_id, sequence_order, assigned_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(assignment.id)
            .bind(assignment.automation_rule_id)
            .bind(assignment.discount_event_id)
            .bind(assignment.student_id)
            .bind(assignment.family_id)
            .bind(assignment.discount_code_id)
            .bind(assignment.sequence_order)
            .bind(assignment.assigned_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Minted assigned discount codes");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Usage
    // ------------------------------------------------------------------

    /// Increments `times_used` and records the usage row together
    ///
    /// Returns `None`, writing nothing, when the code has no uses left or
    /// does not exist.
    #[instrument(skip(self, usage), fields(code_id = %usage.discount_code_id))]
    pub async fn record_code_usage(
        &self,
        usage: &DiscountUsageRow,
    ) -> Result<Option<DiscountCodeRow>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, DiscountCodeRow>(&format!(
            "UPDATE discount_codes SET times_used = times_used + 1, updated_at = NOW() \
             WHERE id = $1 AND (max_uses IS NULL OR times_used < max_uses) \
             RETURNING {CODE_COLUMNS}"
        ))
        .bind(usage.discount_code_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(code) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO discount_code_usage (
                id, discount_code_id, family_id, student_id, payment_id,
                amount_discounted_cents, currency, used_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(usage.id)
        .bind(usage.discount_code_id)
        .bind(usage.family_id)
        .bind(usage.student_id)
        .bind(usage.payment_id)
        .bind(usage.amount_discounted_cents)
        .bind(&usage.currency)
        .bind(usage.used_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(code))
    }

    pub async fn list_usage_for_code(&self, code_id: Uuid) -> Result<Vec<DiscountUsageRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, DiscountUsageRow>(
            r#"
            SELECT id, discount_code_id, family_id, student_id, payment_id,
                   amount_discounted_cents, currency, used_at
            FROM discount_code_usage
            WHERE discount_code_id = $1
            ORDER BY used_at
            "#,
        )
        .bind(code_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

async fn insert_code_with<'e, E>(executor: E, row: &DiscountCodeRow) -> Result<(), DatabaseError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO discount_codes (
            id, code, discount_template_id, name, description, discount_type, discount_value,
            discount_value_cents, currency, usage_type, applicable_to, scope, family_id,
            student_id, max_uses, times_used, valid_from, valid_until, is_active,
            created_automatically, created_at, updated_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
            $19, $20, $21, $21
        )
        "#,
    )
    .bind(row.id)
    .bind(&row.code)
    .bind(row.discount_template_id)
    .bind(&row.name)
    .bind(&row.description)
    .bind(&row.discount_type)
    .bind(row.discount_value)
    .bind(row.discount_value_cents)
    .bind(&row.currency)
    .bind(&row.usage_type)
    .bind(&row.applicable_to)
    .bind(&row.scope)
    .bind(row.family_id)
    .bind(row.student_id)
    .bind(row.max_uses)
    .bind(row.times_used)
    .bind(row.valid_from)
    .bind(row.valid_until)
    .bind(row.is_active)
    .bind(row.created_automatically)
    .bind(row.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

async fn insert_rule_templates(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    rule_id: Uuid,
    templates: &[Uuid],
) -> Result<(), DatabaseError> {
    for (position, template_id) in templates.iter().enumerate() {
        let sequence_order = i32::try_from(position)
            .map_err(|_| DatabaseError::invalid_data("template sequence too long"))?;
        sqlx::query(
            r#"
            INSERT INTO automation_rule_discount_templates
                (automation_rule_id, discount_template_id, sequence_order)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(rule_id)
        .bind(template_id)
        .bind(sequence_order)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Row of `discount_templates`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DiscountTemplateRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub discount_value_cents: Option<i64>,
    pub currency: String,
    pub usage_type: String,
    pub applicable_to: Vec<String>,
    pub scope: String,
    pub max_uses: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of `discount_codes`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DiscountCodeRow {
    pub id: Uuid,
    pub code: String,
    pub discount_template_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub discount_value_cents: Option<i64>,
    pub currency: String,
    pub usage_type: String,
    pub applicable_to: Vec<String>,
    pub scope: String,
    pub family_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_automatically: bool,
    pub created_at: DateTime<Utc>,
}

/// Row of `discount_automation_rules`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AutomationRuleRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub event_type: String,
    /// First template of the sequence
    pub discount_template_id: Uuid,
    pub uses_multiple_templates: bool,
    pub conditions: Option<Value>,
    pub applicable_programs: Vec<Uuid>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub code_valid_days: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct RuleTemplateRow {
    automation_rule_id: Uuid,
    discount_template_id: Uuid,
}

/// A rule row with its ordered template ids
#[derive(Debug, Clone, PartialEq)]
pub struct RuleWithTemplates {
    pub rule: AutomationRuleRow,
    pub template_ids: Vec<Uuid>,
}

/// Row of `discount_events`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DiscountEventRow {
    pub id: Uuid,
    pub event_type: String,
    pub student_id: Option<Uuid>,
    pub family_id: Option<Uuid>,
    pub event_data: Value,
    pub created_at: DateTime<Utc>,
}

/// Row of `discount_assignments`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DiscountAssignmentRow {
    pub id: Uuid,
    pub automation_rule_id: Uuid,
    pub discount_event_id: Uuid,
    pub student_id: Option<Uuid>,
    pub family_id: Option<Uuid>,
    pub discount_code_id: Uuid,
    pub sequence_order: i32,
    pub assigned_at: DateTime<Utc>,
}

/// Row of `discount_code_usage`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DiscountUsageRow {
    pub id: Uuid,
    pub discount_code_id: Uuid,
    pub family_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub amount_discounted_cents: i64,
    pub currency: String,
    pub used_at: DateTime<Utc>,
}
