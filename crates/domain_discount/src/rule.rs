//! Automation rules
//!
//! A rule reacts to one event type. When it applies, it mints one code per
//! template in its [`TemplateSequence`], in order.
//!
//! Conditions are data, never code: a small closed set of predicates that
//! are stored as a JSON object and parsed strictly when the rule is saved.
//!
//! ```json
//! { "belt_rank": "yellow", "min_family_size": 3, "attendance_count": 50 }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use core_kernel::{AutomationRuleId, DiscountTemplateId, ProgramId, ValidityWindow};

use crate::error::DiscountError;
use crate::event::DiscountEventType;

/// Longest lifetime a rule may give the codes it mints
pub const MAX_CODE_VALID_DAYS: u32 = 3650;

/// One predicate a rule requires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    /// The student's most recent belt equals this rank
    BeltRank(String),
    /// The family has at least this many active students
    MinFamilySize(i64),
    /// The student has at least this many attendance records
    AttendanceCount(i64),
}

impl RuleCondition {
    pub fn key(&self) -> &'static str {
        match self {
            RuleCondition::BeltRank(_) => "belt_rank",
            RuleCondition::MinFamilySize(_) => "min_family_size",
            RuleCondition::AttendanceCount(_) => "attendance_count",
        }
    }

    fn value(&self) -> Value {
        match self {
            RuleCondition::BeltRank(rank) => Value::String(rank.clone()),
            RuleCondition::MinFamilySize(n) | RuleCondition::AttendanceCount(n) => Value::from(*n),
        }
    }
}

/// All conditions of a rule, combined with logical AND
///
/// An empty set applies unconditionally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct RuleConditions(Vec<RuleCondition>);

impl RuleConditions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(conditions: Vec<RuleCondition>) -> Self {
        Self(conditions)
    }

    /// Parses the stored JSON object
    ///
    /// `null` means no conditions. Unknown keys and mistyped values are
    /// rejected.
    pub fn from_json(value: &Value) -> Result<Self, DiscountError> {
        let object = match value {
            Value::Null => return Ok(Self::none()),
            Value::Object(object) => object,
            other => {
                return Err(DiscountError::invalid_conditions(format!(
                    "conditions must be an object, got {}",
                    other
                )))
            }
        };

        let mut conditions = Vec::with_capacity(object.len());
        for (key, value) in object {
            let condition = match key.as_str() {
                "belt_rank" => RuleCondition::BeltRank(
                    value
                        .as_str()
                        .filter(|s| !s.trim().is_empty())
                        .ok_or_else(|| {
                            DiscountError::invalid_conditions("belt_rank must be a non-empty string")
                        })?
                        .to_string(),
                ),
                "min_family_size" => RuleCondition::MinFamilySize(threshold(key, value)?),
                "attendance_count" => RuleCondition::AttendanceCount(threshold(key, value)?),
                unknown => {
                    return Err(DiscountError::invalid_conditions(format!(
                        "unknown condition key '{}'",
                        unknown
                    )))
                }
            };
            conditions.push(condition);
        }
        Ok(Self(conditions))
    }

    /// The stored JSON object, or `null` when empty
    pub fn to_json(&self) -> Value {
        if self.0.is_empty() {
            return Value::Null;
        }
        let object: Map<String, Value> = self
            .0
            .iter()
            .map(|c| (c.key().to_string(), c.value()))
            .collect();
        Value::Object(object)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleCondition> {
        self.0.iter()
    }
}

impl TryFrom<Value> for RuleConditions {
    type Error = DiscountError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(&value)
    }
}

impl From<RuleConditions> for Value {
    fn from(value: RuleConditions) -> Self {
        value.to_json()
    }
}

fn threshold(key: &str, value: &Value) -> Result<i64, DiscountError> {
    value
        .as_i64()
        .filter(|n| *n >= 0)
        .ok_or_else(|| DiscountError::invalid_conditions(format!("{} must be a non-negative integer", key)))
}

/// Templates a rule mints, in order; never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DiscountTemplateId>", into = "Vec<DiscountTemplateId>")]
pub struct TemplateSequence(Vec<DiscountTemplateId>);

impl TemplateSequence {
    pub fn new(templates: Vec<DiscountTemplateId>) -> Result<Self, DiscountError> {
        if templates.is_empty() {
            return Err(DiscountError::validation(
                "An automation rule needs at least one discount template",
            ));
        }
        Ok(Self(templates))
    }

    pub fn single(template: DiscountTemplateId) -> Self {
        Self(vec![template])
    }

    pub fn first(&self) -> DiscountTemplateId {
        self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// More than one template is stored through the junction table
    pub fn uses_multiple_templates(&self) -> bool {
        self.0.len() > 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiscountTemplateId> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[DiscountTemplateId] {
        &self.0
    }
}

impl TryFrom<Vec<DiscountTemplateId>> for TemplateSequence {
    type Error = DiscountError;

    fn try_from(value: Vec<DiscountTemplateId>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TemplateSequence> for Vec<DiscountTemplateId> {
    fn from(value: TemplateSequence) -> Self {
        value.0
    }
}

/// A stored automation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: AutomationRuleId,
    pub name: String,
    pub description: Option<String>,
    pub event_type: DiscountEventType,
    pub templates: TemplateSequence,
    pub conditions: RuleConditions,
    /// Empty means every program
    pub applicable_programs: Vec<ProgramId>,
    pub validity: ValidityWindow,
    /// Days a minted code stays valid; open-ended when absent
    pub code_valid_days: Option<u32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutomationRule {
    pub fn create(request: NewAutomationRule) -> Result<Self, DiscountError> {
        let (templates, conditions, validity) = request.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: AutomationRuleId::new_v7(),
            name: request.name.trim().to_string(),
            description: request.description,
            event_type: request.event_type,
            templates,
            conditions,
            applicable_programs: request.applicable_programs,
            validity,
            code_valid_days: request.code_valid_days,
            is_active: request.is_active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Active and inside its validity window at `now`
    pub fn is_in_effect_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.validity.contains(now)
    }

    /// Validity of a code minted by this rule at `now`
    pub fn code_validity(&self, now: DateTime<Utc>) -> Result<ValidityWindow, DiscountError> {
        let until = match self.code_valid_days {
            Some(days) => Some(
                now.checked_add_signed(Duration::days(i64::from(days)))
                    .ok_or_else(|| {
                        DiscountError::validation(format!(
                            "code_valid_days of {} is out of range",
                            days
                        ))
                    })?,
            ),
            None => None,
        };
        Ok(ValidityWindow {
            from: Some(now),
            until,
        })
    }

    pub fn apply_update(&mut self, update: RuleUpdate) -> Result<(), DiscountError> {
        let mut next = self.clone();
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(DiscountError::validation("Rule name is required"));
            }
            next.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            next.description = description;
        }
        if let Some(event_type) = update.event_type {
            next.event_type = event_type;
        }
        if let Some(templates) = update.template_ids {
            next.templates = TemplateSequence::new(templates)?;
        }
        if let Some(conditions) = update.conditions {
            next.conditions = RuleConditions::from_json(&conditions)?;
        }
        if let Some(programs) = update.applicable_programs {
            next.applicable_programs = programs;
        }
        if update.valid_from.is_some() || update.valid_until.is_some() {
            next.validity = ValidityWindow::new(
                update.valid_from.or(self.validity.from),
                update.valid_until.or(self.validity.until),
            )?;
        }
        if let Some(days) = update.code_valid_days {
            validate_code_valid_days(days)?;
            next.code_valid_days = days;
        }
        if let Some(is_active) = update.is_active {
            next.is_active = is_active;
        }
        next.updated_at = Utc::now();
        *self = next;
        Ok(())
    }
}

/// Request for creating a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAutomationRule {
    pub name: String,
    pub description: Option<String>,
    pub event_type: DiscountEventType,
    pub template_ids: Vec<DiscountTemplateId>,
    #[serde(default)]
    pub conditions: Value,
    #[serde(default)]
    pub applicable_programs: Vec<ProgramId>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub code_valid_days: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl NewAutomationRule {
    fn validate(&self) -> Result<(TemplateSequence, RuleConditions, ValidityWindow), DiscountError> {
        if self.name.trim().is_empty() {
            return Err(DiscountError::validation("Rule name is required"));
        }
        let templates = TemplateSequence::new(self.template_ids.clone())?;
        let conditions = RuleConditions::from_json(&self.conditions)?;
        let validity = ValidityWindow::new(self.valid_from, self.valid_until)?;
        validate_code_valid_days(self.code_valid_days)?;
        Ok((templates, conditions, validity))
    }
}

fn validate_code_valid_days(days: Option<u32>) -> Result<(), DiscountError> {
    match days {
        Some(days) if days == 0 || days > MAX_CODE_VALID_DAYS => {
            Err(DiscountError::validation(format!(
                "code_valid_days must be between 1 and {}",
                MAX_CODE_VALID_DAYS
            )))
        }
        _ => Ok(()),
    }
}

/// Reads a field that may be absent, `null` or a value
///
/// Absent stays `None` through `#[serde(default)]`; `null` becomes
/// `Some(None)` so an update can clear the field.
pub fn clearable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update of a rule; `None` leaves a field unchanged
///
/// `description` and `code_valid_days` are cleared with `Some(None)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "clearable")]
    pub description: Option<Option<String>>,
    pub event_type: Option<DiscountEventType>,
    pub template_ids: Option<Vec<DiscountTemplateId>>,
    pub conditions: Option<Value>,
    pub applicable_programs: Option<Vec<ProgramId>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "clearable")]
    pub code_valid_days: Option<Option<u32>>,
    pub is_active: Option<bool>,
}
