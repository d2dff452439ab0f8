//! Automation rule engine
//!
//! Processing is a single pass per event:
//!
//! 1. Load the active rules for the event type whose window contains now.
//! 2. For each rule, independently:
//!    - check the program filter,
//!    - evaluate the conditions,
//!    - skip if the rule already assigned codes to this student/family,
//!    - mint one code per template and record the assignments in one
//!      atomic write.
//!
//! A rule that fails is logged and reported; the remaining rules still run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use core_kernel::{AutomationRuleId, DiscountEventId};

use crate::assignment::{AssignmentKey, DiscountAssignment, MintedCode};
use crate::code::{CodeOwner, DiscountCode};
use crate::codegen::CodeGenerator;
use crate::error::DiscountError;
use crate::event::DiscountEvent;
use crate::ports::{DiscountStorePort, StudentFactsPort};
use crate::rule::{AutomationRule, RuleCondition};
use crate::template::{DiscountScope, DiscountTemplate};

/// What happened to one rule for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RuleOutcome {
    /// Codes were minted, in template order
    Assigned { codes: Vec<String> },
    /// The rule had already fired for this student/family
    AlreadyAssigned,
    /// None of the student's programs are covered by the rule
    ProgramMismatch,
    ConditionsNotMet,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleProcessing {
    pub rule_id: AutomationRuleId,
    pub rule_name: String,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

/// Per-rule results for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub event_id: DiscountEventId,
    pub rules: Vec<RuleProcessing>,
}

impl ProcessingReport {
    /// Every code minted for the event
    pub fn assigned_codes(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter_map(|r| match &r.outcome {
                RuleOutcome::Assigned { codes } => Some(codes.iter().map(String::as_str)),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RuleProcessing> {
        self.rules
            .iter()
            .filter(|r| matches!(r.outcome, RuleOutcome::Failed { .. }))
    }

    pub fn outcome_for(&self, rule_id: AutomationRuleId) -> Option<&RuleOutcome> {
        self.rules.iter().find(|r| r.rule_id == rule_id).map(|r| &r.outcome)
    }
}

/// Evaluates rules against events and mints codes
pub struct AutomationEngine {
    store: Arc<dyn DiscountStorePort>,
    facts: Arc<dyn StudentFactsPort>,
    codes: CodeGenerator,
}

impl AutomationEngine {
    pub fn new(
        store: Arc<dyn DiscountStorePort>,
        facts: Arc<dyn StudentFactsPort>,
        codes: CodeGenerator,
    ) -> Self {
        Self { store, facts, codes }
    }

    /// Runs every rule in effect for the event
    ///
    /// Only a failure to load the rules is returned as an error. Failures
    /// of individual rules are reported in the result.
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = ?event.event_type))]
    pub async fn process_event(&self, event: &DiscountEvent) -> Result<ProcessingReport, DiscountError> {
        let now = Utc::now();
        let rules = self.store.list_rules_in_effect(event.event_type, now).await?;
        debug!(rules = rules.len(), "Evaluating automation rules");

        let mut processed = Vec::with_capacity(rules.len());
        for rule in rules {
            let outcome = match self.process_rule(&rule, event, now).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(rule_id = %rule.id, event_id = %event.id, error = %e, "Automation rule failed");
                    RuleOutcome::Failed { error: e.to_string() }
                }
            };
            processed.push(RuleProcessing {
                rule_id: rule.id,
                rule_name: rule.name,
                outcome,
            });
        }

        Ok(ProcessingReport {
            event_id: event.id,
            rules: processed,
        })
    }

    async fn process_rule(
        &self,
        rule: &AutomationRule,
        event: &DiscountEvent,
        now: DateTime<Utc>,
    ) -> Result<RuleOutcome, DiscountError> {
        if !self.matches_programs(rule, event).await? {
            return Ok(RuleOutcome::ProgramMismatch);
        }
        if !self.evaluate_rule_conditions(rule, event).await? {
            return Ok(RuleOutcome::ConditionsNotMet);
        }

        let key = AssignmentKey::for_event(rule.id, event);
        if self.store.find_assignment(&key).await?.is_some() {
            debug!(rule_id = %rule.id, "Rule already assigned, skipping");
            return Ok(RuleOutcome::AlreadyAssigned);
        }

        let minted = self.prepare_codes(rule, event, now).await?;
        if let Err(e) = self.store.mint_assigned_codes(&minted).await {
            if e.is_conflict() && self.store.find_assignment(&key).await?.is_some() {
                debug!(rule_id = %rule.id, "Concurrent assignment won, skipping");
                return Ok(RuleOutcome::AlreadyAssigned);
            }
            return Err(e.into());
        }

        let codes: Vec<String> = minted.into_iter().map(|m| m.code.code).collect();
        info!(rule_id = %rule.id, event_id = %event.id, codes = ?codes, "Assigned automated discount codes");
        Ok(RuleOutcome::Assigned { codes })
    }

    /// True when the rule has no program filter, the event has no student,
    /// or one of the student's active programs is listed
    async fn matches_programs(&self, rule: &AutomationRule, event: &DiscountEvent) -> Result<bool, DiscountError> {
        let student_id = match event.student_id {
            Some(id) if !rule.applicable_programs.is_empty() => id,
            _ => return Ok(true),
        };
        let programs = self.facts.active_program_ids(student_id).await?;
        Ok(programs.iter().any(|p| rule.applicable_programs.contains(p)))
    }

    /// Evaluates every condition of `rule` for the event's subject
    ///
    /// A condition about a student fails when the event has no student, and
    /// likewise for families.
    pub async fn evaluate_rule_conditions(
        &self,
        rule: &AutomationRule,
        event: &DiscountEvent,
    ) -> Result<bool, DiscountError> {
        for condition in rule.conditions.iter() {
            let met = match condition {
                RuleCondition::BeltRank(rank) => match event.student_id {
                    Some(student_id) => {
                        self.facts.latest_belt_rank(student_id).await?.as_deref() == Some(rank.as_str())
                    }
                    None => false,
                },
                RuleCondition::MinFamilySize(min) => match event.family_id {
                    Some(family_id) => self.facts.active_family_size(family_id).await? >= *min,
                    None => false,
                },
                RuleCondition::AttendanceCount(min) => match event.student_id {
                    Some(student_id) => self.facts.attendance_count(student_id).await? >= *min,
                    None => false,
                },
            };
            if !met {
                debug!(rule_id = %rule.id, condition = condition.key(), "Condition not met");
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn prepare_codes(
        &self,
        rule: &AutomationRule,
        event: &DiscountEvent,
        now: DateTime<Utc>,
    ) -> Result<Vec<MintedCode>, DiscountError> {
        let validity = rule.code_validity(now)?;
        let mut minted = Vec::with_capacity(rule.templates.len());

        for (position, template_id) in rule.templates.iter().enumerate() {
            let template = self
                .store
                .get_template(*template_id)
                .await?
                .ok_or_else(|| DiscountError::TemplateNotFound(template_id.to_string()))?;
            if !template.is_active {
                return Err(DiscountError::validation(format!(
                    "Discount template {} is inactive",
                    template.id
                )));
            }

            let owner = owner_for_event(&template, event)?;
            let text = self.codes.generate(self.store.as_ref()).await?;
            let code = DiscountCode::from_template(&template, text, owner, validity);
            let sequence_order = i32::try_from(position)
                .map_err(|_| DiscountError::validation("Too many templates on one rule"))?;
            let assignment = DiscountAssignment::new(rule.id, event, code.id, sequence_order);
            minted.push(MintedCode { code, assignment });
        }
        Ok(minted)
    }
}

/// Picks the code owner from the template scope
fn owner_for_event(template: &DiscountTemplate, event: &DiscountEvent) -> Result<CodeOwner, DiscountError> {
    match template.scope {
        DiscountScope::PerStudent => event.student_id.map(CodeOwner::Student).ok_or_else(|| {
            DiscountError::invalid_scope(format!(
                "Template {} is per student but the event has no student",
                template.id
            ))
        }),
        DiscountScope::PerFamily => event.family_id.map(CodeOwner::Family).ok_or_else(|| {
            DiscountError::invalid_scope(format!(
                "Template {} is per family but the event has no family",
                template.id
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DiscountEventType, NewDiscountEvent};
    use crate::rule::NewAutomationRule;
    use crate::testing::Harness;
    use core_kernel::{DiscountTemplateId, FamilyId, PaymentId, ProgramId, StudentId};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_recording_twice_assigns_once() {
        let h = Harness::new();
        let template = h.template("Welcome", DiscountScope::PerStudent).await;
        let rule = h
            .rule(DiscountEventType::StudentEnrollment, vec![template.id], Value::Null, vec![])
            .await;
        let student = StudentId::new();
        let family = FamilyId::new();
        let program = ProgramId::new();

        let first = h
            .recorder
            .record_event(NewDiscountEvent::student_enrollment(student, Some(family), program))
            .await
            .unwrap();
        let second = h
            .recorder
            .record_event(NewDiscountEvent::student_enrollment(student, Some(family), program))
            .await
            .unwrap();

        assert!(matches!(first.report.outcome_for(rule.id), Some(RuleOutcome::Assigned { .. })));
        assert_eq!(second.report.outcome_for(rule.id), Some(&RuleOutcome::AlreadyAssigned));
        assert_eq!(h.store.assignments().await.len(), 1);
        assert_eq!(h.store.events().await.len(), 2);
    }

    #[tokio::test]
    async fn test_min_family_size_threshold() {
        let h = Harness::new();
        let template = h.template("Family", DiscountScope::PerFamily).await;
        let rule = h
            .rule(
                DiscountEventType::StudentEnrollment,
                vec![template.id],
                json!({ "min_family_size": 3 }),
                vec![],
            )
            .await;
        let family = FamilyId::new();
        let event = DiscountEvent::create(NewDiscountEvent::student_enrollment(
            StudentId::new(),
            Some(family),
            ProgramId::new(),
        ))
        .unwrap();

        h.facts.set_family_size(family, 2).await;
        assert!(!h.engine.evaluate_rule_conditions(&rule, &event).await.unwrap());

        h.facts.set_family_size(family, 3).await;
        assert!(h.engine.evaluate_rule_conditions(&rule, &event).await.unwrap());
    }

    #[tokio::test]
    async fn test_family_condition_without_family_fails() {
        let h = Harness::new();
        let template = h.template("Family", DiscountScope::PerFamily).await;
        let rule = h
            .rule(
                DiscountEventType::BeltPromotion,
                vec![template.id],
                json!({ "min_family_size": 1 }),
                vec![],
            )
            .await;
        let event = DiscountEvent::create(NewDiscountEvent::belt_promotion(StudentId::new(), None, "yellow")).unwrap();

        assert!(!h.engine.evaluate_rule_conditions(&rule, &event).await.unwrap());
    }

    #[tokio::test]
    async fn test_belt_and_attendance_conditions() {
        let h = Harness::new();
        let template = h.template("Belt", DiscountScope::PerStudent).await;
        let rule = h
            .rule(
                DiscountEventType::BeltPromotion,
                vec![template.id],
                json!({ "belt_rank": "green", "attendance_count": 50 }),
                vec![],
            )
            .await;
        let student = StudentId::new();
        let event = DiscountEvent::create(NewDiscountEvent::belt_promotion(student, None, "green")).unwrap();

        h.facts.set_belt_rank(student, "green").await;
        h.facts.set_attendance(student, 49).await;
        assert!(!h.engine.evaluate_rule_conditions(&rule, &event).await.unwrap());

        h.facts.set_attendance(student, 50).await;
        assert!(h.engine.evaluate_rule_conditions(&rule, &event).await.unwrap());

        h.facts.set_belt_rank(student, "blue").await;
        assert!(!h.engine.evaluate_rule_conditions(&rule, &event).await.unwrap());
    }

    #[tokio::test]
    async fn test_program_filter_runs_before_conditions() {
        let h = Harness::new();
        let template = h.template("Kids", DiscountScope::PerStudent).await;
        let kids = ProgramId::new();
        let adults = ProgramId::new();
        let rule = h
            .rule(DiscountEventType::StudentEnrollment, vec![template.id], Value::Null, vec![kids])
            .await;
        let student = StudentId::new();
        h.facts.set_programs(student, vec![adults]).await;

        let recorded = h
            .recorder
            .record_event(NewDiscountEvent::student_enrollment(student, None, adults))
            .await
            .unwrap();
        assert_eq!(recorded.report.outcome_for(rule.id), Some(&RuleOutcome::ProgramMismatch));

        h.facts.set_programs(student, vec![adults, kids]).await;
        let recorded = h
            .recorder
            .record_event(NewDiscountEvent::student_enrollment(student, None, kids))
            .await
            .unwrap();
        assert!(matches!(recorded.report.outcome_for(rule.id), Some(RuleOutcome::Assigned { .. })));
    }

    #[tokio::test]
    async fn test_multi_template_rule_mints_in_order() {
        let h = Harness::new();
        let first = h.fixed_template("Month one", 1000, DiscountScope::PerFamily).await;
        let second = h.fixed_template("Month two", 2000, DiscountScope::PerFamily).await;
        let rule = h
            .rule(DiscountEventType::FirstPayment, vec![first.id, second.id], Value::Null, vec![])
            .await;
        let family = FamilyId::new();

        let recorded = h
            .recorder
            .record_event(NewDiscountEvent::first_payment(family, None, PaymentId::new()))
            .await
            .unwrap();

        let codes = match recorded.report.outcome_for(rule.id) {
            Some(RuleOutcome::Assigned { codes }) => codes.clone(),
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(codes.len(), 2);
        assert!(codes.iter().all(|c| c.starts_with("AUTO")));

        let mut assignments = h.store.list_assignments_for_rule(rule.id).await.unwrap();
        assignments.sort_by_key(|a| a.sequence_order);
        let first_code = h.store.get_code(assignments[0].discount_code_id).await.unwrap().unwrap();
        let second_code = h.store.get_code(assignments[1].discount_code_id).await.unwrap().unwrap();
        assert_eq!(first_code.template_id, Some(first.id));
        assert_eq!(second_code.template_id, Some(second.id));
        assert_eq!(first_code.owner, CodeOwner::Family(family));
        assert!(first_code.created_automatically);
        assert_eq!(first_code.validity.until, None);
    }

    #[tokio::test]
    async fn test_failing_rule_does_not_block_siblings() {
        let h = Harness::new();
        let template = h.template("Good", DiscountScope::PerStudent).await;
        let good = h
            .rule(DiscountEventType::AttendanceMilestone, vec![template.id], Value::Null, vec![])
            .await;

        let broken = AutomationRule::create(NewAutomationRule {
            name: "Dangling template".to_string(),
            description: None,
            event_type: DiscountEventType::AttendanceMilestone,
            template_ids: vec![DiscountTemplateId::new()],
            conditions: Value::Null,
            applicable_programs: vec![],
            valid_from: None,
            valid_until: None,
            code_valid_days: None,
            is_active: true,
        })
        .unwrap();
        h.store.create_rule(&broken).await.unwrap();

        let recorded = h
            .recorder
            .record_event(NewDiscountEvent::attendance_milestone(StudentId::new(), None, 25))
            .await
            .unwrap();

        assert!(matches!(recorded.report.outcome_for(broken.id), Some(RuleOutcome::Failed { .. })));
        assert!(matches!(recorded.report.outcome_for(good.id), Some(RuleOutcome::Assigned { .. })));
        assert_eq!(recorded.report.failures().count(), 1);
    }

    #[tokio::test]
    async fn test_stored_out_of_range_validity_fails_only_its_rule() {
        let h = Harness::new();
        let template = h.template("Good", DiscountScope::PerStudent).await;
        let good = h
            .rule(DiscountEventType::StudentEnrollment, vec![template.id], Value::Null, vec![])
            .await;

        let mut endless = h
            .rule(DiscountEventType::StudentEnrollment, vec![template.id], Value::Null, vec![])
            .await;
        endless.code_valid_days = Some(u32::MAX);
        h.store.update_rule(&endless).await.unwrap();

        let recorded = h
            .recorder
            .record_event(NewDiscountEvent::student_enrollment(StudentId::new(), None, ProgramId::new()))
            .await
            .unwrap();

        assert!(matches!(recorded.report.outcome_for(endless.id), Some(RuleOutcome::Failed { .. })));
        assert!(matches!(recorded.report.outcome_for(good.id), Some(RuleOutcome::Assigned { .. })));
        assert_eq!(h.store.codes().await.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_isolated_per_rule() {
        let h = Harness::new();
        let template = h.template("Belt", DiscountScope::PerStudent).await;
        let conditional = h
            .rule(
                DiscountEventType::BeltPromotion,
                vec![template.id],
                json!({ "belt_rank": "yellow" }),
                vec![],
            )
            .await;
        let other = h.template("Any", DiscountScope::PerStudent).await;
        let unconditional = h
            .rule(DiscountEventType::BeltPromotion, vec![other.id], Value::Null, vec![])
            .await;
        let student = StudentId::new();
        h.facts.fail_for(student).await;

        let recorded = h
            .recorder
            .record_event(NewDiscountEvent::belt_promotion(student, None, "yellow"))
            .await
            .unwrap();

        assert!(matches!(recorded.report.outcome_for(conditional.id), Some(RuleOutcome::Failed { .. })));
        assert!(matches!(recorded.report.outcome_for(unconditional.id), Some(RuleOutcome::Assigned { .. })));
    }

    #[tokio::test]
    async fn test_scope_without_subject_fails_rule() {
        let h = Harness::new();
        let template = h.template("Family only", DiscountScope::PerFamily).await;
        let rule = h
            .rule(DiscountEventType::BeltPromotion, vec![template.id], Value::Null, vec![])
            .await;

        let recorded = h
            .recorder
            .record_event(NewDiscountEvent::belt_promotion(StudentId::new(), None, "orange"))
            .await
            .unwrap();

        assert!(matches!(recorded.report.outcome_for(rule.id), Some(RuleOutcome::Failed { .. })));
        assert!(h.store.codes().await.is_empty());
    }

    #[tokio::test]
    async fn test_other_event_types_ignored() {
        let h = Harness::new();
        let template = h.template("Welcome", DiscountScope::PerStudent).await;
        h.rule(DiscountEventType::StudentEnrollment, vec![template.id], Value::Null, vec![])
            .await;

        let recorded = h
            .recorder
            .record_event(NewDiscountEvent::belt_promotion(StudentId::new(), None, "yellow"))
            .await
            .unwrap();

        assert!(recorded.report.rules.is_empty());
    }

    #[tokio::test]
    async fn test_code_valid_days_bounds_code() {
        let h = Harness::new();
        let template = h.template("Limited", DiscountScope::PerStudent).await;
        let rule = AutomationRule::create(NewAutomationRule {
            name: "Thirty days".to_string(),
            description: None,
            event_type: DiscountEventType::StudentEnrollment,
            template_ids: vec![template.id],
            conditions: Value::Null,
            applicable_programs: vec![],
            valid_from: None,
            valid_until: None,
            code_valid_days: Some(30),
            is_active: true,
        })
        .unwrap();
        h.store.create_rule(&rule).await.unwrap();

        h.recorder
            .record_event(NewDiscountEvent::student_enrollment(StudentId::new(), None, ProgramId::new()))
            .await
            .unwrap();

        let codes = h.store.codes().await;
        assert_eq!(codes.len(), 1);
        let window = codes[0].validity;
        let from = window.from.unwrap();
        assert_eq!(window.until, Some(from + chrono::Duration::days(30)));
    }

    #[tokio::test]
    async fn test_conflict_on_mint_reported_as_already_assigned() {
        let h = Harness::new();
        let template = h.template("Race", DiscountScope::PerStudent).await;
        let rule = h
            .rule(DiscountEventType::StudentEnrollment, vec![template.id], Value::Null, vec![])
            .await;
        let student = StudentId::new();
        let event = DiscountEvent::create(NewDiscountEvent::student_enrollment(student, None, ProgramId::new())).unwrap();

        // Another request mints between the duplicate check and the write
        let code = DiscountCode::from_template(
            &template,
            "AUTORACE0001".to_string(),
            CodeOwner::Student(student),
            rule.code_validity(Utc::now()).unwrap(),
        );
        let assignment = DiscountAssignment::new(rule.id, &event, code.id, 0);
        let winner = MintedCode { code, assignment };
        h.store.mint_assigned_codes(std::slice::from_ref(&winner)).await.unwrap();

        let loser = h.engine.prepare_codes(&rule, &event, Utc::now()).await.unwrap();
        let err = h.store.mint_assigned_codes(&loser).await.unwrap_err();
        assert!(err.is_conflict());

        let report = h.engine.process_event(&event).await.unwrap();
        assert_eq!(report.outcome_for(rule.id), Some(&RuleOutcome::AlreadyAssigned));
        assert_eq!(h.store.assignments().await.len(), 1);
    }
}
