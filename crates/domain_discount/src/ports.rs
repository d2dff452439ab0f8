//! Discount Domain Ports
//!
//! Two ports back the discount services:
//!
//! - [`DiscountStorePort`] persists templates, codes, rules, events,
//!   assignments and usage.
//! - [`StudentFactsPort`] answers the questions rule conditions ask about
//!   students and families.
//!
//! `infra_db` implements both on PostgreSQL. The `mock` module implements
//! them in memory and mirrors the database's uniqueness guarantees so the
//! services behave the same against either.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{
    AutomationRuleId, DiscountCodeId, DiscountTemplateId, DomainPort, FamilyId, PortError, ProgramId,
    StudentId,
};

use crate::assignment::{AssignmentKey, DiscountAssignment, MintedCode};
use crate::code::{CodeOwner, DiscountCode, DiscountUsage};
use crate::event::{DiscountEvent, DiscountEventType};
use crate::rule::AutomationRule;
use crate::template::DiscountTemplate;

/// Storage for every discount entity
#[async_trait]
pub trait DiscountStorePort: DomainPort {
    // Templates

    async fn create_template(&self, template: &DiscountTemplate) -> Result<(), PortError>;

    async fn get_template(&self, id: DiscountTemplateId) -> Result<Option<DiscountTemplate>, PortError>;

    async fn list_templates(&self, active_only: bool) -> Result<Vec<DiscountTemplate>, PortError>;

    /// Fails with `NotFound` when the template does not exist
    async fn update_template(&self, template: &DiscountTemplate) -> Result<(), PortError>;

    /// Fails with `NotFound` when the template does not exist
    async fn delete_template(&self, id: DiscountTemplateId) -> Result<(), PortError>;

    // Codes

    /// Fails with `Conflict` when the code text is taken
    async fn insert_code(&self, code: &DiscountCode) -> Result<(), PortError>;

    async fn get_code(&self, id: DiscountCodeId) -> Result<Option<DiscountCode>, PortError>;

    /// Looks a code up by its text, case-insensitively
    async fn find_code_by_code(&self, code: &str) -> Result<Option<DiscountCode>, PortError>;

    async fn list_codes_for(&self, owner: CodeOwner) -> Result<Vec<DiscountCode>, PortError>;

    async fn deactivate_code(&self, id: DiscountCodeId) -> Result<(), PortError>;

    async fn code_exists(&self, code: &str) -> Result<bool, PortError>;

    // Rules

    async fn create_rule(&self, rule: &AutomationRule) -> Result<(), PortError>;

    async fn get_rule(&self, id: AutomationRuleId) -> Result<Option<AutomationRule>, PortError>;

    async fn update_rule(&self, rule: &AutomationRule) -> Result<(), PortError>;

    async fn list_rules(&self) -> Result<Vec<AutomationRule>, PortError>;

    /// Active rules for `event_type` whose validity window contains `at`
    async fn list_rules_in_effect(
        &self,
        event_type: DiscountEventType,
        at: DateTime<Utc>,
    ) -> Result<Vec<AutomationRule>, PortError>;

    // Events and assignments

    async fn insert_event(&self, event: &DiscountEvent) -> Result<(), PortError>;

    async fn find_assignment(&self, key: &AssignmentKey) -> Result<Option<DiscountAssignment>, PortError>;

    async fn list_assignments_for_rule(
        &self,
        rule_id: AutomationRuleId,
    ) -> Result<Vec<DiscountAssignment>, PortError>;

    /// Persists every code and its assignment atomically
    ///
    /// Either all rows are written or none are. A second mint for the same
    /// assignment key fails with `Conflict`.
    async fn mint_assigned_codes(&self, minted: &[MintedCode]) -> Result<(), PortError>;

    // Usage

    /// Records a redemption and increments `times_used` atomically
    ///
    /// Fails with `Conflict` when the code has no uses left.
    async fn record_code_usage(&self, usage: &DiscountUsage) -> Result<DiscountCode, PortError>;
}

/// Facts about students and families used by rule conditions
#[async_trait]
pub trait StudentFactsPort: DomainPort {
    /// Programs of the student's active enrollments
    async fn active_program_ids(&self, student_id: StudentId) -> Result<Vec<ProgramId>, PortError>;

    /// Rank of the most recent belt award
    async fn latest_belt_rank(&self, student_id: StudentId) -> Result<Option<String>, PortError>;

    /// Students in the family that are still active
    async fn active_family_size(&self, family_id: FamilyId) -> Result<i64, PortError>;

    /// Attendance records of the student, whether marked present or not
    async fn attendance_count(&self, student_id: StudentId) -> Result<i64, PortError>;
}

/// In-memory implementations of the discount ports for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    struct StoreState {
        templates: HashMap<DiscountTemplateId, DiscountTemplate>,
        codes: HashMap<DiscountCodeId, DiscountCode>,
        rules: HashMap<AutomationRuleId, AutomationRule>,
        events: Vec<DiscountEvent>,
        assignments: Vec<DiscountAssignment>,
        usages: Vec<DiscountUsage>,
    }

    /// In-memory [`DiscountStorePort`]
    #[derive(Debug, Clone, Default)]
    pub struct MockDiscountStore {
        state: Arc<RwLock<StoreState>>,
        forced_collisions: Arc<AtomicU32>,
        code_checks: Arc<AtomicU32>,
    }

    impl MockDiscountStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes the next `n` calls to `code_exists` report a collision
        pub fn force_code_collisions(&self, n: u32) {
            self.forced_collisions.store(n, Ordering::SeqCst);
        }

        /// Number of `code_exists` calls so far
        pub fn code_checks(&self) -> u32 {
            self.code_checks.load(Ordering::SeqCst)
        }

        pub async fn events(&self) -> Vec<DiscountEvent> {
            self.state.read().await.events.clone()
        }

        pub async fn assignments(&self) -> Vec<DiscountAssignment> {
            self.state.read().await.assignments.clone()
        }

        pub async fn codes(&self) -> Vec<DiscountCode> {
            self.state.read().await.codes.values().cloned().collect()
        }

        pub async fn usages(&self) -> Vec<DiscountUsage> {
            self.state.read().await.usages.clone()
        }
    }

    fn code_taken(state: &StoreState, code: &str) -> bool {
        state.codes.values().any(|c| c.code.eq_ignore_ascii_case(code))
    }

    impl DomainPort for MockDiscountStore {}

    #[async_trait]
    impl DiscountStorePort for MockDiscountStore {
        async fn create_template(&self, template: &DiscountTemplate) -> Result<(), PortError> {
            self.state.write().await.templates.insert(template.id, template.clone());
            Ok(())
        }

        async fn get_template(&self, id: DiscountTemplateId) -> Result<Option<DiscountTemplate>, PortError> {
            Ok(self.state.read().await.templates.get(&id).cloned())
        }

        async fn list_templates(&self, active_only: bool) -> Result<Vec<DiscountTemplate>, PortError> {
            let state = self.state.read().await;
            let mut templates: Vec<_> = state
                .templates
                .values()
                .filter(|t| !active_only || t.is_active)
                .cloned()
                .collect();
            templates.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(templates)
        }

        async fn update_template(&self, template: &DiscountTemplate) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            match state.templates.get_mut(&template.id) {
                Some(existing) => {
                    *existing = template.clone();
                    Ok(())
                }
                None => Err(PortError::not_found("DiscountTemplate", template.id)),
            }
        }

        async fn delete_template(&self, id: DiscountTemplateId) -> Result<(), PortError> {
            self.state
                .write()
                .await
                .templates
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("DiscountTemplate", id))
        }

        async fn insert_code(&self, code: &DiscountCode) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if code_taken(&state, &code.code) {
                return Err(PortError::conflict(format!("Discount code {} already exists", code.code)));
            }
            state.codes.insert(code.id, code.clone());
            Ok(())
        }

        async fn get_code(&self, id: DiscountCodeId) -> Result<Option<DiscountCode>, PortError> {
            Ok(self.state.read().await.codes.get(&id).cloned())
        }

        async fn find_code_by_code(&self, code: &str) -> Result<Option<DiscountCode>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .codes
                .values()
                .find(|c| c.code.eq_ignore_ascii_case(code))
                .cloned())
        }

        async fn list_codes_for(&self, owner: CodeOwner) -> Result<Vec<DiscountCode>, PortError> {
            let state = self.state.read().await;
            let mut codes: Vec<_> = state.codes.values().filter(|c| c.owner == owner).cloned().collect();
            codes.sort_by_key(|c| c.created_at);
            Ok(codes)
        }

        async fn deactivate_code(&self, id: DiscountCodeId) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            match state.codes.get_mut(&id) {
                Some(code) => {
                    code.is_active = false;
                    Ok(())
                }
                None => Err(PortError::not_found("DiscountCode", id)),
            }
        }

        async fn code_exists(&self, code: &str) -> Result<bool, PortError> {
            self.code_checks.fetch_add(1, Ordering::SeqCst);
            let forced = self
                .forced_collisions
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if forced {
                return Ok(true);
            }
            Ok(code_taken(&*self.state.read().await, code))
        }

        async fn create_rule(&self, rule: &AutomationRule) -> Result<(), PortError> {
            self.state.write().await.rules.insert(rule.id, rule.clone());
            Ok(())
        }

        async fn get_rule(&self, id: AutomationRuleId) -> Result<Option<AutomationRule>, PortError> {
            Ok(self.state.read().await.rules.get(&id).cloned())
        }

        async fn update_rule(&self, rule: &AutomationRule) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            match state.rules.get_mut(&rule.id) {
                Some(existing) => {
                    *existing = rule.clone();
                    Ok(())
                }
                None => Err(PortError::not_found("AutomationRule", rule.id)),
            }
        }

        async fn list_rules(&self) -> Result<Vec<AutomationRule>, PortError> {
            let mut rules: Vec<_> = self.state.read().await.rules.values().cloned().collect();
            rules.sort_by_key(|r| r.created_at);
            Ok(rules)
        }

        async fn list_rules_in_effect(
            &self,
            event_type: DiscountEventType,
            at: DateTime<Utc>,
        ) -> Result<Vec<AutomationRule>, PortError> {
            let mut rules: Vec<_> = self
                .state
                .read()
                .await
                .rules
                .values()
                .filter(|r| r.event_type == event_type && r.is_in_effect_at(at))
                .cloned()
                .collect();
            rules.sort_by_key(|r| (r.created_at, r.id));
            Ok(rules)
        }

        async fn insert_event(&self, event: &DiscountEvent) -> Result<(), PortError> {
            self.state.write().await.events.push(event.clone());
            Ok(())
        }

        async fn find_assignment(&self, key: &AssignmentKey) -> Result<Option<DiscountAssignment>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .assignments
                .iter()
                .find(|a| a.key() == *key)
                .cloned())
        }

        async fn list_assignments_for_rule(
            &self,
            rule_id: AutomationRuleId,
        ) -> Result<Vec<DiscountAssignment>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .assignments
                .iter()
                .filter(|a| a.automation_rule_id == rule_id)
                .cloned()
                .collect())
        }

        async fn mint_assigned_codes(&self, minted: &[MintedCode]) -> Result<(), PortError> {
            // One write lock for the whole batch keeps it all-or-nothing
            let mut state = self.state.write().await;
            for (i, m) in minted.iter().enumerate() {
                let duplicate_in_batch = minted[..i]
                    .iter()
                    .any(|other| other.code.code.eq_ignore_ascii_case(&m.code.code));
                if duplicate_in_batch || code_taken(&state, &m.code.code) {
                    return Err(PortError::conflict(format!("Discount code {} already exists", m.code.code)));
                }
                let key = m.assignment.key();
                let assigned = state
                    .assignments
                    .iter()
                    .any(|a| a.key() == key && a.sequence_order == m.assignment.sequence_order);
                if assigned {
                    return Err(PortError::conflict(format!(
                        "Rule {} already assigned",
                        key.automation_rule_id
                    )));
                }
            }
            for m in minted {
                state.codes.insert(m.code.id, m.code.clone());
                state.assignments.push(m.assignment.clone());
            }
            Ok(())
        }

        async fn record_code_usage(&self, usage: &DiscountUsage) -> Result<DiscountCode, PortError> {
            let mut state = self.state.write().await;
            let code = state
                .codes
                .get_mut(&usage.discount_code_id)
                .ok_or_else(|| PortError::not_found("DiscountCode", usage.discount_code_id))?;
            if code.is_exhausted() {
                return Err(PortError::conflict(format!("Discount code {} has no uses left", code.code)));
            }
            code.times_used += 1;
            let updated = code.clone();
            state.usages.push(usage.clone());
            Ok(updated)
        }
    }

    #[derive(Debug, Default)]
    struct FactsState {
        programs: HashMap<StudentId, Vec<ProgramId>>,
        belts: HashMap<StudentId, String>,
        family_sizes: HashMap<FamilyId, i64>,
        attendance: HashMap<StudentId, i64>,
        failing_students: Vec<StudentId>,
    }

    /// In-memory [`StudentFactsPort`]
    #[derive(Debug, Clone, Default)]
    pub struct MockStudentFacts {
        state: Arc<RwLock<FactsState>>,
    }

    impl MockStudentFacts {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn set_programs(&self, student_id: StudentId, programs: Vec<ProgramId>) {
            self.state.write().await.programs.insert(student_id, programs);
        }

        pub async fn set_belt_rank(&self, student_id: StudentId, rank: impl Into<String>) {
            self.state.write().await.belts.insert(student_id, rank.into());
        }

        pub async fn set_family_size(&self, family_id: FamilyId, size: i64) {
            self.state.write().await.family_sizes.insert(family_id, size);
        }

        pub async fn set_attendance(&self, student_id: StudentId, count: i64) {
            self.state.write().await.attendance.insert(student_id, count);
        }

        /// Makes every lookup for `student_id` fail with a connection error
        pub async fn fail_for(&self, student_id: StudentId) {
            self.state.write().await.failing_students.push(student_id);
        }

        async fn check(&self, student_id: StudentId) -> Result<(), PortError> {
            if self.state.read().await.failing_students.contains(&student_id) {
                return Err(PortError::connection(format!("lookup failed for {}", student_id)));
            }
            Ok(())
        }
    }

    impl DomainPort for MockStudentFacts {}

    #[async_trait]
    impl StudentFactsPort for MockStudentFacts {
        async fn active_program_ids(&self, student_id: StudentId) -> Result<Vec<ProgramId>, PortError> {
            self.check(student_id).await?;
            Ok(self.state.read().await.programs.get(&student_id).cloned().unwrap_or_default())
        }

        async fn latest_belt_rank(&self, student_id: StudentId) -> Result<Option<String>, PortError> {
            self.check(student_id).await?;
            Ok(self.state.read().await.belts.get(&student_id).cloned())
        }

        async fn active_family_size(&self, family_id: FamilyId) -> Result<i64, PortError> {
            Ok(self.state.read().await.family_sizes.get(&family_id).copied().unwrap_or(0))
        }

        async fn attendance_count(&self, student_id: StudentId) -> Result<i64, PortError> {
            self.check(student_id).await?;
            Ok(self.state.read().await.attendance.get(&student_id).copied().unwrap_or(0))
        }
    }
}
