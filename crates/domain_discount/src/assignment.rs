//! Assignment records linking a rule, an event and a minted code

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    AutomationRuleId, DiscountAssignmentId, DiscountCodeId, DiscountEventId, FamilyId, StudentId,
};

use crate::code::DiscountCode;
use crate::event::DiscountEvent;

/// A code minted by a rule for an event
///
/// At most one assignment exists per rule, student and family for each
/// position in the rule's template sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountAssignment {
    pub id: DiscountAssignmentId,
    pub automation_rule_id: AutomationRuleId,
    pub discount_event_id: DiscountEventId,
    pub student_id: Option<StudentId>,
    pub family_id: Option<FamilyId>,
    pub discount_code_id: DiscountCodeId,
    /// Position of the template in the rule's sequence
    pub sequence_order: i32,
    pub assigned_at: DateTime<Utc>,
}

impl DiscountAssignment {
    pub fn new(
        rule_id: AutomationRuleId,
        event: &DiscountEvent,
        code_id: DiscountCodeId,
        sequence_order: i32,
    ) -> Self {
        Self {
            id: DiscountAssignmentId::new_v7(),
            automation_rule_id: rule_id,
            discount_event_id: event.id,
            student_id: event.student_id,
            family_id: event.family_id,
            discount_code_id: code_id,
            sequence_order,
            assigned_at: Utc::now(),
        }
    }

    pub fn key(&self) -> AssignmentKey {
        AssignmentKey {
            automation_rule_id: self.automation_rule_id,
            student_id: self.student_id,
            family_id: self.family_id,
        }
    }
}

/// The duplicate-guard key: a rule fires once per student/family pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub automation_rule_id: AutomationRuleId,
    pub student_id: Option<StudentId>,
    pub family_id: Option<FamilyId>,
}

impl AssignmentKey {
    pub fn for_event(rule_id: AutomationRuleId, event: &DiscountEvent) -> Self {
        Self {
            automation_rule_id: rule_id,
            student_id: event.student_id,
            family_id: event.family_id,
        }
    }
}

/// A code and its assignment, persisted together
#[derive(Debug, Clone, PartialEq)]
pub struct MintedCode {
    pub code: DiscountCode,
    pub assignment: DiscountAssignment,
}
