//! Discount events
//!
//! Events are immutable facts about a student or family. They are only
//! ever appended; the automation engine reacts to each one once, when it
//! is recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use core_kernel::{DiscountEventId, FamilyId, PaymentId, ProgramId, StudentId};

use crate::error::DiscountError;

/// Attendance counts that trigger an `attendance_milestone` event
pub const ATTENDANCE_MILESTONES: [i64; 5] = [10, 25, 50, 100, 200];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountEventType {
    StudentEnrollment,
    FirstPayment,
    BeltPromotion,
    AttendanceMilestone,
    FamilyReferral,
}

impl DiscountEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountEventType::StudentEnrollment => "student_enrollment",
            DiscountEventType::FirstPayment => "first_payment",
            DiscountEventType::BeltPromotion => "belt_promotion",
            DiscountEventType::AttendanceMilestone => "attendance_milestone",
            DiscountEventType::FamilyReferral => "family_referral",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student_enrollment" => Some(DiscountEventType::StudentEnrollment),
            "first_payment" => Some(DiscountEventType::FirstPayment),
            "belt_promotion" => Some(DiscountEventType::BeltPromotion),
            "attendance_milestone" => Some(DiscountEventType::AttendanceMilestone),
            "family_referral" => Some(DiscountEventType::FamilyReferral),
            _ => None,
        }
    }
}

/// A recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountEvent {
    pub id: DiscountEventId,
    pub event_type: DiscountEventType,
    pub student_id: Option<StudentId>,
    pub family_id: Option<FamilyId>,
    /// Free-form details, kept for audit
    pub event_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl DiscountEvent {
    pub fn create(request: NewDiscountEvent) -> Result<Self, DiscountError> {
        request.validate()?;
        Ok(Self {
            id: DiscountEventId::new_v7(),
            event_type: request.event_type,
            student_id: request.student_id,
            family_id: request.family_id,
            event_data: request.event_data,
            created_at: Utc::now(),
        })
    }
}

/// An event about to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDiscountEvent {
    pub event_type: DiscountEventType,
    pub student_id: Option<StudentId>,
    pub family_id: Option<FamilyId>,
    #[serde(default)]
    pub event_data: serde_json::Value,
}

impl NewDiscountEvent {
    /// A student finished enrolling in a program
    pub fn student_enrollment(
        student_id: StudentId,
        family_id: Option<FamilyId>,
        program_id: ProgramId,
    ) -> Self {
        Self {
            event_type: DiscountEventType::StudentEnrollment,
            student_id: Some(student_id),
            family_id,
            event_data: json!({ "program_id": program_id }),
        }
    }

    /// A family's first successful payment
    pub fn first_payment(family_id: FamilyId, student_id: Option<StudentId>, payment_id: PaymentId) -> Self {
        Self {
            event_type: DiscountEventType::FirstPayment,
            student_id,
            family_id: Some(family_id),
            event_data: json!({ "payment_id": payment_id }),
        }
    }

    /// A student was awarded a new belt
    pub fn belt_promotion(student_id: StudentId, family_id: Option<FamilyId>, belt_rank: &str) -> Self {
        Self {
            event_type: DiscountEventType::BeltPromotion,
            student_id: Some(student_id),
            family_id,
            event_data: json!({ "belt_rank": belt_rank }),
        }
    }

    /// A student reached one of [`ATTENDANCE_MILESTONES`]
    pub fn attendance_milestone(student_id: StudentId, family_id: Option<FamilyId>, milestone: i64) -> Self {
        Self {
            event_type: DiscountEventType::AttendanceMilestone,
            student_id: Some(student_id),
            family_id,
            event_data: json!({ "milestone": milestone }),
        }
    }

    pub fn with_data(mut self, event_data: serde_json::Value) -> Self {
        self.event_data = event_data;
        self
    }

    /// An event must name the student or family it is about
    pub fn validate(&self) -> Result<(), DiscountError> {
        if self.student_id.is_none() && self.family_id.is_none() {
            return Err(DiscountError::validation(
                "A discount event needs a student_id or a family_id",
            ));
        }
        Ok(())
    }
}

/// The highest milestone reached when attendance moves from `previous` to
/// `current`, if any was crossed
pub fn attendance_milestone_crossed(previous: i64, current: i64) -> Option<i64> {
    ATTENDANCE_MILESTONES
        .iter()
        .rev()
        .copied()
        .find(|&m| previous < m && current >= m)
}
