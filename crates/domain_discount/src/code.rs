//! Redeemable discount codes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    DiscountCodeId, DiscountTemplateId, DiscountUsageId, FamilyId, Money, PaymentId, StudentId,
    ValidityWindow,
};
use domain_tax::PaymentType;

use crate::error::DiscountError;
use crate::template::{DiscountScope, DiscountTemplate, DiscountValue, UsageType};

/// The single family or student a code is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CodeOwner {
    Family(FamilyId),
    Student(StudentId),
}

impl CodeOwner {
    /// Resolves the owner from optional association fields for `scope`
    ///
    /// Exactly one field must be set and it must be the one `scope` names.
    pub fn for_scope(
        scope: DiscountScope,
        family_id: Option<FamilyId>,
        student_id: Option<StudentId>,
    ) -> Result<Self, DiscountError> {
        match (scope, family_id, student_id) {
            (_, Some(_), Some(_)) => Err(DiscountError::invalid_scope(
                "A discount code cannot belong to both a family and a student",
            )),
            (_, None, None) => Err(DiscountError::invalid_scope(
                "A discount code must belong to a family or a student",
            )),
            (DiscountScope::PerFamily, Some(family_id), None) => Ok(CodeOwner::Family(family_id)),
            (DiscountScope::PerStudent, None, Some(student_id)) => Ok(CodeOwner::Student(student_id)),
            (DiscountScope::PerFamily, None, Some(_)) => Err(DiscountError::invalid_scope(
                "Family-scoped discount codes require family_id",
            )),
            (DiscountScope::PerStudent, Some(_), None) => Err(DiscountError::invalid_scope(
                "Student-scoped discount codes require student_id",
            )),
        }
    }

    pub fn scope(&self) -> DiscountScope {
        match self {
            CodeOwner::Family(_) => DiscountScope::PerFamily,
            CodeOwner::Student(_) => DiscountScope::PerStudent,
        }
    }

    pub fn family_id(&self) -> Option<FamilyId> {
        match self {
            CodeOwner::Family(id) => Some(*id),
            CodeOwner::Student(_) => None,
        }
    }

    pub fn student_id(&self) -> Option<StudentId> {
        match self {
            CodeOwner::Student(id) => Some(*id),
            CodeOwner::Family(_) => None,
        }
    }
}

/// A concrete, redeemable discount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: DiscountCodeId,
    pub code: String,
    pub template_id: Option<DiscountTemplateId>,
    pub name: String,
    pub description: Option<String>,
    pub value: DiscountValue,
    pub usage_type: UsageType,
    pub applicable_to: Vec<PaymentType>,
    pub owner: CodeOwner,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub validity: ValidityWindow,
    pub is_active: bool,
    /// Minted by an automation rule rather than an administrator
    pub created_automatically: bool,
    pub created_at: DateTime<Utc>,
}

impl DiscountCode {
    /// Builds a code from a request whose owner has already been resolved
    pub fn from_request(
        request: NewDiscountCode,
        code: String,
        owner: CodeOwner,
    ) -> Result<Self, DiscountError> {
        request.value.validate()?;
        let validity = ValidityWindow::new(Some(request.valid_from.unwrap_or_else(Utc::now)), request.valid_until)?;
        Ok(Self {
            id: DiscountCodeId::new_v7(),
            code,
            template_id: request.template_id,
            name: request.name,
            description: request.description,
            value: request.value,
            usage_type: request.usage_type,
            applicable_to: request.applicable_to,
            owner,
            max_uses: request.max_uses,
            times_used: 0,
            validity,
            is_active: true,
            created_automatically: request.created_automatically,
            created_at: Utc::now(),
        })
    }

    /// Instantiates `template` for `owner`
    pub fn from_template(
        template: &DiscountTemplate,
        code: String,
        owner: CodeOwner,
        validity: ValidityWindow,
    ) -> Self {
        Self {
            id: DiscountCodeId::new_v7(),
            code,
            template_id: Some(template.id),
            name: template.name.clone(),
            description: template.description.clone(),
            value: template.value,
            usage_type: template.usage_type,
            applicable_to: template.applicable_to.clone(),
            owner,
            max_uses: template.max_uses,
            times_used: 0,
            validity,
            is_active: true,
            created_automatically: true,
            created_at: Utc::now(),
        }
    }

    pub fn scope(&self) -> DiscountScope {
        self.owner.scope()
    }

    /// Uses left before `max_uses`; `None` means unlimited
    pub fn remaining_uses(&self) -> Option<i32> {
        self.max_uses.map(|max| (max - self.times_used).max(0))
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_uses() == Some(0)
    }

    pub fn applies_to(&self, category: PaymentType) -> bool {
        self.applicable_to.is_empty() || self.applicable_to.contains(&category)
    }
}

/// Request for creating a discount code directly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDiscountCode {
    /// Explicit code text; generated when absent
    pub code: Option<String>,
    pub template_id: Option<DiscountTemplateId>,
    pub name: String,
    pub description: Option<String>,
    pub value: DiscountValue,
    #[serde(default)]
    pub usage_type: UsageType,
    #[serde(default)]
    pub applicable_to: Vec<PaymentType>,
    pub scope: DiscountScope,
    pub family_id: Option<FamilyId>,
    pub student_id: Option<StudentId>,
    pub max_uses: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_automatically: bool,
}

impl NewDiscountCode {
    /// Checks the scope/association invariant and returns the owner
    pub fn resolve_owner(&self) -> Result<CodeOwner, DiscountError> {
        CodeOwner::for_scope(self.scope, self.family_id, self.student_id)
    }
}

/// One redemption of a code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountUsage {
    pub id: DiscountUsageId,
    pub discount_code_id: DiscountCodeId,
    pub family_id: Option<FamilyId>,
    pub student_id: Option<StudentId>,
    pub payment_id: Option<PaymentId>,
    pub amount_discounted: Money,
    pub used_at: DateTime<Utc>,
}
