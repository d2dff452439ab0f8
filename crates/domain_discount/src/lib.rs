//! Discount Domain
//!
//! Templates, codes, automation rules and the events that drive them.
//!
//! # Flow
//!
//! ```text
//! enrollment / payment / belt / attendance
//!              │
//!              ▼
//!   DiscountEventRecorder ── append ──▶ discount_events
//!              │
//!              ▼
//!     AutomationEngine ── per rule: programs → conditions → duplicate guard
//!              │
//!              ▼
//!   discount_codes + discount_assignments (one atomic write per rule)
//! ```
//!
//! Codes are later checked and redeemed at checkout by
//! [`DiscountRedemption`].
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = Arc::new(AutomationEngine::new(store.clone(), facts, CodeGenerator::default()));
//! let recorder = DiscountEventRecorder::new(store, engine);
//!
//! let recorded = recorder
//!     .record_event(NewDiscountEvent::student_enrollment(student_id, Some(family_id), program_id))
//!     .await?;
//! for code in recorded.report.assigned_codes() {
//!     println!("minted {code}");
//! }
//! ```

pub mod template;
pub mod code;
pub mod codegen;
pub mod event;
pub mod rule;
pub mod assignment;
pub mod ports;
pub mod catalog;
pub mod engine;
pub mod recorder;
pub mod redemption;
pub mod error;

#[cfg(test)]
mod testing;

pub use template::{
    DiscountTemplate, DiscountType, DiscountValue, DiscountScope, UsageType,
    NewDiscountTemplate, TemplateUpdate,
};
pub use code::{CodeOwner, DiscountCode, NewDiscountCode, DiscountUsage};
pub use codegen::{CodeGenerator, CODE_ALPHABET, AUTO_PREFIX, random_code};
pub use event::{
    DiscountEvent, DiscountEventType, NewDiscountEvent,
    ATTENDANCE_MILESTONES, attendance_milestone_crossed,
};
pub use rule::{
    AutomationRule, NewAutomationRule, RuleUpdate,
    RuleCondition, RuleConditions, TemplateSequence,
    MAX_CODE_VALID_DAYS, clearable,
};
pub use assignment::{DiscountAssignment, AssignmentKey, MintedCode};
pub use ports::{DiscountStorePort, StudentFactsPort};
pub use catalog::DiscountCatalog;
pub use engine::{AutomationEngine, ProcessingReport, RuleProcessing, RuleOutcome};
pub use recorder::{DiscountEventRecorder, RecordedEvent};
pub use redemption::{
    DiscountRedemption, ValidateDiscountRequest, ApplyDiscountRequest,
    DiscountValidation, DiscountApplication, rejection_reason,
};
pub use error::DiscountError;

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{MockDiscountStore, MockStudentFacts};
