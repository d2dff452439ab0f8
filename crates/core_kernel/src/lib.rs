//! Core Kernel - Foundational types for the dojo administration system
//!
//! This crate provides the building blocks shared by every domain crate:
//! - Money held as integer minor units, with single-rounding rate math
//! - Validity windows, the school timezone, and age calculation
//! - Strongly-typed identifiers
//! - The port error type and marker traits for adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError, Rate, dollars_to_cents, cents_to_dollars};
pub use temporal::{ValidityWindow, Timezone, TemporalError, age_on};
pub use identifiers::{
    StudentId, FamilyId, ProgramId,
    DiscountTemplateId, DiscountCodeId, DiscountEventId, AutomationRuleId,
    DiscountAssignmentId, DiscountUsageId,
    TaxRateId, InvoiceId, LineItemId, PaymentId,
};
pub use error::CoreError;
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
