//! Tax Domain - Applicable Rate Resolution
//!
//! Decides which configured tax rates apply to a sale and computes the
//! amounts.
//!
//! # Exemption rules
//!
//! - Memberships (`class_enrollment`) and private sessions or event
//!   registrations (`individual_session`) never carry the `PST_BC` rate.
//! - Store purchases for a student younger than 15 are PST exempt. A
//!   student without a birth date on file is charged PST.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_tax::{TaxResolver, PaymentTaxRequest, PaymentType};
//!
//! let resolver = TaxResolver::new(rates_port, students_port, Timezone::default());
//! let breakdown = resolver.calculate_taxes_for_payment(&PaymentTaxRequest {
//!     subtotal: Money::from_cents(10000, Currency::CAD),
//!     payment_type: PaymentType::StorePurchase,
//!     student_ids: vec![student_id],
//! }).await?;
//! ```

pub mod rate;
pub mod ports;
pub mod resolver;
pub mod error;

pub use rate::{TaxRate, ItemType, PaymentType, PST_BC, PST_EXEMPT_BELOW_AGE};
pub use ports::{TaxRatePort, StudentAgePort};
pub use resolver::{
    TaxResolver, PaymentTaxRequest, PaymentTax, PaymentTaxBreakdown,
    filter_applicable, is_pst_exempt_on,
};
pub use error::TaxError;

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockTaxPort;
