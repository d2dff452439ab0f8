//! Request and response bodies
//!
//! Amounts cross the API as integer cents in the configured currency.
//! Discount values are posted the way they are stored: a percentage, or a
//! fixed amount in dollars.

pub mod discount;
pub mod tax;
pub mod invoice;

pub(crate) fn default_true() -> bool {
    true
}
