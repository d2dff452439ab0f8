//! Repository implementations
//!
//! Repositories own the SQL. Each one works in row types that mirror its
//! tables; the adapters in [`crate::adapters`] map rows to domain types.
//! Queries are checked at runtime (`query_as::<_, Row>`) so the workspace
//! builds without a live database.

pub mod discount;
pub mod tax;
pub mod school;
pub mod invoice;

pub use discount::DiscountRepository;
pub use tax::TaxRateRepository;
pub use school::SchoolRepository;
pub use invoice::InvoiceRepository;
