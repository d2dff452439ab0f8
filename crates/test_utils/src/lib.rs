//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! Dojo Core test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built money, dates, tax rates and identifiers
//! - `builders`: Builders for discount requests and invoice line items
//! - `database`: PostgreSQL testcontainer and school directory seeding
//! - `assertions`: Assertion helpers for money, redemption checks and totals
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
