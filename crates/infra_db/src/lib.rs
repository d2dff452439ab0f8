//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the dojo administration system using SQLx.
//!
//! # Architecture
//!
//! Repositories own the SQL and work in row types. Adapters wrap them and
//! implement the domain ports, translating rows to domain types and
//! [`DatabaseError`] to [`core_kernel::PortError`].
//!
//! The schema lives in `migrations/` at the workspace root and is applied
//! with [`run_migrations`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool_from_url, run_migrations};
//! use infra_db::adapters::PostgresDiscountStore;
//!
//! let pool = create_pool_from_url("postgres://localhost/dojo").await?;
//! run_migrations(&pool).await?;
//! let store = PostgresDiscountStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, DatabaseConfig, create_pool, create_pool_from_url, run_migrations};
pub use error::DatabaseError;
