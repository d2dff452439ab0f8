//! Domain Adapters
//!
//! PostgreSQL implementations of the domain ports. Each adapter wraps a
//! repository, maps rows to domain types, and turns
//! [`DatabaseError`](crate::DatabaseError) into [`PortError`]. Stored
//! values that no longer parse, such as an unknown enum string or a
//! malformed conditions object, surface as `PortError::Transformation`.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use infra_db::adapters::{PostgresDiscountStore, PostgresStudentFacts};
//!
//! let store: Arc<dyn DiscountStorePort> = Arc::new(PostgresDiscountStore::new(pool.clone()));
//! let facts: Arc<dyn StudentFactsPort> = Arc::new(PostgresStudentFacts::new(pool));
//! ```

pub mod discount;
pub mod tax;
pub mod school;
pub mod invoice;

pub use discount::PostgresDiscountStore;
pub use tax::PostgresTaxAdapter;
pub use school::PostgresStudentFacts;
pub use invoice::PostgresInvoiceStore;

use std::fmt;
use std::time::Instant;

use chrono::Utc;
use sqlx::PgPool;

use core_kernel::{AdapterHealth, Currency, HealthCheckResult, PortError};

/// Parses a TEXT enum column with the domain type's `parse`
pub(crate) fn parse_column<T>(
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
    column: &str,
) -> Result<T, PortError> {
    parse(value).ok_or_else(|| {
        PortError::transformation(format!("unknown {} value '{}'", column, value))
    })
}

pub(crate) fn parse_currency(value: &str) -> Result<Currency, PortError> {
    value.parse().map_err(transformation)
}

pub(crate) fn transformation(error: impl fmt::Display) -> PortError {
    PortError::transformation(error.to_string())
}

/// Runs `SELECT 1` and reports the latency
pub(crate) async fn probe(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let (status, message) = match result {
        Ok(_) => (AdapterHealth::Healthy, None),
        Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
    };

    HealthCheckResult {
        adapter_id: adapter_id.to_string(),
        status,
        latency_ms,
        message,
        checked_at: Utc::now(),
    }
}
