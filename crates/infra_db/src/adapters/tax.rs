//! PostgreSQL Tax Adapter
//!
//! Serves the tax resolver: active rates from `tax_rates` and birth dates
//! from `students`.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, PortError, Rate, StudentId, TaxRateId,
};
use domain_tax::{StudentAgePort, TaxRate, TaxRatePort};

use super::probe;
use crate::repositories::school::SchoolRepository;
use crate::repositories::tax::{TaxRateRepository, TaxRateRow};

const ADAPTER_ID: &str = "postgres-tax";

/// PostgreSQL-backed implementation of [`TaxRatePort`] and [`StudentAgePort`]
#[derive(Debug, Clone)]
pub struct PostgresTaxAdapter {
    rates: TaxRateRepository,
    school: SchoolRepository,
    pool: PgPool,
}

impl PostgresTaxAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            rates: TaxRateRepository::new(pool.clone()),
            school: SchoolRepository::new(pool.clone()),
            pool,
        }
    }

    /// Creates the rate, or replaces the stored one with the same name
    pub async fn upsert_tax_rate(&self, rate: &TaxRate) -> Result<(), PortError> {
        let now = Utc::now();
        let row = TaxRateRow {
            id: rate.id.into(),
            name: rate.name.clone(),
            rate: rate.rate.as_decimal(),
            region: rate.region.clone(),
            description: rate.description.clone(),
            is_active: rate.is_active,
            created_at: now,
            updated_at: now,
        };
        Ok(self.rates.upsert(&row).await?)
    }

    pub async fn get_tax_rate_by_name(&self, name: &str) -> Result<Option<TaxRate>, PortError> {
        Ok(self.rates.get_by_name(name).await?.map(row_to_tax_rate))
    }
}

impl DomainPort for PostgresTaxAdapter {}

#[async_trait]
impl HealthCheckable for PostgresTaxAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        probe(&self.pool, ADAPTER_ID).await
    }
}

#[async_trait]
impl TaxRatePort for PostgresTaxAdapter {
    #[instrument(skip(self))]
    async fn list_active_tax_rates(&self) -> Result<Vec<TaxRate>, PortError> {
        let rows = self.rates.list_active().await?;
        Ok(rows.into_iter().map(row_to_tax_rate).collect())
    }

    async fn get_tax_rate(&self, id: TaxRateId) -> Result<Option<TaxRate>, PortError> {
        Ok(self.rates.get_by_id(id.into()).await?.map(row_to_tax_rate))
    }
}

#[async_trait]
impl StudentAgePort for PostgresTaxAdapter {
    async fn student_birth_date(&self, student_id: StudentId) -> Result<Option<NaiveDate>, PortError> {
        Ok(self.school.student_birth_date(student_id.into()).await?)
    }
}

/// Rates are stored as fractions; the resolver skips any outside `[0, 1]`
fn row_to_tax_rate(row: TaxRateRow) -> TaxRate {
    TaxRate {
        id: TaxRateId::from(row.id),
        name: row.name,
        rate: Rate::new(row.rate),
        region: row.region,
        description: row.description,
        is_active: row.is_active,
    }
}
