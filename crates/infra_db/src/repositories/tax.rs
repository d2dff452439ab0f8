//! Tax rate repository implementation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const TAX_RATE_COLUMNS: &str = "id, name, rate, region, description, is_active, created_at, updated_at";

/// Repository for `tax_rates`
#[derive(Debug, Clone)]
pub struct TaxRateRepository {
    pool: PgPool,
}

impl TaxRateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_active(&self) -> Result<Vec<TaxRateRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, TaxRateRow>(&format!(
            "SELECT {TAX_RATE_COLUMNS} FROM tax_rates WHERE is_active ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<TaxRateRow>, DatabaseError> {
        let row = sqlx::query_as::<_, TaxRateRow>(&format!(
            "SELECT {TAX_RATE_COLUMNS} FROM tax_rates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<TaxRateRow>, DatabaseError> {
        let row = sqlx::query_as::<_, TaxRateRow>(&format!(
            "SELECT {TAX_RATE_COLUMNS} FROM tax_rates WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Inserts a rate or replaces the one with the same name
    pub async fn upsert(&self, row: &TaxRateRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO tax_rates (id, name, rate, region, description, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (name) DO UPDATE SET
                rate = EXCLUDED.rate,
                region = EXCLUDED.region,
                description = EXCLUDED.description,
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(row.rate)
        .bind(&row.region)
        .bind(&row.description)
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Row of `tax_rates`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TaxRateRow {
    pub id: Uuid,
    pub name: String,
    /// Fraction, e.g. 0.05
    pub rate: Decimal,
    pub region: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
