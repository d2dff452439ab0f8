//! Invoice repository implementation
//!
//! An invoice is written with its line items and their tax snapshots in one
//! transaction. Snapshot rows are never updated afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for `invoices`, `invoice_line_items` and `invoice_line_item_taxes`
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, invoice, items), fields(invoice_number = %invoice.invoice_number))]
    pub async fn insert_invoice(
        &self,
        invoice: &InvoiceRow,
        items: &[StoredLineItem],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, family_id, student_id, invoice_date, due_date, currency,
                status, subtotal_cents, discount_amount_cents, tax_amount_cents,
                total_amount_cents, amount_paid_cents, notes, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(invoice.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.family_id)
        .bind(invoice.student_id)
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(&invoice.currency)
        .bind(&invoice.status)
        .bind(invoice.subtotal_cents)
        .bind(invoice.discount_amount_cents)
        .bind(invoice.tax_amount_cents)
        .bind(invoice.total_amount_cents)
        .bind(invoice.amount_paid_cents)
        .bind(&invoice.notes)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await?;

        for stored in items {
            let item = &stored.item;
            sqlx::query(
                r#"
                INSERT INTO invoice_line_items (
                    id, invoice_id, position, description, item_type, quantity,
                    unit_price_cents, discount_rate
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(invoice.id)
            .bind(item.position)
            .bind(&item.description)
            .bind(&item.item_type)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.discount_rate)
            .execute(&mut *tx)
            .await?;

            for tax in &stored.taxes {
                sqlx::query(
                    r#"
                    INSERT INTO invoice_line_item_taxes (
                        line_item_id, position, tax_rate_id, tax_amount_cents,
                        tax_rate_snapshot, tax_name_snapshot
                    ) VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(item.id)
                .bind(tax.position)
                .bind(tax.tax_rate_id)
                .bind(tax.tax_amount_cents)
                .bind(tax.tax_rate_snapshot)
                .bind(&tax.tax_name_snapshot)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Loads an invoice with its items and snapshots in stored order
    pub async fn get_invoice(
        &self,
        id: Uuid,
    ) -> Result<Option<(InvoiceRow, Vec<StoredLineItem>)>, DatabaseError> {
        let invoice = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, invoice_number, family_id, student_id, invoice_date, due_date, currency,
                   status, subtotal_cents, discount_amount_cents, tax_amount_cents,
                   total_amount_cents, amount_paid_cents, notes, created_at, updated_at
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(invoice) = invoice else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, LineItemRow>(
            r#"
            SELECT id, position, description, item_type, quantity, unit_price_cents, discount_rate
            FROM invoice_line_items
            WHERE invoice_id = $1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let taxes = sqlx::query_as::<_, LineItemTaxRow>(
            r#"
            SELECT t.line_item_id, t.position, t.tax_rate_id, t.tax_amount_cents,
                   t.tax_rate_snapshot, t.tax_name_snapshot
            FROM invoice_line_item_taxes t
            JOIN invoice_line_items li ON li.id = t.line_item_id
            WHERE li.invoice_id = $1
            ORDER BY t.line_item_id, t.position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let stored = items
            .into_iter()
            .map(|item| {
                let item_taxes = taxes
                    .iter()
                    .filter(|t| t.line_item_id == item.id)
                    .cloned()
                    .collect();
                StoredLineItem {
                    item,
                    taxes: item_taxes,
                }
            })
            .collect();

        Ok(Some((invoice, stored)))
    }

    /// Persists status and payment progress
    pub async fn update_status(
        &self,
        id: Uuid,
        status: &str,
        amount_paid_cents: i64,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = $2, amount_paid_cents = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(amount_paid_cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Invoice", id));
        }
        Ok(())
    }
}

/// Row of `invoices`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub invoice_number: String,
    pub family_id: Uuid,
    pub student_id: Option<Uuid>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub status: String,
    pub subtotal_cents: i64,
    pub discount_amount_cents: i64,
    pub tax_amount_cents: i64,
    pub total_amount_cents: i64,
    pub amount_paid_cents: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of `invoice_line_items`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LineItemRow {
    pub id: Uuid,
    pub position: i32,
    pub description: String,
    pub item_type: String,
    pub quantity: Decimal,
    pub unit_price_cents: i64,
    pub discount_rate: Decimal,
}

/// Row of `invoice_line_item_taxes`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LineItemTaxRow {
    pub line_item_id: Uuid,
    pub position: i32,
    pub tax_rate_id: Uuid,
    pub tax_amount_cents: i64,
    pub tax_rate_snapshot: Decimal,
    pub tax_name_snapshot: String,
}

/// A line item with its tax snapshot rows
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLineItem {
    pub item: LineItemRow,
    pub taxes: Vec<LineItemTaxRow>,
}
