//! PostgreSQL Invoice Store
//!
//! Saves invoices with their tax snapshots and loads them back through
//! [`Invoice::restore`], so stored totals are always recomputed from the
//! snapshots rather than from current tax rates.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{
    Currency, DomainPort, FamilyId, HealthCheckResult, HealthCheckable, InvoiceId, LineItemId,
    Money, PortError, Rate, StudentId, TaxRateId,
};
use domain_billing::{Invoice, InvoiceLineItem, InvoiceRecord, InvoiceStatus, LineItemTax};
use domain_tax::ItemType;

use super::{parse_column, parse_currency, probe, transformation};
use crate::repositories::invoice::{
    InvoiceRepository, InvoiceRow, LineItemRow, LineItemTaxRow, StoredLineItem,
};

const ADAPTER_ID: &str = "postgres-invoice-store";

/// PostgreSQL-backed invoice persistence
#[derive(Debug, Clone)]
pub struct PostgresInvoiceStore {
    repository: InvoiceRepository,
    pool: PgPool,
}

impl PostgresInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: InvoiceRepository::new(pool.clone()),
            pool,
        }
    }

    /// Writes a new invoice with its line items and tax snapshots
    #[instrument(skip(self, invoice), fields(invoice_number = %invoice.invoice_number))]
    pub async fn save(&self, invoice: &Invoice) -> Result<(), PortError> {
        let (row, items) = invoice_to_rows(invoice)?;
        Ok(self.repository.insert_invoice(&row, &items).await?)
    }

    pub async fn load(&self, id: InvoiceId) -> Result<Option<Invoice>, PortError> {
        match self.repository.get_invoice(id.into()).await? {
            Some((row, items)) => rows_to_invoice(row, items).map(Some),
            None => Ok(None),
        }
    }

    /// Persists the status and amount paid after a lifecycle change
    pub async fn update_status(&self, invoice: &Invoice) -> Result<(), PortError> {
        self.repository
            .update_status(
                invoice.id.into(),
                invoice.status.as_str(),
                invoice.amount_paid.to_cents(),
            )
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    PortError::not_found("Invoice", invoice.id)
                } else {
                    PortError::from(e)
                }
            })
    }
}

impl DomainPort for PostgresInvoiceStore {}

#[async_trait]
impl HealthCheckable for PostgresInvoiceStore {
    async fn health_check(&self) -> HealthCheckResult {
        probe(&self.pool, ADAPTER_ID).await
    }
}

fn position(index: usize) -> Result<i32, PortError> {
    i32::try_from(index).map_err(transformation)
}

fn invoice_to_rows(invoice: &Invoice) -> Result<(InvoiceRow, Vec<StoredLineItem>), PortError> {
    let totals = invoice.totals();
    let row = InvoiceRow {
        id: invoice.id.into(),
        invoice_number: invoice.invoice_number.clone(),
        family_id: invoice.family_id.into(),
        student_id: invoice.student_id.map(Into::into),
        invoice_date: invoice.invoice_date,
        due_date: invoice.due_date,
        currency: invoice.currency.code().to_string(),
        status: invoice.status.as_str().to_string(),
        subtotal_cents: totals.subtotal.to_cents(),
        discount_amount_cents: totals.discount_amount.to_cents(),
        tax_amount_cents: totals.tax_amount.to_cents(),
        total_amount_cents: totals.total_amount.to_cents(),
        amount_paid_cents: invoice.amount_paid.to_cents(),
        notes: invoice.notes.clone(),
        created_at: invoice.created_at,
        updated_at: invoice.updated_at,
    };

    let mut items = Vec::with_capacity(invoice.line_items.len());
    for (index, item) in invoice.line_items.iter().enumerate() {
        let mut taxes = Vec::with_capacity(item.taxes.len());
        for (tax_index, tax) in item.taxes.iter().enumerate() {
            taxes.push(LineItemTaxRow {
                line_item_id: item.id.into(),
                position: position(tax_index)?,
                tax_rate_id: tax.tax_rate_id.into(),
                tax_amount_cents: tax.tax_amount.to_cents(),
                tax_rate_snapshot: tax.tax_rate_snapshot.as_decimal(),
                tax_name_snapshot: tax.tax_name_snapshot.clone(),
            });
        }
        items.push(StoredLineItem {
            item: LineItemRow {
                id: item.id.into(),
                position: position(index)?,
                description: item.description.clone(),
                item_type: item.item_type.as_str().to_string(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price.to_cents(),
                discount_rate: item.discount_rate,
            },
            taxes,
        });
    }

    Ok((row, items))
}

fn rows_to_invoice(row: InvoiceRow, items: Vec<StoredLineItem>) -> Result<Invoice, PortError> {
    let currency = parse_currency(&row.currency)?;
    let line_items = items
        .into_iter()
        .map(|stored| row_to_line_item(stored, currency))
        .collect::<Result<Vec<_>, _>>()?;

    Invoice::restore(InvoiceRecord {
        id: InvoiceId::from(row.id),
        invoice_number: row.invoice_number,
        family_id: FamilyId::from(row.family_id),
        student_id: row.student_id.map(StudentId::from),
        invoice_date: row.invoice_date,
        due_date: row.due_date,
        currency,
        line_items,
        amount_paid: Money::from_cents(row.amount_paid_cents, currency),
        status: parse_column(&row.status, InvoiceStatus::parse, "status")?,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
    .map_err(transformation)
}

fn row_to_line_item(stored: StoredLineItem, currency: Currency) -> Result<InvoiceLineItem, PortError> {
    let StoredLineItem { item, taxes } = stored;
    Ok(InvoiceLineItem {
        id: LineItemId::from(item.id),
        item_type: parse_column(&item.item_type, ItemType::parse, "item_type")?,
        description: item.description,
        quantity: item.quantity,
        unit_price: Money::from_cents(item.unit_price_cents, currency),
        discount_rate: item.discount_rate,
        taxes: taxes
            .into_iter()
            .map(|tax| LineItemTax {
                tax_rate_id: TaxRateId::from(tax.tax_rate_id),
                tax_amount: Money::from_cents(tax.tax_amount_cents, currency),
                tax_rate_snapshot: Rate::new(tax.tax_rate_snapshot),
                tax_name_snapshot: tax.tax_name_snapshot,
            })
            .collect(),
    })
}
