//! Invoice aggregate and lifecycle
//!
//! An invoice owns its line items and keeps [`InvoiceTotals`] in step with
//! them. Line items carry tax snapshots, so an invoice never changes when
//! the configured tax rates do.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{Currency, FamilyId, InvoiceId, Money, StudentId};

use crate::error::BillingError;
use crate::line_item::InvoiceLineItem;
use crate::totals::{calculate_invoice_totals, InvoiceTotals};

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    PartiallyPaid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(InvoiceStatus::Draft),
            "sent" => Some(InvoiceStatus::Sent),
            "paid" => Some(InvoiceStatus::Paid),
            "partially_paid" => Some(InvoiceStatus::PartiallyPaid),
            "overdue" => Some(InvoiceStatus::Overdue),
            "cancelled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }

    /// Paid and cancelled invoices accept no further changes
    pub fn is_closed(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

/// An invoice issued to a family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Human-readable number, e.g. `INV-1712345678901`
    pub invoice_number: String,
    pub family_id: FamilyId,
    /// Set when the invoice is for a single student
    pub student_id: Option<StudentId>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: Currency,
    pub line_items: Vec<InvoiceLineItem>,
    totals: InvoiceTotals,
    pub amount_paid: Money,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored invoice fields, used to rebuild an [`Invoice`]
#[derive(Debug, Clone)]
pub struct InvoiceRecord {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub family_id: FamilyId,
    pub student_id: Option<StudentId>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: Currency,
    pub line_items: Vec<InvoiceLineItem>,
    pub amount_paid: Money,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Rebuilds a stored invoice
    ///
    /// Totals are summed from the line items and their tax snapshots.
    pub fn restore(record: InvoiceRecord) -> Result<Self, BillingError> {
        let totals = calculate_invoice_totals(&record.line_items, record.currency)?;
        Ok(Self {
            id: record.id,
            invoice_number: record.invoice_number,
            family_id: record.family_id,
            student_id: record.student_id,
            invoice_date: record.invoice_date,
            due_date: record.due_date,
            currency: record.currency,
            line_items: record.line_items,
            totals,
            amount_paid: record.amount_paid,
            status: record.status,
            notes: record.notes,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub fn new(family_id: FamilyId, due_date: NaiveDate, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: InvoiceId::new_v7(),
            invoice_number: generate_invoice_number(now),
            family_id,
            student_id: None,
            invoice_date: now.date_naive(),
            due_date,
            currency,
            line_items: Vec::new(),
            totals: InvoiceTotals::zero(currency),
            amount_paid: Money::zero(currency),
            status: InvoiceStatus::Draft,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn for_student(mut self, student_id: StudentId) -> Self {
        self.student_id = Some(student_id);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Adds a line item and recomputes the totals
    ///
    /// Only draft invoices can change. The item is rejected, and the
    /// invoice left untouched, if it is invalid or in another currency.
    pub fn add_line_item(&mut self, item: InvoiceLineItem) -> Result<(), BillingError> {
        if self.status != InvoiceStatus::Draft {
            return Err(BillingError::invalid_operation(format!(
                "cannot add items to a {} invoice",
                self.status.as_str()
            )));
        }

        let mut items = self.line_items.clone();
        items.push(item);
        let totals = calculate_invoice_totals(&items, self.currency)?;

        self.line_items = items;
        self.totals = totals;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn totals(&self) -> &InvoiceTotals {
        &self.totals
    }

    pub fn balance_due(&self) -> Result<Money, BillingError> {
        Ok(self.totals.total_amount.checked_sub(&self.amount_paid)?)
    }

    pub fn mark_sent(&mut self) -> Result<(), BillingError> {
        if self.status != InvoiceStatus::Draft {
            return Err(BillingError::invalid_operation(format!(
                "only draft invoices can be sent, this one is {}",
                self.status.as_str()
            )));
        }
        if self.line_items.is_empty() {
            return Err(BillingError::invalid_operation("invoice has no line items"));
        }
        self.status = InvoiceStatus::Sent;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records a payment and moves the invoice to paid or partially paid
    pub fn record_payment(&mut self, amount: Money) -> Result<(), BillingError> {
        if self.status.is_closed() || self.status == InvoiceStatus::Draft {
            return Err(BillingError::invalid_operation(format!(
                "cannot record a payment on a {} invoice",
                self.status.as_str()
            )));
        }
        if !amount.is_positive() {
            return Err(BillingError::invalid_operation("payment amount must be positive"));
        }

        let amount_paid = self.amount_paid.checked_add(&amount)?;
        self.amount_paid = amount_paid;
        self.status = if amount_paid.to_cents() >= self.totals.total_amount.to_cents() {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };
        self.updated_at = Utc::now();

        debug!(
            invoice_number = %self.invoice_number,
            amount = %amount,
            status = self.status.as_str(),
            "Payment recorded"
        );
        Ok(())
    }

    /// Marks an unpaid invoice overdue once `today` is past the due date
    ///
    /// Returns whether the status changed.
    pub fn mark_overdue_on(&mut self, today: NaiveDate) -> bool {
        if !self.is_overdue_on(today) || self.status == InvoiceStatus::Overdue {
            return false;
        }
        self.status = InvoiceStatus::Overdue;
        self.updated_at = Utc::now();
        true
    }

    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        today > self.due_date
            && matches!(
                self.status,
                InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid | InvoiceStatus::Overdue
            )
    }

    pub fn cancel(&mut self) -> Result<(), BillingError> {
        if self.status.is_closed() || self.amount_paid.is_positive() {
            return Err(BillingError::invalid_operation(format!(
                "cannot cancel a {} invoice",
                self.status.as_str()
            )));
        }
        self.status = InvoiceStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Invoice numbers are derived from the creation time in milliseconds
fn generate_invoice_number(at: DateTime<Utc>) -> String {
    format!("INV-{}", at.timestamp_millis() % 10_000_000_000_000)
}
