//! Billing Domain - invoice totals and lifecycle
//!
//! Invoices are built from line items. Each line item carries a quantity, a
//! unit price, an optional percentage discount and the taxes charged on it.
//! Taxes are computed once, from the rates in force when the item is billed,
//! and stored as snapshots.
//!
//! # Totals
//!
//! For every line item:
//!
//! ```text
//! subtotal = quantity × unit_price
//! discount = subtotal × discount_rate / 100
//! tax      = Σ stored tax snapshots
//! total    = subtotal − discount + tax
//! ```
//!
//! Invoice totals are the sum of each component across all line items.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{Invoice, InvoiceLineItem};
//!
//! let item = InvoiceLineItem::new("Monthly membership", ItemType::ClassEnrollment, price)
//!     .with_quantity(dec!(2))
//!     .with_discount_rate(dec!(10))
//!     .with_taxes_from(&rates)?;
//!
//! let mut invoice = Invoice::new(family_id, due_date, Currency::CAD);
//! invoice.add_line_item(item)?;
//! ```

pub mod line_item;
pub mod totals;
pub mod invoice;
pub mod error;

pub use line_item::{InvoiceLineItem, LineItemTax, LineItemTotals};
pub use totals::{calculate_invoice_totals, InvoiceTotals};
pub use invoice::{Invoice, InvoiceRecord, InvoiceStatus};
pub use error::BillingError;
