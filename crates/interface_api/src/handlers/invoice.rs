//! Invoice handlers

use axum::{extract::State, Json};
use validator::Validate;

use domain_billing::calculate_invoice_totals;

use crate::dto::invoice::{InvoiceTotalsRequest, InvoiceTotalsResponse, LineItemTotalsResponse};
use crate::{error::ApiError, AppState};

/// Totals for posted line items
///
/// Items posted with tax snapshots are totalled as-is. Items without them
/// are taxed at the rates that apply to their item type today.
pub async fn calculate_totals(
    State(state): State<AppState>,
    Json(request): Json<InvoiceTotalsRequest>,
) -> Result<Json<InvoiceTotalsResponse>, ApiError> {
    request.validate()?;
    let currency = state.currency;

    let mut items = Vec::with_capacity(request.line_items.len());
    for posted in request.line_items {
        let (item, needs_taxes) = posted.into_domain(currency);
        let item = if needs_taxes {
            let rates = state.taxes.applicable_tax_rates(item.item_type, false).await?;
            item.with_taxes_from(&rates)?
        } else {
            item
        };
        items.push(item);
    }

    let mut lines = Vec::with_capacity(items.len());
    for item in &items {
        lines.push(LineItemTotalsResponse::new(item, &item.totals()?));
    }
    let totals = calculate_invoice_totals(&items, currency)?;

    Ok(Json(InvoiceTotalsResponse::new(currency, &totals, lines)))
}
