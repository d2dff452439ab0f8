//! Tax handlers

use axum::{extract::State, Json};
use validator::Validate;

use crate::dto::tax::{PaymentTaxQuery, PaymentTaxResponse};
use crate::{error::ApiError, AppState};

/// Taxes owed on a payment
pub async fn calculate_payment_taxes(
    State(state): State<AppState>,
    Json(request): Json<PaymentTaxQuery>,
) -> Result<Json<PaymentTaxResponse>, ApiError> {
    request.validate()?;
    let breakdown = state
        .taxes
        .calculate_taxes_for_payment(&request.into_domain(state.currency))
        .await?;
    Ok(Json(breakdown.into()))
}
