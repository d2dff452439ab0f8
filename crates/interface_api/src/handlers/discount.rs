//! Discount handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use core_kernel::{AutomationRuleId, DiscountCodeId, DiscountTemplateId};

use crate::dto::discount::*;
use crate::{error::ApiError, AppState};

// Templates

pub async fn create_template(
    State(state): State<AppState>,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<TemplateResponse>), ApiError> {
    request.validate()?;
    let template = state
        .catalog
        .create_template(request.into_domain(state.currency)?)
        .await?;
    Ok((StatusCode::CREATED, Json(template.into())))
}

pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListTemplatesQuery>,
) -> Result<Json<Vec<TemplateResponse>>, ApiError> {
    let templates = state.catalog.list_templates(query.active_only).await?;
    Ok(Json(templates.into_iter().map(Into::into).collect()))
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<DiscountTemplateId>,
) -> Result<Json<TemplateResponse>, ApiError> {
    state
        .catalog
        .get_template(id)
        .await?
        .map(|t| Json(t.into()))
        .ok_or_else(|| ApiError::NotFound(format!("Discount template {} not found", id)))
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<DiscountTemplateId>,
    Json(request): Json<UpdateTemplateRequest>,
) -> Result<Json<TemplateResponse>, ApiError> {
    request.validate()?;
    let template = state
        .catalog
        .update_template(id, request.into_domain(state.currency)?)
        .await?;
    Ok(Json(template.into()))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<DiscountTemplateId>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_template(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Codes

pub async fn create_code(
    State(state): State<AppState>,
    Json(request): Json<CreateCodeRequest>,
) -> Result<(StatusCode, Json<CodeResponse>), ApiError> {
    request.validate()?;
    let code = state
        .catalog
        .create_discount_code(request.into_domain(state.currency)?)
        .await?;
    Ok((StatusCode::CREATED, Json(code.into())))
}

pub async fn get_code(
    State(state): State<AppState>,
    Path(id): Path<DiscountCodeId>,
) -> Result<Json<CodeResponse>, ApiError> {
    state
        .catalog
        .get_code(id)
        .await?
        .map(|c| Json(c.into()))
        .ok_or_else(|| ApiError::NotFound(format!("Discount code {} not found", id)))
}

/// Checks a code at checkout without redeeming it
///
/// An unusable code is a normal `200` response with `is_valid = false`.
pub async fn validate_code(
    State(state): State<AppState>,
    Json(request): Json<ValidateCodeRequest>,
) -> Result<Json<ValidationResponse>, ApiError> {
    request.validate()?;
    let validation = state
        .redemption
        .validate_discount_code(&request.into_domain(state.currency))
        .await?;
    Ok(Json(validation.into()))
}

pub async fn apply_code(
    State(state): State<AppState>,
    Json(request): Json<ApplyCodeRequest>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    request.validate()?;
    let application = state
        .redemption
        .apply_discount_code(&request.into_domain(state.currency))
        .await?;
    Ok(Json(application.into()))
}

// Rules

pub async fn create_rule(
    State(state): State<AppState>,
    Json(request): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<RuleResponse>), ApiError> {
    request.validate()?;
    let rule = state.catalog.create_rule(request.into()).await?;
    Ok((StatusCode::CREATED, Json(rule.into())))
}

pub async fn list_rules(
    State(state): State<AppState>,
) -> Result<Json<Vec<RuleResponse>>, ApiError> {
    let rules = state.catalog.list_rules().await?;
    Ok(Json(rules.into_iter().map(Into::into).collect()))
}

pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<AutomationRuleId>,
) -> Result<Json<RuleResponse>, ApiError> {
    state
        .catalog
        .get_rule(id)
        .await?
        .map(|r| Json(r.into()))
        .ok_or_else(|| ApiError::NotFound(format!("Automation rule {} not found", id)))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<AutomationRuleId>,
    Json(request): Json<UpdateRuleRequest>,
) -> Result<Json<RuleResponse>, ApiError> {
    request.validate()?;
    let rule = state.catalog.update_rule(id, request.into()).await?;
    Ok(Json(rule.into()))
}

// Events

/// Records an event and runs the automation rules for it
pub async fn record_event(
    State(state): State<AppState>,
    Json(request): Json<RecordEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), ApiError> {
    let recorded = state.recorder.record_event(request.into()).await?;
    Ok((StatusCode::CREATED, Json(recorded.into())))
}
