//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::{CoreError, PortError};
use domain_billing::BillingError;
use domain_discount::DiscountError;
use domain_tax::TaxError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Request body failed field validation
    #[error("Validation error: {0}")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Validation(_) | ApiError::InvalidFields(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
            }
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            ApiError::Configuration(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let details = match &self {
            ApiError::InvalidFields(errors) => Some(field_messages(errors)),
            _ => None,
        };

        let message = match &self {
            ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Validation(msg)
            | ApiError::Unavailable(msg)
            | ApiError::Configuration(msg)
            | ApiError::Internal(msg) => msg.clone(),
            ApiError::InvalidFields(_) => "Request body failed validation".to_string(),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

fn field_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    messages.sort();
    messages
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PortError::Validation { message, .. } => ApiError::Validation(message),
            PortError::Conflict { message } => ApiError::Conflict(message),
            PortError::Connection { .. } | PortError::Timeout { .. } => {
                ApiError::Unavailable(err.to_string())
            }
            PortError::Transformation { .. } | PortError::Internal { .. } => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration(message) => ApiError::Configuration(message),
            CoreError::NotFound(message) => ApiError::NotFound(message),
            CoreError::Validation(_) | CoreError::Money(_) | CoreError::Temporal(_) => {
                ApiError::Validation(err.to_string())
            }
        }
    }
}

impl From<DiscountError> for ApiError {
    fn from(err: DiscountError) -> Self {
        match err {
            DiscountError::Port(port) => port.into(),
            DiscountError::TemplateNotFound(_)
            | DiscountError::CodeNotFound(_)
            | DiscountError::RuleNotFound(_) => ApiError::NotFound(err.to_string()),
            DiscountError::CodeAllocationExhausted { .. } => ApiError::Internal(err.to_string()),
            _ if err.is_validation() => ApiError::Validation(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<TaxError> for ApiError {
    fn from(err: TaxError) -> Self {
        match err {
            TaxError::Port(port) => port.into(),
            TaxError::Money(_) => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn test_port_errors_map_to_status_codes() {
        assert_eq!(status_of(PortError::not_found("DiscountCode", "x").into()), StatusCode::NOT_FOUND);
        assert_eq!(status_of(PortError::conflict("taken").into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(PortError::validation("bad").into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(PortError::internal("boom").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_discount_errors_map_to_status_codes() {
        assert_eq!(
            status_of(DiscountError::validation("name required").into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(DiscountError::invalid_conditions("unknown key").into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(DiscountError::RuleNotFound("r".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DiscountError::Port(PortError::conflict("code taken")).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                DiscountError::CodeAllocationExhausted {
                    prefix: "AUTO".to_string(),
                    attempts: 10
                }
                .into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_billing_errors_are_validation() {
        let err: ApiError = BillingError::invalid_line_item("quantity must be positive").into();
        assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_core_configuration_errors_are_internal() {
        let err: ApiError = CoreError::configuration("currency: XYZ").into();
        assert!(matches!(err, ApiError::Configuration(_)));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
