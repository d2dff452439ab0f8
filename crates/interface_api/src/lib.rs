//! HTTP API Layer
//!
//! This crate exposes the discount, tax and invoice services over HTTP
//! using Axum. Handlers are thin: all rules live in the domain crates.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for each domain
//! - **Middleware**: Request ids, tracing and audit logging
//! - **DTOs**: Request/Response data transfer objects with field validation
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::postgres(config, pool)?;
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;

use std::sync::Arc;

use axum::{
    http::HeaderName,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{Currency, HealthCheckable};
use domain_discount::{
    AutomationEngine, DiscountCatalog, DiscountEventRecorder, DiscountRedemption,
    DiscountStorePort, StudentFactsPort,
};
use domain_tax::{StudentAgePort, TaxRatePort, TaxResolver};
use infra_db::adapters::{PostgresDiscountStore, PostgresStudentFacts, PostgresTaxAdapter};
use infra_db::DatabasePool;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::handlers::{discount, health, invoice, tax};
use crate::middleware::audit_middleware;

/// Header carrying the per-request identifier
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The storage ports the services run on
pub struct Ports {
    pub discounts: Arc<dyn DiscountStorePort>,
    pub facts: Arc<dyn StudentFactsPort>,
    pub tax_rates: Arc<dyn TaxRatePort>,
    pub students: Arc<dyn StudentAgePort>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    /// Currency of every posted amount
    pub currency: Currency,
    pub catalog: Arc<DiscountCatalog>,
    pub recorder: Arc<DiscountEventRecorder>,
    pub redemption: Arc<DiscountRedemption>,
    pub taxes: Arc<TaxResolver>,
    pub health_checks: Vec<Arc<dyn HealthCheckable>>,
}

impl AppState {
    /// Wires the services over the given ports
    pub fn new(config: ApiConfig, ports: Ports) -> Result<Self, ApiError> {
        let currency = config.currency()?;
        let timezone = config.timezone()?;
        let codes = config.code_generator();

        let engine = Arc::new(AutomationEngine::new(
            ports.discounts.clone(),
            ports.facts,
            codes.clone(),
        ));

        Ok(Self {
            currency,
            catalog: Arc::new(DiscountCatalog::new(ports.discounts.clone(), codes)),
            recorder: Arc::new(DiscountEventRecorder::new(ports.discounts.clone(), engine)),
            redemption: Arc::new(DiscountRedemption::new(ports.discounts)),
            taxes: Arc::new(TaxResolver::new(ports.tax_rates, ports.students, timezone)),
            health_checks: Vec::new(),
            config,
        })
    }

    /// State backed by the PostgreSQL adapters
    pub fn postgres(config: ApiConfig, pool: DatabasePool) -> Result<Self, ApiError> {
        let currency = config.currency()?;
        let discounts = Arc::new(PostgresDiscountStore::new(pool.clone()).with_currency(currency));
        let facts = Arc::new(PostgresStudentFacts::new(pool.clone()));
        let taxes = Arc::new(PostgresTaxAdapter::new(pool));

        let ports = Ports {
            discounts: discounts.clone(),
            facts: facts.clone(),
            tax_rates: taxes.clone(),
            students: taxes.clone(),
        };

        Ok(Self::new(config, ports)?
            .with_health_check(discounts)
            .with_health_check(facts)
            .with_health_check(taxes))
    }

    /// Adds an adapter to the readiness probe
    pub fn with_health_check(mut self, check: Arc<dyn HealthCheckable>) -> Self {
        self.health_checks.push(check);
        self
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let template_routes = Router::new()
        .route("/", post(discount::create_template).get(discount::list_templates))
        .route(
            "/:id",
            get(discount::get_template)
                .put(discount::update_template)
                .delete(discount::delete_template),
        );

    let code_routes = Router::new()
        .route("/", post(discount::create_code))
        .route("/validate", post(discount::validate_code))
        .route("/apply", post(discount::apply_code))
        .route("/:id", get(discount::get_code));

    let rule_routes = Router::new()
        .route("/", post(discount::create_rule).get(discount::list_rules))
        .route("/:id", get(discount::get_rule).put(discount::update_rule));

    let api_routes = Router::new()
        .nest("/discount-templates", template_routes)
        .nest("/discount-codes", code_routes)
        .nest("/automation-rules", rule_routes)
        .route("/discount-events", post(discount::record_event))
        .route("/taxes/payment", post(tax::calculate_payment_taxes))
        .route("/invoices/totals", post(invoice::calculate_totals))
        .layer(axum_middleware::from_fn(audit_middleware));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
