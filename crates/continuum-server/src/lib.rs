//! Thin HTTP transport over `continuum-core` (spec §6). Implements the
//! `/v1` wire contract only — routing, auth, rate limiting, status codes —
//! and delegates every operation to [`continuum_core::AsyncMemoryEngine`].
//! No business logic is duplicated here, mirroring how
//! `vestige-mcp`'s dashboard router (`src/dashboard/mod.rs`) stays a layer
//! of handlers over `vestige-core`.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod state;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

pub use state::AppState;

/// Builds the full `/v1` router plus `/docs`/`/redoc`/`/openapi.json`.
pub fn build_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/v1/recall", post(routes::memory::recall))
        .route("/v1/learn", post(routes::memory::learn))
        .route("/v1/turn", post(routes::memory::turn))
        .route("/v1/stats", get(routes::memory::stats))
        .route("/v1/entities", get(routes::memory::list_entities))
        .route("/v1/tenants", get(routes::admin::list_tenants))
        .route("/v1/keys", post(routes::admin::create_key))
        .route("/v1/billing/subscription", get(routes::billing::get_subscription))
        .route("/v1/billing/create-checkout-session", post(routes::billing::create_checkout_session))
        .route("/v1/sync", get(routes::sync::sync))
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::enforce_rate_limit))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth::require_api_key));

    let public = Router::new()
        .route("/v1/health", get(routes::health))
        .route("/docs", get(routes::docs))
        .route("/redoc", get(routes::docs))
        .route("/openapi.json", get(routes::openapi));

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any);

    let csp = SetResponseHeaderLayer::overriding(
        axum::http::header::CONTENT_SECURITY_POLICY,
        axum::http::HeaderValue::from_static("default-src 'self'"),
    );

    Router::new().merge(authenticated).merge(public).layer(ServiceBuilder::new().layer(cors).layer(csp)).with_state(state)
}
