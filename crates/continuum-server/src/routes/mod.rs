pub mod admin;
pub mod billing;
pub mod memory;
pub mod sync;

use axum::response::Json;

/// `GET /v1/health` — liveness probe, no auth required (spec §6).
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// `GET /openapi.json` — minimal machine-readable description of the `/v1`
/// surface. Not a full OpenAPI document; enough for `/docs`/`/redoc` tooling
/// to point at something.
pub async fn openapi() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "openapi": "3.0.0",
        "info": { "title": "Continuum API", "version": env!("CARGO_PKG_VERSION") },
        "paths": {
            "/v1/recall": {"post": {}},
            "/v1/learn": {"post": {}},
            "/v1/turn": {"post": {}},
            "/v1/stats": {"get": {}},
            "/v1/entities": {"get": {}},
            "/v1/tenants": {"get": {}},
            "/v1/keys": {"post": {}},
            "/v1/health": {"get": {}},
            "/v1/billing/subscription": {"get": {}},
            "/v1/billing/create-checkout-session": {"post": {}},
            "/v1/sync": {"get": {}}
        }
    }))
}

pub async fn docs() -> axum::response::Html<&'static str> {
    axum::response::Html("<html><body><h1>Continuum API</h1><p>See <a href=\"/openapi.json\">/openapi.json</a>.</p></body></html>")
}
