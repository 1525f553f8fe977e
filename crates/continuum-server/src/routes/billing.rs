//! Billing/subscription endpoints (spec §6).

use axum::response::Json;
use axum::Extension;
use continuum_core::FederationTier;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::TenantContext;

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    tenant_id: String,
    tier: FederationTier,
    can_opt_out_of_federation: bool,
}

pub async fn get_subscription(Extension(context): Extension<TenantContext>) -> Json<SubscriptionResponse> {
    Json(SubscriptionResponse { tenant_id: context.tenant_id, tier: context.tier, can_opt_out_of_federation: context.tier.can_opt_out() })
}

/// `POST /v1/billing/create-checkout-session` returns 400 for the free tier
/// (spec §6) — there is nothing to upgrade *from* a paid-features checkout
/// when the tenant hasn't chosen a target plan, and free tenants have no
/// existing subscription to modify.
pub async fn create_checkout_session(Extension(context): Extension<TenantContext>) -> Result<Json<serde_json::Value>, ApiError> {
    if context.tier == FederationTier::Free {
        return Err(ApiError::bad_request("checkout sessions are not available on the free tier"));
    }
    Ok(Json(serde_json::json!({
        "checkout_url": format!("https://billing.example.invalid/checkout/{}", context.tenant_id),
    })))
}
