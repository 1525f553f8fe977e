//! Admin-only endpoints: `GET /v1/tenants`, `POST /v1/keys` (spec §6).

use axum::extract::State;
use axum::response::Json;
use axum::Extension;
use continuum_core::FederationTier;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::{AppState, TenantContext};

/// Only the `enterprise` tier may enumerate tenants or mint keys for others
/// — the same tier gate the federation enforcer applies to other
/// tier-restricted features (spec §4.8).
fn require_admin(context: &TenantContext) -> Result<(), ApiError> {
    if context.tier != FederationTier::Enterprise {
        return Err(ApiError::forbidden("admin endpoints require the enterprise tier"));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TenantSummary {
    tenant_id: String,
    name: String,
    tier: FederationTier,
}

pub async fn list_tenants(State(state): State<AppState>, Extension(context): Extension<TenantContext>) -> Result<Json<Vec<TenantSummary>>, ApiError> {
    require_admin(&context)?;
    let tenants = state
        .api_keys
        .iter()
        .map(|entry| TenantSummary { tenant_id: entry.tenant_id.clone(), name: entry.name.clone(), tier: entry.tier })
        .collect();
    Ok(Json(tenants))
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub tenant_id: String,
    pub name: String,
    #[serde(default = "default_tier")]
    pub tier: FederationTier,
}

fn default_tier() -> FederationTier {
    FederationTier::Free
}

#[derive(Debug, Serialize)]
pub struct CreateKeyResponse {
    pub api_key: String,
}

pub async fn create_key(
    State(state): State<AppState>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<CreateKeyRequest>,
) -> Result<Json<CreateKeyResponse>, ApiError> {
    require_admin(&context)?;
    if body.tenant_id.trim().is_empty() || body.name.trim().is_empty() {
        return Err(ApiError::validation("tenant_id and name must not be empty"));
    }
    let api_key = state.provision_key(&body.tenant_id, &body.name, body.tier);
    Ok(Json(CreateKeyResponse { api_key }))
}
