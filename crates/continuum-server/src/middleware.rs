//! Rate-limit enforcement (spec §6). Runs after [`crate::auth::require_api_key`]
//! so the tenant's tier is already attached as a request extension.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::rate_limit::Admission;
use crate::state::{AppState, TenantContext};

pub async fn enforce_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    let context = request
        .extensions()
        .get::<TenantContext>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("missing tenant context"))?;

    match state.rate_limiter.admit(&context.tenant_id, context.tier) {
        Admission::Allowed => {}
        Admission::Rejected(retry_after) => return Err(ApiError::rate_limited(retry_after)),
    }

    let response = next.run(request).await;
    state.rate_limiter.release(&context.tenant_id);
    Ok(response)
}
