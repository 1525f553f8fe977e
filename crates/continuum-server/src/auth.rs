//! `X-API-Key` authentication middleware (spec §6).

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::{AppState, TenantContext};

pub async fn require_api_key(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let key = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing X-API-Key header"))?;

    let context: TenantContext = state.api_keys.get(key).map(|entry| entry.value().clone()).ok_or_else(|| ApiError::unauthorized("invalid API key"))?;

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}
