//! Core learn/recall/turn/stats/entities handlers (spec §6).

use axum::extract::{Query, State};
use axum::response::Json;
use axum::Extension;
use continuum_core::EntityType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::{AppState, TenantContext};

#[derive(Debug, Deserialize)]
pub struct RecallRequest {
    pub message: String,
    #[serde(default)]
    pub max_concepts: Option<i64>,
}

pub async fn recall(
    State(state): State<AppState>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<RecallRequest>,
) -> Result<Json<Value>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::validation("message must not be empty"));
    }
    let limit = body.max_concepts.unwrap_or(10);
    let hits = state.engine.recall(&context.tenant_id, &body.message, limit, true).await?;
    Ok(Json(serde_json::json!({ "hits": hits })))
}

#[derive(Debug, Deserialize)]
pub struct LearnRequest {
    pub user_message: String,
    pub ai_response: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub thinking: Option<String>,
}

pub async fn learn(
    State(state): State<AppState>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<LearnRequest>,
) -> Result<Json<Value>, ApiError> {
    if body.user_message.trim().is_empty() || body.ai_response.trim().is_empty() {
        return Err(ApiError::validation("user_message and ai_response must not be empty"));
    }
    let session_id = body.session_id.unwrap_or_else(|| "default".to_string());
    let outcome = state
        .engine
        .learn_with(&context.tenant_id, &body.user_message, &body.ai_response, &session_id, body.metadata, body.thinking)
        .await?;
    if let Ok(payload) = serde_json::to_string(&outcome) {
        state.sync_hub.publish(&context.tenant_id, payload);
    }
    Ok(Json(serde_json::json!({ "outcome": outcome })))
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub user_message: String,
    pub ai_response: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub thinking: Option<String>,
}

pub async fn turn(
    State(state): State<AppState>,
    Extension(context): Extension<TenantContext>,
    Json(body): Json<TurnRequest>,
) -> Result<Json<Value>, ApiError> {
    if body.user_message.trim().is_empty() || body.ai_response.trim().is_empty() {
        return Err(ApiError::validation("user_message and ai_response must not be empty"));
    }
    let session_id = body.session_id.unwrap_or_else(|| "default".to_string());
    let (outcome, hits) = state
        .engine
        .process_turn_with(&context.tenant_id, &body.user_message, &body.ai_response, &session_id, body.metadata, body.thinking)
        .await?;
    if let Ok(payload) = serde_json::to_string(&outcome) {
        state.sync_hub.publish(&context.tenant_id, payload);
    }
    Ok(Json(serde_json::json!({ "outcome": outcome, "hits": hits })))
}

pub async fn stats(State(state): State<AppState>, Extension(context): Extension<TenantContext>) -> Result<Json<Value>, ApiError> {
    let stats = state.engine.stats(&context.tenant_id).await?;
    Ok(Json(serde_json::json!(stats)))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EntityListParams {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub entity_type: Option<String>,
}

pub async fn list_entities(
    State(state): State<AppState>,
    Extension(context): Extension<TenantContext>,
    Query(params): Query<EntityListParams>,
) -> Result<Json<Value>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let offset = params.offset.unwrap_or(0).max(0);
    let entity_type = params.entity_type.as_deref().map(EntityType::parse_name);
    let entities = state.engine.list_entities(&context.tenant_id, entity_type, limit, offset).await?;
    Ok(Json(serde_json::json!({ "entities": entities, "limit": limit, "offset": offset })))
}
