//! `WS /v1/sync` — real-time turn mirroring, PRO+ only (spec §6).
//!
//! Mirrors the teacher's SSE notification stream
//! (`vestige-mcp/src/protocol/http.rs`) but over a websocket: every accepted
//! `learn`/`turn` call for the tenant is pushed to connected sockets as it
//! happens. Kept deliberately thin — no replay buffer, no backpressure
//! policy beyond a bounded channel that drops the newest message if a
//! socket can't keep up.
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::Extension;
use continuum_core::FederationTier;

use crate::error::ApiError;
use crate::state::{AppState, TenantContext};

pub async fn sync(
    State(state): State<AppState>,
    Extension(context): Extension<TenantContext>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if context.tier == FederationTier::Free {
        return Err(ApiError::forbidden("real-time sync requires the pro tier or higher"));
    }
    let rx = state.sync_hub.subscribe(&context.tenant_id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, rx)))
}

async fn handle_socket(mut socket: WebSocket, mut rx: tokio::sync::broadcast::Receiver<String>) {
    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Ok(payload) => {
                        if socket.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                if incoming.is_none() {
                    break;
                }
            }
        }
    }
}
