//! Shared application state (spec §6, §3 "API key / subscription (external
//! collaborator)"). Auth and billing are specified only by their resolution
//! interface — opaque token to `(tenant_id, tier, usage counters)` — so this
//! crate keeps that registry in memory rather than inventing a schema the
//! spec never asked `continuum-core` to own.

use std::sync::Arc;

use continuum_core::{AsyncMemoryEngine, FederationTier};
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::rate_limit::RateLimiter;

/// What an API key resolves to.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: String,
    pub tier: FederationTier,
    pub name: String,
}

/// Per-tenant broadcast channels backing `WS /v1/sync` (spec §6, PRO+).
pub struct SyncHub {
    channels: DashMap<String, tokio::sync::broadcast::Sender<String>>,
}

impl SyncHub {
    fn new() -> Self {
        Self { channels: DashMap::new() }
    }

    fn sender(&self, tenant_id: &str) -> tokio::sync::broadcast::Sender<String> {
        self.channels.entry(tenant_id.to_string()).or_insert_with(|| tokio::sync::broadcast::channel(64).0).clone()
    }

    pub fn subscribe(&self, tenant_id: &str) -> tokio::sync::broadcast::Receiver<String> {
        self.sender(tenant_id).subscribe()
    }

    /// Best-effort: a tenant with no connected sockets simply has no
    /// receivers, which is not an error.
    pub fn publish(&self, tenant_id: &str, payload: String) {
        let _ = self.sender(tenant_id).send(payload);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AsyncMemoryEngine>,
    pub api_keys: Arc<DashMap<String, TenantContext>>,
    pub rate_limiter: Arc<RateLimiter>,
    pub sync_hub: Arc<SyncHub>,
}

impl AppState {
    pub fn new(engine: AsyncMemoryEngine) -> Self {
        let api_keys = Arc::new(DashMap::new());
        // A default key so `doctor`/local smoke-testing has something to
        // authenticate with out of the box.
        api_keys.insert(
            "cm_dev_default".to_string(),
            TenantContext { tenant_id: "default".to_string(), tier: FederationTier::Free, name: "default".to_string() },
        );
        Self { engine: Arc::new(engine), api_keys, rate_limiter: Arc::new(RateLimiter::new()), sync_hub: Arc::new(SyncHub::new()) }
    }

    /// Mints a new opaque key for `tenant_id`, prefixed `cm_` (spec §6).
    pub fn provision_key(&self, tenant_id: &str, name: &str, tier: FederationTier) -> String {
        let mut hasher = Sha256::new();
        hasher.update(tenant_id.as_bytes());
        hasher.update(name.as_bytes());
        hasher.update(self.api_keys.len().to_le_bytes());
        let digest = hasher.finalize();
        let key = format!("cm_{}", digest.iter().take(16).map(|b| format!("{b:02x}")).collect::<String>());
        self.api_keys.insert(key.clone(), TenantContext { tenant_id: tenant_id.to_string(), tier, name: name.to_string() });
        key
    }
}
