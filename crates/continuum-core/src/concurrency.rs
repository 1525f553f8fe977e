//! Async adapter over [`MemoryEngine`] (spec §5, C10).
//!
//! The scheduling model is "parallel, thread-safe read path; serialized
//! write path per tenant". `MemoryEngine` itself is synchronous (blocking
//! SQLite calls); this adapter runs each call on
//! `tokio::task::spawn_blocking` and additionally serializes `learn` per
//! tenant with an async mutex so two concurrent turns for the same tenant
//! can't interleave their storage writes, without blocking unrelated
//! tenants or any `recall`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;

use crate::entities::{EvolutionEventType, Intention};
use crate::error::{ContinuumError, Result};
use crate::memory::{LearnOutcome, MemoryEngine, RecallHit};

/// Thread-safe, async-friendly wrapper around [`MemoryEngine`].
pub struct AsyncMemoryEngine {
    inner: Arc<MemoryEngine>,
    tenant_write_locks: Arc<DashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AsyncMemoryEngine {
    pub fn new(inner: MemoryEngine) -> Self {
        Self { inner: Arc::new(inner), tenant_write_locks: Arc::new(DashMap::new()) }
    }

    fn tenant_lock(&self, tenant_id: &str) -> Arc<AsyncMutex<()>> {
        self.tenant_write_locks
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Runs `f` on the blocking thread pool, mapping a join failure to
    /// `StorageUnavailable` rather than panicking the caller's task.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Arc<MemoryEngine>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let engine = self.inner.clone();
        tokio::task::spawn_blocking(move || f(engine))
            .await
            .map_err(|e| ContinuumError::StorageUnavailable(format!("blocking task panicked: {e}")))?
    }

    /// Serializes concurrent `learn` calls for the same tenant; different
    /// tenants proceed fully in parallel.
    pub async fn learn(&self, tenant_id: &str, user_message: &str, ai_response: &str, session_id: &str) -> Result<LearnOutcome> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        let tenant_id = tenant_id.to_string();
        let user_message = user_message.to_string();
        let ai_response = ai_response.to_string();
        let session_id = session_id.to_string();
        self.blocking(move |engine| engine.learn(&tenant_id, &user_message, &ai_response, &session_id)).await
    }

    /// `learn` with the caller-supplied `metadata`/`thinking` the `/v1/learn`
    /// wire contract carries (spec §6).
    pub async fn learn_with(
        &self,
        tenant_id: &str,
        user_message: &str,
        ai_response: &str,
        session_id: &str,
        metadata: Option<serde_json::Value>,
        thinking: Option<String>,
    ) -> Result<LearnOutcome> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        let tenant_id = tenant_id.to_string();
        let user_message = user_message.to_string();
        let ai_response = ai_response.to_string();
        let session_id = session_id.to_string();
        self.blocking(move |engine| {
            engine.learn_with(&tenant_id, &user_message, &ai_response, &session_id, metadata, thinking.as_deref())
        })
        .await
    }

    /// A pure read: never waits on the tenant write lock.
    pub async fn recall(&self, tenant_id: &str, query: &str, limit: i64, include_verbatim: bool) -> Result<Vec<RecallHit>> {
        let tenant_id = tenant_id.to_string();
        let query = query.to_string();
        self.blocking(move |engine| engine.recall(&tenant_id, &query, limit, include_verbatim)).await
    }

    pub async fn process_turn(
        &self,
        tenant_id: &str,
        user_message: &str,
        ai_response: &str,
        session_id: &str,
    ) -> Result<(LearnOutcome, Vec<RecallHit>)> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        let tenant_id = tenant_id.to_string();
        let user_message = user_message.to_string();
        let ai_response = ai_response.to_string();
        let session_id = session_id.to_string();
        self.blocking(move |engine| engine.process_turn(&tenant_id, &user_message, &ai_response, &session_id)).await
    }

    /// `process_turn` with the caller-supplied `metadata`/`thinking` (spec §6
    /// `/v1/turn`).
    pub async fn process_turn_with(
        &self,
        tenant_id: &str,
        user_message: &str,
        ai_response: &str,
        session_id: &str,
        metadata: Option<serde_json::Value>,
        thinking: Option<String>,
    ) -> Result<(LearnOutcome, Vec<RecallHit>)> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        let tenant_id = tenant_id.to_string();
        let user_message = user_message.to_string();
        let ai_response = ai_response.to_string();
        let session_id = session_id.to_string();
        self.blocking(move |engine| {
            engine.process_turn_with(&tenant_id, &user_message, &ai_response, &session_id, metadata, thinking.as_deref())
        })
        .await
    }

    pub async fn consolidate(&self, tenant_id: &str) -> Result<usize> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;
        let tenant_id = tenant_id.to_string();
        self.blocking(move |engine| engine.consolidate(&tenant_id)).await
    }

    pub async fn resume_check(&self, tenant_id: &str) -> Result<(Vec<Intention>, Vec<crate::entities::Decision>)> {
        let tenant_id = tenant_id.to_string();
        self.blocking(move |engine| engine.resume_check(&tenant_id)).await
    }

    pub async fn add_intention(&self, tenant_id: &str, intention: &str, priority: i32) -> Result<Intention> {
        let tenant_id = tenant_id.to_string();
        let intention = intention.to_string();
        self.blocking(move |engine| engine.add_intention(&tenant_id, &intention, None, priority, None)).await
    }

    pub async fn complete_intention(&self, tenant_id: &str, id: i64) -> Result<()> {
        let tenant_id = tenant_id.to_string();
        self.blocking(move |engine| engine.complete_intention(&tenant_id, id)).await
    }

    pub async fn list_entities(
        &self,
        tenant_id: &str,
        entity_type: Option<crate::entities::EntityType>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<crate::entities::Entity>> {
        let tenant_id = tenant_id.to_string();
        self.blocking(move |engine| engine.list_entities(&tenant_id, entity_type, limit, offset)).await
    }

    pub async fn stats(&self, tenant_id: &str) -> Result<crate::memory::EngineStats> {
        let tenant_id = tenant_id.to_string();
        self.blocking(move |engine| engine.stats(&tenant_id)).await
    }

    pub async fn export(&self, tenant_id: &str) -> Result<crate::export::ExportBundle> {
        let tenant_id = tenant_id.to_string();
        self.blocking(move |engine| engine.export(&tenant_id)).await
    }

    pub async fn import(&self, tenant_id: &str, bundle: crate::export::ExportBundle) -> Result<crate::export::ImportSummary> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;
        let tenant_id = tenant_id.to_string();
        self.blocking(move |engine| engine.import(&tenant_id, &bundle)).await
    }

    pub async fn record_evolution_event(&self, tenant_id: &str, concept_name: &str, event_type: EvolutionEventType) -> Result<()> {
        let tenant_id = tenant_id.to_string();
        let concept_name = concept_name.to_string();
        self.blocking(move |engine| {
            engine.record_evolution_event(&tenant_id, &concept_name, event_type, None, None, None).map(|_| ())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn engine() -> AsyncMemoryEngine {
        AsyncMemoryEngine::new(MemoryEngine::open_in_memory(Config::default()).unwrap())
    }

    #[tokio::test]
    async fn learn_then_recall_round_trips() {
        let engine = engine();
        engine.learn("t1", "Tell me about Rust", "Rust is great", "s1").await.unwrap();
        let hits = engine.recall("t1", "Rust", 10, false).await.unwrap();
        assert!(!hits.is_empty());
    }

    #[tokio::test]
    async fn concurrent_learns_for_same_tenant_do_not_lose_updates() {
        let engine = Arc::new(engine());
        let mut handles = Vec::new();
        for i in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .learn("t1", &format!("message {i} about Rust"), "noted", &format!("s{i}"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let hits = engine.recall("t1", "Rust", 10, false).await.unwrap();
        assert!(!hits.is_empty());
    }

    #[tokio::test]
    async fn intentions_round_trip_async() {
        let engine = engine();
        let intention = engine.add_intention("t1", "ship recall cache", 5).await.unwrap();
        engine.complete_intention("t1", intention.id).await.unwrap();
        let (pending, _) = engine.resume_check("t1").await.unwrap();
        assert!(pending.is_empty());
    }
}
