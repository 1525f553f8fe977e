//! The `MemoryEngine` façade (spec §4.6): the one entry point orchestrating
//! storage, extraction, the attention graph, caching, and recall fusion.
//! Nothing above this layer should need to open a `Storage` or
//! `AttentionGraphEngine` directly.

use serde_json::json;

use crate::cache::{self, Cache};
use crate::config::Config;
use crate::embeddings::HashingEmbeddingProvider;
use crate::entities::{
    AutoMessageRole, ConceptEvolutionEvent, Decision, EntityType, EvolutionEventType, Intention,
    IntentionStatus, Message, ThinkingSnapshot,
};
use crate::error::{ContinuumError, Result};
use crate::export::{self, ExportBundle, ImportSummary};
use crate::extractors::{CompoundExtractor, ConceptExtractor, DecisionExtractor};
use crate::graph::AttentionGraphEngine;
use crate::query::{QueryEngine, RankedEntity};
use crate::storage::Storage;

/// What a single `learn` call extracted and persisted.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnOutcome {
    pub message: Message,
    pub concepts: Vec<String>,
    pub decisions: Vec<Decision>,
    pub compound: Option<String>,
    pub links_created: usize,
}

/// A recall result: the ranked entity plus, if requested, the verbatim
/// messages that mention it (Open Question #2: gated by `include_verbatim`,
/// default on).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallHit {
    #[serde(flatten)]
    pub ranked: RankedEntity,
    pub verbatim: Vec<Message>,
}

pub struct MemoryEngine {
    storage: Storage,
    graph: AttentionGraphEngine,
    query: QueryEngine,
    cache: Box<dyn Cache>,
    config: Config,
    concept_extractor: ConceptExtractor,
    decision_extractor: DecisionExtractor,
    compound_extractor: CompoundExtractor,
}

impl MemoryEngine {
    pub fn open(config: Config) -> Result<Self> {
        let storage = Storage::open(&config)?;
        Self::from_storage(storage, config)
    }

    pub fn open_in_memory(config: Config) -> Result<Self> {
        let storage = Storage::open_in_memory(&config)?;
        Self::from_storage(storage, config)
    }

    fn from_storage(storage: Storage, config: Config) -> Result<Self> {
        let graph = AttentionGraphEngine::new(storage.clone(), config.clone());
        let query = QueryEngine::new(storage.clone(), graph.clone(), Box::new(HashingEmbeddingProvider::new()), config.expansion_factor);
        let cache = cache::build(&config);
        Ok(Self {
            storage,
            graph,
            query,
            cache,
            config,
            concept_extractor: ConceptExtractor::new(),
            decision_extractor: DecisionExtractor::new(),
            compound_extractor: CompoundExtractor::new(),
        })
    }

    /// Persists a conversational turn, extracts concepts/decisions from it,
    /// links co-occurring concepts in the attention graph, and records a
    /// compound concept if at least two concepts co-occurred (spec §4.2-4.3).
    pub fn learn(&self, tenant_id: &str, user_message: &str, ai_response: &str, session_id: &str) -> Result<LearnOutcome> {
        self.learn_with(tenant_id, user_message, ai_response, session_id, None, None)
    }

    /// `learn`, additionally accepting the caller-supplied `metadata`/
    /// `thinking` the `/v1/learn` wire contract carries (spec §6).
    pub fn learn_with(
        &self,
        tenant_id: &str,
        user_message: &str,
        ai_response: &str,
        session_id: &str,
        metadata: Option<serde_json::Value>,
        thinking: Option<&str>,
    ) -> Result<LearnOutcome> {
        let metadata = metadata.unwrap_or_else(|| json!({}));
        let message = self.storage.insert_message(tenant_id, user_message, ai_response, session_id, &metadata, thinking)?;

        // Per-role log, monotonic `message_number` per instance (spec §3/§4.2
        // step 6). `session_id` doubles as `instance_id` (Open Question #3).
        self.storage.insert_auto_message(tenant_id, session_id, AutoMessageRole::User, user_message, &metadata)?;
        self.storage.insert_auto_message(tenant_id, session_id, AutoMessageRole::Assistant, ai_response, &metadata)?;
        if let Some(thinking) = thinking {
            self.storage.insert_auto_message(tenant_id, session_id, AutoMessageRole::Thinking, thinking, &metadata)?;
        }

        let mut concepts = self.concept_extractor.extract(user_message);
        concepts.extend(self.concept_extractor.extract(ai_response));
        concepts.sort_by_key(|c| c.to_lowercase());
        concepts.dedup_by_key(|c| c.to_lowercase());

        for concept in &concepts {
            self.storage.upsert_entity(tenant_id, concept, EntityType::Concept, None)?;
        }

        let decisions_text = self.decision_extractor.extract(ai_response, true);
        let mut decisions = Vec::with_capacity(decisions_text.len());
        for text in decisions_text {
            decisions.push(self.storage.insert_decision(tenant_id, session_id, &text, None, "ai_response")?);
            self.storage.upsert_entity(tenant_id, &text, EntityType::Decision, None)?;
        }

        let touched = self.graph.touch_co_occurring(tenant_id, &concepts)?;
        let links_created = touched.iter().filter(|t| t.created).count();

        let compound = self.compound_extractor.detect(&concepts).map(|(name, components)| {
            self.storage.upsert_compound(tenant_id, &name, &components).ok();
            name
        });

        for concept in &concepts {
            self.storage
                .insert_evolution_event(tenant_id, concept, EvolutionEventType::Strengthened, None, None, Some(session_id))
                .ok();
        }

        self.cache.invalidate_tenant(tenant_id);

        Ok(LearnOutcome { message, concepts, decisions, compound, links_created })
    }

    /// Ranked recall over entities plus, when `include_verbatim` is set,
    /// the FTS5-matched messages mentioning the query text.
    pub fn recall(&self, tenant_id: &str, query: &str, limit: i64, include_verbatim: bool) -> Result<Vec<RecallHit>> {
        let cache_key = format!("{query}:{limit}:{include_verbatim}");
        if let Some(cached) = self.cache.get(tenant_id, &cache_key) {
            if let Ok(hits) = serde_json::from_str::<Vec<RecallHit>>(&cached) {
                return Ok(hits);
            }
        }

        let ranked = self.query.recall_entities(tenant_id, query, limit)?;
        let mut hits = Vec::with_capacity(ranked.len());
        for entity_hit in ranked {
            let verbatim = if include_verbatim {
                self.storage.search_messages_fts(tenant_id, &entity_hit.entity.name, 3)?
            } else {
                Vec::new()
            };
            hits.push(RecallHit { ranked: entity_hit, verbatim });
        }

        if let Ok(serialized) = serde_json::to_string(&hits) {
            self.cache.put(tenant_id, &cache_key, serialized, self.config.search_cache_ttl);
        }
        Ok(hits)
    }

    /// Convenience wrapper used by the CLI/server: learns from a turn, then
    /// immediately recalls context relevant to the user's message.
    pub fn process_turn(&self, tenant_id: &str, user_message: &str, ai_response: &str, session_id: &str) -> Result<(LearnOutcome, Vec<RecallHit>)> {
        self.process_turn_with(tenant_id, user_message, ai_response, session_id, None, None)
    }

    /// `process_turn`, additionally accepting `metadata`/`thinking` (spec §6
    /// `/v1/turn`).
    pub fn process_turn_with(
        &self,
        tenant_id: &str,
        user_message: &str,
        ai_response: &str,
        session_id: &str,
        metadata: Option<serde_json::Value>,
        thinking: Option<&str>,
    ) -> Result<(LearnOutcome, Vec<RecallHit>)> {
        let outcome = self.learn_with(tenant_id, user_message, ai_response, session_id, metadata, thinking)?;
        let recalled = self.recall(tenant_id, user_message, 10, true)?;
        Ok((outcome, recalled))
    }

    pub fn add_intention(&self, tenant_id: &str, intention: &str, context: Option<&str>, priority: i32, session_id: Option<&str>) -> Result<Intention> {
        self.storage.insert_intention(tenant_id, intention, context, priority, session_id, &json!({}))
    }

    pub fn list_intentions(&self, tenant_id: &str, status: Option<IntentionStatus>) -> Result<Vec<Intention>> {
        self.storage.list_intentions(tenant_id, status)
    }

    /// Paginated entity listing (spec §6 `GET /v1/entities`).
    pub fn list_entities(&self, tenant_id: &str, entity_type: Option<EntityType>, limit: i64, offset: i64) -> Result<Vec<crate::entities::Entity>> {
        self.storage.list_entities(tenant_id, entity_type, limit, offset)
    }

    pub fn complete_intention(&self, tenant_id: &str, id: i64) -> Result<()> {
        self.storage.update_intention_status(tenant_id, id, IntentionStatus::Completed)
    }

    /// Outstanding intentions and recent decisions, the summary a caller
    /// shows a returning user to pick up where they left off.
    pub fn resume_check(&self, tenant_id: &str) -> Result<(Vec<Intention>, Vec<Decision>)> {
        let pending = self.storage.list_intentions(tenant_id, Some(IntentionStatus::Pending))?;
        let recent_decisions = self.storage.list_recent_decisions(tenant_id, 5)?;
        Ok((pending, recent_decisions))
    }

    pub fn record_evolution_event(
        &self,
        tenant_id: &str,
        concept_name: &str,
        event_type: EvolutionEventType,
        old_value: Option<&str>,
        new_value: Option<&str>,
        context: Option<&str>,
    ) -> Result<ConceptEvolutionEvent> {
        self.storage.insert_evolution_event(tenant_id, concept_name, event_type, old_value, new_value, context)
    }

    /// Captures a point-in-time engine snapshot (entity/link/message counts)
    /// for later comparison, mirroring the teacher's `take_snapshot`.
    pub fn take_snapshot(&self, tenant_id: &str) -> Result<ThinkingSnapshot> {
        let metrics = json!({
            "entities": self.storage.count_entities(tenant_id)?,
            "links": self.storage.count_links(tenant_id)?,
            "messages": self.storage.count_messages(tenant_id)?,
        });
        self.storage.insert_snapshot(tenant_id, "periodic", &json!({}), &metrics)
    }

    /// Difference in the metrics of two previously captured snapshots,
    /// keyed by metric name.
    pub fn compare_snapshots(&self, before: &ThinkingSnapshot, after: &ThinkingSnapshot) -> Result<serde_json::Value> {
        let (Some(before_metrics), Some(after_metrics)) = (before.metrics.as_object(), after.metrics.as_object()) else {
            return Err(ContinuumError::Validation("snapshot metrics must be an object".into()));
        };
        let mut diff = serde_json::Map::new();
        for (key, after_value) in after_metrics {
            let before_value = before_metrics.get(key).and_then(|v| v.as_i64()).unwrap_or(0);
            let after_value = after_value.as_i64().unwrap_or(0);
            diff.insert(key.clone(), json!(after_value - before_value));
        }
        Ok(serde_json::Value::Object(diff))
    }

    /// Runs one decay pass and prunes edges that fell below the floor.
    /// Intended to be called periodically (spec §4.3 consolidation).
    pub fn consolidate(&self, tenant_id: &str) -> Result<usize> {
        self.graph.prune(tenant_id)
    }

    /// A dream-mode associative walk starting from `seed`, surfaced as a
    /// novel chain of related concepts (spec §4.3 dream mode). Uses
    /// `Config::dream_temperature` unless `temperature` overrides it.
    pub fn dream(&self, tenant_id: &str, seed: &str, steps: usize, temperature: Option<f64>) -> Result<crate::graph::DreamJourney> {
        self.graph.dream_walk(tenant_id, seed, steps, temperature.unwrap_or(self.config.dream_temperature))
    }

    /// Point-in-time counts used by the CLI `status`/`doctor` commands,
    /// write-through cached alongside recall results (spec §4.5/C7).
    pub fn stats(&self, tenant_id: &str) -> Result<EngineStats> {
        let cache_key = "stats";
        if let Some(cached) = self.cache.get(tenant_id, cache_key) {
            if let Ok(stats) = serde_json::from_str::<EngineStats>(&cached) {
                return Ok(stats);
            }
        }

        let stats = EngineStats {
            entities: self.storage.count_entities(tenant_id)?,
            links: self.storage.count_links(tenant_id)?,
            messages: self.storage.count_messages(tenant_id)?,
        };

        if let Ok(serialized) = serde_json::to_string(&stats) {
            self.cache.put(tenant_id, cache_key, serialized, self.config.stats_cache_ttl);
        }
        Ok(stats)
    }

    /// Whether the storage pool can currently hand out a connection.
    pub fn is_healthy(&self) -> bool {
        self.storage.is_healthy()
    }

    /// Storage pool sizing/utilization snapshot (spec §4.1 C1).
    pub fn pool_stats(&self) -> crate::storage::PoolStats {
        self.storage.get_stats()
    }

    /// Storage backend identifier (e.g. `"sqlite"`).
    pub fn backend_info(&self) -> &'static str {
        self.storage.get_backend_info()
    }

    /// Snapshots a tenant's concepts, messages, links, and compounds (spec §6).
    pub fn export(&self, tenant_id: &str) -> Result<ExportBundle> {
        export::export_tenant(&self.storage, tenant_id)
    }

    /// Replays a previously exported bundle into `tenant_id`, idempotently.
    pub fn import(&self, tenant_id: &str, bundle: &ExportBundle) -> Result<ImportSummary> {
        export::import_tenant(&self.storage, tenant_id, bundle)
    }
}

/// Tenant-scoped row counts (spec §6 `GET /v1/stats`).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub entities: i64,
    pub links: i64,
    pub messages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MemoryEngine {
        MemoryEngine::open_in_memory(Config::default()).unwrap()
    }

    #[test]
    fn learn_extracts_concepts_and_links_them() {
        let engine = engine();
        let outcome = engine
            .learn("t1", "I am learning Rust and Cargo today", "I decided to use Cargo for builds", "s1")
            .unwrap();
        assert!(!outcome.concepts.is_empty());
    }

    #[test]
    fn case_variant_concepts_do_not_produce_a_self_link() {
        let engine = engine();
        // "Rust" and "RUST" differ only in case; they must collapse to one
        // concept rather than surviving as two entries that `touch` would
        // then reject as a self-link (spec §3).
        let outcome = engine.learn("t1", "Rust is great, RUST is great", "Rust and RUST are the same thing", "s1").unwrap();
        let lower: Vec<String> = outcome.concepts.iter().map(|c| c.to_lowercase()).collect();
        let mut deduped = lower.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(lower.len(), deduped.len());
    }

    #[test]
    fn second_identical_learn_creates_no_new_links() {
        let engine = engine();
        let first = engine.learn("t1", "I am learning Rust and Cargo today", "noted", "s1").unwrap();
        assert!(first.links_created > 0);
        let second = engine.learn("t1", "I am learning Rust and Cargo today", "noted", "s2").unwrap();
        assert_eq!(second.links_created, 0);
    }

    #[test]
    fn dream_returns_a_synthesized_insight() {
        let engine = engine();
        engine.learn("t1", "Rust pairs well with Cargo", "noted", "s1").unwrap();
        let journey = engine.dream("t1", "Rust", 2, None).unwrap();
        assert!(!journey.insight.is_empty());
    }

    #[test]
    fn recall_returns_learned_entities() {
        let engine = engine();
        engine.learn("t1", "Tell me about Rust", "Rust is a systems language", "s1").unwrap();
        let hits = engine.recall("t1", "Rust", 10, false).unwrap();
        assert!(hits.iter().any(|h| h.ranked.entity.name.eq_ignore_ascii_case("Rust")));
    }

    #[test]
    fn recall_cache_hits_on_repeat_query() {
        let engine = engine();
        engine.learn("t1", "Tell me about Rust", "Rust is a systems language", "s1").unwrap();
        let first = engine.recall("t1", "Rust", 10, false).unwrap();
        let second = engine.recall("t1", "Rust", 10, false).unwrap();
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn intentions_round_trip_through_completion() {
        let engine = engine();
        let intention = engine.add_intention("t1", "ship recall cache", None, 5, None).unwrap();
        engine.complete_intention("t1", intention.id).unwrap();
        let pending = engine.list_intentions("t1", Some(IntentionStatus::Pending)).unwrap();
        assert!(pending.is_empty());
    }

    #[test]
    fn export_round_trips_into_a_fresh_tenant() {
        let engine = engine();
        engine.learn("t1", "Tell me about Rust", "Rust is great", "s1").unwrap();
        let bundle = engine.export("t1").unwrap();
        assert!(!bundle.concepts.is_empty());

        let target = engine();
        let summary = target.import("t2", &bundle).unwrap();
        assert_eq!(summary.concepts_imported, bundle.concepts.len());
        assert_eq!(target.stats("t2").unwrap().entities, bundle.concepts.len() as i64);
    }

    #[test]
    fn stats_are_cached_until_invalidated() {
        let engine = engine();
        engine.learn("t1", "Tell me about Rust", "Rust is great", "s1").unwrap();
        let first = engine.stats("t1").unwrap();
        assert_eq!(first.messages, 1);

        // A second learn invalidates the tenant's cache, so stats reflect it.
        engine.learn("t1", "Tell me about Cargo", "Cargo is great", "s2").unwrap();
        let second = engine.stats("t1").unwrap();
        assert_eq!(second.messages, 2);
    }

    #[test]
    fn snapshots_capture_growth() {
        let engine = engine();
        let before = engine.take_snapshot("t1").unwrap();
        engine.learn("t1", "Tell me about Rust", "Rust is great", "s1").unwrap();
        let after = engine.take_snapshot("t1").unwrap();
        let diff = engine.compare_snapshots(&before, &after).unwrap();
        assert!(diff["entities"].as_i64().unwrap() > 0);
    }
}
