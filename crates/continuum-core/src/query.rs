//! Recall ranking (spec §4.4): fuses lexical, attention-graph, and vector
//! signals with Reciprocal Rank Fusion, then assembles a context string.

use std::collections::HashMap;

use crate::embeddings::{cosine_similarity, EmbeddingProvider};
use crate::entities::Entity;
use crate::error::Result;
use crate::extractors::ConceptExtractor;
use crate::graph::AttentionGraphEngine;
use crate::storage::Storage;

/// RRF fusion constant. The teacher's hybrid search uses the same default;
/// it dampens the effect of the very top rank without needing per-corpus
/// tuning.
const RRF_K: f32 = 60.0;

/// A single ranked recall hit: an entity and why it surfaced.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntity {
    pub entity: Entity,
    pub score: f32,
    pub matched_lexically: bool,
    pub matched_via_graph: bool,
    pub matched_via_vector: bool,
}

/// Combines keyword-ranked, graph-expanded, and vector-ranked result lists
/// into one ordered list via Reciprocal Rank Fusion.
pub fn reciprocal_rank_fusion(result_lists: &[Vec<String>]) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f32> = HashMap::new();
    for list in result_lists {
        for (rank, key) in list.iter().enumerate() {
            *scores.entry(key.clone()).or_default() += 1.0 / (RRF_K + rank as f32);
        }
    }
    let mut ranked: Vec<(String, f32)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Fuses the three retrieval legs and assembles recall context.
pub struct QueryEngine {
    storage: Storage,
    graph: AttentionGraphEngine,
    embedder: Box<dyn EmbeddingProvider>,
    concept_extractor: ConceptExtractor,
    /// Multiplier applied to `limit` when capping the graph-expanded
    /// candidate set, so RRF fusion (not the graph leg itself) narrows the
    /// final result down to `limit` (spec §4.4 step 5).
    expansion_factor: usize,
}

impl QueryEngine {
    pub fn new(storage: Storage, graph: AttentionGraphEngine, embedder: Box<dyn EmbeddingProvider>, expansion_factor: usize) -> Self {
        Self { storage, graph, embedder, concept_extractor: ConceptExtractor::new(), expansion_factor }
    }

    /// Ranked entity recall for `query`, expanding through the attention
    /// graph from any concept named in the query before fusing with lexical
    /// and vector legs.
    pub fn recall_entities(&self, tenant_id: &str, query: &str, limit: i64) -> Result<Vec<RankedEntity>> {
        let lexical_names = self.lexical_leg(tenant_id, query, limit)?;
        let graph_names = self.graph_leg(tenant_id, query, limit)?;
        let vector_names = self.vector_leg(tenant_id, query, limit)?;

        let fused = reciprocal_rank_fusion(&[lexical_names.clone(), graph_names.clone(), vector_names.clone()]);

        let mut hits = Vec::new();
        for (name, score) in fused.into_iter().take(limit.max(0) as usize) {
            let Some(entity) = self.storage.get_entity(tenant_id, &name)? else { continue };
            hits.push(RankedEntity {
                entity,
                score,
                matched_lexically: lexical_names.iter().any(|n| n.eq_ignore_ascii_case(&name)),
                matched_via_graph: graph_names.iter().any(|n| n.eq_ignore_ascii_case(&name)),
                matched_via_vector: vector_names.iter().any(|n| n.eq_ignore_ascii_case(&name)),
            });
        }
        Ok(hits)
    }

    /// Entity names whose lowercase form appears as a substring of the
    /// query, ranked by name length (longer, more specific matches first).
    fn lexical_leg(&self, tenant_id: &str, query: &str, limit: i64) -> Result<Vec<String>> {
        let query_lower = query.to_lowercase();
        let mut candidates = self.storage.list_entities(tenant_id, None, limit.max(50), 0)?;
        candidates.retain(|e| query_lower.contains(&e.name.to_lowercase()));
        candidates.sort_by_key(|e| std::cmp::Reverse(e.name.len()));
        Ok(candidates.into_iter().map(|e| e.name).collect())
    }

    /// Concepts named in the query, expanded one hop through the attention
    /// graph, capped at `limit * expansion_factor` candidates — wider than
    /// the final result so RRF fusion has room to rank across legs before
    /// `recall_entities` narrows back down to `limit` (spec §4.4 step 5).
    fn graph_leg(&self, tenant_id: &str, query: &str, limit: i64) -> Result<Vec<String>> {
        let seeds = self.concept_extractor.extract(query);
        let mut expanded: Vec<(String, f64)> = Vec::new();
        for seed in &seeds {
            expanded.push((seed.clone(), 1.0));
            for (neighbor, strength) in self.graph.neighbors(tenant_id, seed)? {
                expanded.push((neighbor, strength));
            }
        }
        expanded.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let cap = limit.saturating_mul(self.expansion_factor as i64);
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for (name, _) in expanded {
            let lower = name.to_lowercase();
            if seen.insert(lower) {
                out.push(name);
            }
            if out.len() as i64 >= cap {
                break;
            }
        }
        Ok(out)
    }

    /// Cosine-similarity ranking of every entity's name embedding against
    /// the query embedding. Quadratic in entity count; acceptable at the
    /// per-tenant scale this engine targets (no ANN index, spec Non-goals).
    fn vector_leg(&self, tenant_id: &str, query: &str, limit: i64) -> Result<Vec<String>> {
        let Ok(query_vec) = self.embedder.embed(query) else { return Ok(Vec::new()) };
        let entities = self.storage.list_entities(tenant_id, None, 500, 0)?;
        let mut scored: Vec<(String, f32)> = Vec::new();
        for entity in entities {
            let Ok(entity_vec) = self.embedder.embed(&entity.name) else { continue };
            scored.push((entity.name, cosine_similarity(&query_vec, &entity_vec)));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(limit.max(0) as usize).map(|(n, _)| n).collect())
    }

    /// Builds a human-readable context block from ranked hits, the shape
    /// fed back to the caller as the "context string" in spec §4.4 step 7.
    pub fn assemble_context(&self, hits: &[RankedEntity]) -> String {
        if hits.is_empty() {
            return String::new();
        }
        let mut out = String::from("Relevant context:\n");
        for hit in hits {
            out.push_str(&format!("- {} ({})\n", hit.entity.name, hit.entity.entity_type));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::embeddings::HashingEmbeddingProvider;
    use crate::entities::{EntityType, LinkType};

    fn engine() -> QueryEngine {
        let config = Config::default();
        let expansion_factor = config.expansion_factor;
        let storage = Storage::open_in_memory(&config).unwrap();
        let graph = AttentionGraphEngine::new(storage.clone(), config);
        QueryEngine::new(storage, graph, Box::new(HashingEmbeddingProvider::new()), expansion_factor)
    }

    #[test]
    fn rrf_rewards_items_in_multiple_lists() {
        let fused = reciprocal_rank_fusion(&[
            vec!["a".to_string(), "b".to_string()],
            vec!["b".to_string(), "c".to_string()],
        ]);
        assert_eq!(fused[0].0, "b");
    }

    #[test]
    fn recall_finds_lexically_matching_entity() {
        let engine = engine();
        engine.storage.upsert_entity("t1", "Rust", EntityType::Concept, None).unwrap();
        let hits = engine.recall_entities("t1", "tell me about Rust", 10).unwrap();
        assert!(hits.iter().any(|h| h.entity.name == "Rust" && h.matched_lexically));
    }

    #[test]
    fn recall_expands_through_graph_neighbors() {
        let engine = engine();
        engine.storage.upsert_entity("t1", "Rust", EntityType::Concept, None).unwrap();
        engine.storage.upsert_entity("t1", "Cargo", EntityType::Concept, None).unwrap();
        engine.graph.touch("t1", "Rust", "Cargo", LinkType::CoOccurrence).unwrap();
        let hits = engine.recall_entities("t1", "Rust", 10).unwrap();
        assert!(hits.iter().any(|h| h.entity.name == "Cargo" && h.matched_via_graph));
    }

    #[test]
    fn assemble_context_is_empty_for_no_hits() {
        let engine = engine();
        assert_eq!(engine.assemble_context(&[]), "");
    }
}
