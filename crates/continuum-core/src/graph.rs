//! The attention graph (spec §4.3): co-occurrence/Hebbian edges between
//! concepts, decayed on every touch and prunable below a floor strength.
//! Dream mode performs a weighted random walk over the graph, mirroring the
//! teacher's sleep-inspired consolidation without requiring embeddings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;

use crate::config::Config;
use crate::entities::{AttentionLink, LinkType};
use crate::error::{ContinuumError, Result};
use crate::storage::Storage;

/// A single step of a dream-mode associative walk.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamStep {
    pub concept: String,
    pub via_link_strength: f64,
}

/// Outcome of a single [`AttentionGraphEngine::touch`] call: whether the
/// edge was created just now or already existed and was reinforced. Spec
/// §4.4 step 8 requires `links_created` to count only the former.
pub struct TouchOutcome {
    pub link: AttentionLink,
    pub created: bool,
}

/// Full result of a dream-mode walk (spec §4.3): the path taken plus the
/// bookkeeping a caller synthesizes into a human-readable insight.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamJourney {
    pub steps: Vec<DreamStep>,
    /// Edges followed whose effective strength was below `min_link_strength`
    /// — recently formed or weakly reinforced associations.
    pub weak_links_followed: usize,
    /// Random jumps that reconnected to a concept already adjacent to
    /// something previously visited in this walk.
    pub cycles: usize,
    /// Steps where every neighbor of the current concept had already been
    /// visited, forcing a random jump.
    pub dead_ends: usize,
    /// Concepts reached only via a random jump rather than by following an
    /// edge from the current concept.
    pub discoveries: Vec<String>,
    pub insight: String,
}

/// Owns edge touch/decay/prune and the dream-mode random walk. Holds a
/// per-`(tenant, sorted pair)` lock table so two concurrent touches of the
/// same edge serialize instead of racing on a read-modify-write of
/// `strength` (spec §5 concurrency correctness).
#[derive(Clone)]
pub struct AttentionGraphEngine {
    storage: Storage,
    config: Config,
    pair_locks: Arc<DashMap<String, Arc<std::sync::Mutex<()>>>>,
}

impl AttentionGraphEngine {
    pub fn new(storage: Storage, config: Config) -> Self {
        Self { storage, config, pair_locks: Arc::new(DashMap::new()) }
    }

    fn lock_key(tenant_id: &str, concept_a: &str, concept_b: &str) -> String {
        let mut pair = [concept_a.to_lowercase(), concept_b.to_lowercase()];
        pair.sort();
        format!("{tenant_id}:{}:{}", pair[0], pair[1])
    }

    fn pair_lock(&self, key: &str) -> Arc<std::sync::Mutex<()>> {
        self.pair_locks.entry(key.to_string()).or_insert_with(|| Arc::new(std::sync::Mutex::new(()))).clone()
    }

    /// Creates the edge if absent at `Config::min_link_strength`, otherwise
    /// applies exponential decay for elapsed days followed by Hebbian
    /// reinforcement: `s' = min(1, decay(s) + hebbian_rate)`. Rejects
    /// self-links: `concept_a`/`concept_b` compared case-insensitively must
    /// differ (spec §3 "Self-links (A=B) are forbidden").
    pub fn touch(&self, tenant_id: &str, concept_a: &str, concept_b: &str, link_type: LinkType) -> Result<TouchOutcome> {
        if concept_a.eq_ignore_ascii_case(concept_b) {
            return Err(ContinuumError::InvariantViolation(format!("self-link rejected for concept {concept_a:?}")));
        }

        let key = Self::lock_key(tenant_id, concept_a, concept_b);
        let lock = self.pair_lock(&key);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        match self.storage.get_link(tenant_id, concept_a, concept_b)? {
            Some(existing) => {
                let decayed = decay(existing.strength, existing.last_accessed, Utc::now(), self.config.decay_factor);
                let reinforced = (decayed + self.config.hebbian_rate).min(1.0);
                self.storage.update_link_strength(existing.id, reinforced, Utc::now())?;
                Ok(TouchOutcome { link: AttentionLink { strength: reinforced, last_accessed: Utc::now(), ..existing }, created: false })
            }
            None => {
                let link = self.storage.insert_link(tenant_id, concept_a, concept_b, link_type, self.config.min_link_strength)?;
                Ok(TouchOutcome { link, created: true })
            }
        }
    }

    /// Records every pairwise co-occurrence among `concepts` observed within
    /// a single turn (spec §4.3: concepts appearing together are linked).
    /// `concepts` is assumed already deduplicated case-insensitively by the
    /// caller, so no two entries here collide under `touch`'s self-link
    /// guard. Edges are recorded as [`LinkType::Neural`] rather than
    /// [`LinkType::CoOccurrence`] when `Config::neural_attention` is set
    /// (spec §4.7's Hebbian-vs-neural attention mode switch).
    pub fn touch_co_occurring(&self, tenant_id: &str, concepts: &[String]) -> Result<Vec<TouchOutcome>> {
        let link_type = if self.config.neural_attention { LinkType::Neural } else { LinkType::CoOccurrence };
        let mut touched = Vec::new();
        for i in 0..concepts.len() {
            for j in (i + 1)..concepts.len() {
                touched.push(self.touch(tenant_id, &concepts[i], &concepts[j], link_type)?);
            }
        }
        Ok(touched)
    }

    /// Deletes every edge whose strength, decayed to "now", falls at or
    /// below `Config::link_min_strength_before_prune`. Returns the count
    /// removed.
    pub fn prune(&self, tenant_id: &str) -> Result<usize> {
        let links = self.storage.list_all_links(tenant_id)?;
        let now = Utc::now();
        for link in &links {
            let decayed = decay(link.strength, link.last_accessed, now, self.config.decay_factor);
            if (decayed - link.strength).abs() > f64::EPSILON {
                self.storage.update_link_strength(link.id, decayed, link.last_accessed)?;
            }
        }
        self.storage.prune_links_below(tenant_id, self.config.link_min_strength_before_prune)
    }

    /// Neighbors of `concept` with effective (decayed) strength at or above
    /// `Config::min_expansion_strength`, used by recall expansion (§4.4 step
    /// 5) and the dream walk.
    pub fn neighbors(&self, tenant_id: &str, concept: &str) -> Result<Vec<(String, f64)>> {
        let links = self.storage.list_links_for_concept(tenant_id, concept, 0.0)?;
        let now = Utc::now();
        let lower = concept.to_lowercase();
        let mut out = Vec::new();
        for link in links {
            let decayed = decay(link.strength, link.last_accessed, now, self.config.decay_factor);
            if decayed < self.config.min_expansion_strength {
                continue;
            }
            let other = if link.concept_a.to_lowercase() == lower { link.concept_b } else { link.concept_a };
            out.push((other, decayed));
        }
        out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(out)
    }

    /// Weighted random walk starting at `seed` (spec §4.3 dream mode).
    /// At each step, neighbors already visited are excluded and the
    /// remaining candidates are sampled with `weight = strength^(1/
    /// max(temperature, 0.1))` — lower temperature sharpens the walk toward
    /// the strongest edges, higher temperature flattens it toward uniform
    /// exploration. On a dead end (no unvisited neighbor), the walk jumps to
    /// a random unvisited concept in the tenant rather than stopping.
    pub fn dream_walk(&self, tenant_id: &str, seed: &str, steps: usize, temperature: f64) -> Result<DreamJourney> {
        let exponent = 1.0 / temperature.max(0.1);
        let mut current = seed.to_string();
        let mut visited = std::collections::HashSet::new();
        visited.insert(seed.to_lowercase());
        let mut rng = rand::thread_rng();

        let mut path = Vec::with_capacity(steps);
        let mut weak_links_followed = 0;
        let mut cycles = 0;
        let mut dead_ends = 0;
        let mut discoveries = Vec::new();

        for _ in 0..steps {
            let neighbors: Vec<(String, f64)> =
                self.neighbors(tenant_id, &current)?.into_iter().filter(|(name, _)| !visited.contains(&name.to_lowercase())).collect();

            if !neighbors.is_empty() {
                let weights: Vec<f64> = neighbors.iter().map(|(_, w)| w.max(1e-6).powf(exponent)).collect();
                let Ok(dist) = WeightedIndex::new(&weights) else { break };
                let pick = dist.sample(&mut rng);
                let (next_concept, strength) = neighbors[pick].clone();
                if strength < self.config.min_link_strength {
                    weak_links_followed += 1;
                }
                visited.insert(next_concept.to_lowercase());
                path.push(DreamStep { concept: next_concept.clone(), via_link_strength: strength });
                current = next_concept;
                continue;
            }

            dead_ends += 1;
            let candidates: Vec<crate::entities::Entity> =
                self.storage.list_entities(tenant_id, None, i64::MAX, 0)?.into_iter().filter(|e| !visited.contains(&e.name.to_lowercase())).collect();
            let Some(jump) = candidates.choose(&mut rng) else { break };

            let jump_neighbors = self.neighbors(tenant_id, &jump.name)?;
            if jump_neighbors.iter().any(|(n, _)| visited.contains(&n.to_lowercase())) {
                cycles += 1;
            }

            visited.insert(jump.name.to_lowercase());
            discoveries.push(jump.name.clone());
            path.push(DreamStep { concept: jump.name.clone(), via_link_strength: 0.0 });
            current = jump.name.clone();
        }

        let insight = if discoveries.is_empty() {
            format!(
                "Starting from '{seed}', the dream followed {} steps across {} concepts, with {} weak links and {} dead ends.",
                path.len(),
                visited.len(),
                weak_links_followed,
                dead_ends
            )
        } else {
            format!(
                "Starting from '{seed}', the dream followed {} steps across {} concepts ({} weak links, {} dead ends, {} cycles). Jumped to: {}.",
                path.len(),
                visited.len(),
                weak_links_followed,
                dead_ends,
                cycles,
                discoveries.join(", ")
            )
        };

        Ok(DreamJourney { steps: path, weak_links_followed, cycles, dead_ends, discoveries, insight })
    }
}

/// Applies multiplicative per-day decay to `strength` for the elapsed time
/// between `last_accessed` and `now`.
fn decay(strength: f64, last_accessed: DateTime<Utc>, now: DateTime<Utc>, decay_factor: f64) -> f64 {
    let days = (now - last_accessed).num_seconds() as f64 / 86_400.0;
    if days <= 0.0 {
        return strength;
    }
    (strength * decay_factor.powf(days)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AttentionGraphEngine {
        AttentionGraphEngine::new(Storage::open_in_memory(&Config::default()).unwrap(), Config::default())
    }

    #[test]
    fn touch_creates_then_reinforces() {
        let engine = engine();
        let first = engine.touch("t1", "Rust", "Cargo", LinkType::CoOccurrence).unwrap();
        assert!(first.created);
        assert_eq!(first.link.strength, engine.config.min_link_strength);
        let second = engine.touch("t1", "Rust", "Cargo", LinkType::CoOccurrence).unwrap();
        assert!(!second.created);
        assert!(second.link.strength > first.link.strength);
    }

    #[test]
    fn touch_is_order_independent() {
        let engine = engine();
        engine.touch("t1", "Rust", "Cargo", LinkType::CoOccurrence).unwrap();
        let reinforced = engine.touch("t1", "Cargo", "Rust", LinkType::CoOccurrence).unwrap();
        assert!(!reinforced.created);
        assert!(reinforced.link.strength > engine.config.min_link_strength);
    }

    #[test]
    fn touch_rejects_self_link_case_insensitively() {
        let engine = engine();
        let err = engine.touch("t1", "Rust", "rust", LinkType::CoOccurrence).unwrap_err();
        assert!(matches!(err, ContinuumError::InvariantViolation(_)));
    }

    #[test]
    fn decay_reduces_strength_over_elapsed_days() {
        let now = Utc::now();
        let ten_days_ago = now - chrono::Duration::days(10);
        let decayed = decay(1.0, ten_days_ago, now, 0.9);
        assert!(decayed < 1.0);
        assert!(decayed > 0.0);
    }

    #[test]
    fn prune_removes_links_decayed_below_floor() {
        let engine = engine();
        engine.storage.insert_link("t1", "A", "B", LinkType::Hebbian, 0.06).unwrap();
        let removed = engine.prune("t1").unwrap();
        assert_eq!(removed, 0); // 0.06 is still above the 0.05 floor untouched by decay
    }

    #[test]
    fn touch_co_occurring_links_every_pair() {
        let engine = engine();
        let concepts = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let links = engine.touch_co_occurring("t1", &concepts).unwrap();
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn dream_walk_stops_when_no_neighbors() {
        let engine = engine();
        let journey = engine.dream_walk("t1", "Isolated", 5, 0.7).unwrap();
        assert!(journey.steps.is_empty());
        assert!(!journey.insight.is_empty());
    }

    #[test]
    fn dream_walk_follows_existing_edges() {
        let engine = engine();
        engine.touch("t1", "A", "B", LinkType::Hebbian).unwrap();
        let journey = engine.dream_walk("t1", "A", 1, 0.7).unwrap();
        assert_eq!(journey.steps.len(), 1);
        assert_eq!(journey.steps[0].concept, "B");
    }

    #[test]
    fn dream_walk_excludes_visited_and_jumps_on_dead_end() {
        let engine = engine();
        engine.touch("t1", "A", "B", LinkType::Hebbian).unwrap();
        engine.storage.insert_link("t1", "C", "D", LinkType::Hebbian, 0.5).unwrap();
        for name in ["A", "B", "C", "D"] {
            engine.storage.upsert_entity("t1", name, crate::entities::EntityType::Concept, None).unwrap();
        }
        let journey = engine.dream_walk("t1", "A", 3, 0.7).unwrap();
        // A -> B exhausts direct edges (B has no unvisited neighbors), so the
        // walk must jump elsewhere rather than stop after one step.
        assert!(journey.steps.len() >= 2);
        assert!(journey.dead_ends >= 1);
    }
}
