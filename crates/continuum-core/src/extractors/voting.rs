//! Ensemble concept voting (spec §9 Design Notes).
//!
//! Abstracts concept extraction behind a [`ConceptSource`] trait so a
//! neural or LLM-assisted extractor can be added later without touching the
//! orchestrator (`MemoryEngine::learn`). The only built-in source today is
//! the regex [`ConceptExtractor`]; the voter still runs so the code path a
//! second source would exercise is already load-bearing.

use std::collections::HashMap;

use super::concept::ConceptExtractor;

/// A pluggable concept source. Implementors return raw candidate names for
/// a piece of text; the voter handles aggregation and confidence scoring.
pub trait ConceptSource {
    /// Stable identifier used in `ConceptVote::sources`.
    fn name(&self) -> &'static str;
    /// Candidate concept names found in `text`.
    fn propose(&self, text: &str) -> Vec<String>;
}

/// Adapts the regex [`ConceptExtractor`] to the [`ConceptSource`] trait.
pub struct RegexSource(pub ConceptExtractor);

impl ConceptSource for RegexSource {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn propose(&self, text: &str) -> Vec<String> {
        self.0.extract(text)
    }
}

/// How multiple [`ConceptSource`]s are combined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VotingStrategy {
    /// Keep a concept if any source proposed it.
    Union,
    /// Keep a concept only if every source proposed it.
    Intersection,
    /// Keep a concept if its weighted-agreement score clears
    /// `confidence_threshold`.
    Weighted,
}

/// Parameters for [`ConceptVoter`].
#[derive(Debug, Clone)]
pub struct VoterConfig {
    pub strategy: VotingStrategy,
    /// Per-source weight used only by [`VotingStrategy::Weighted`]; sources
    /// not listed default to weight `1.0`.
    pub weights: HashMap<&'static str, f32>,
    pub min_agreement_count: usize,
    pub confidence_threshold: f32,
}

impl Default for VoterConfig {
    fn default() -> Self {
        Self {
            strategy: VotingStrategy::Union,
            weights: HashMap::new(),
            min_agreement_count: 1,
            confidence_threshold: 0.5,
        }
    }
}

/// A concept surfaced by one or more [`ConceptSource`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptVote {
    pub concept: String,
    pub confidence: f32,
    pub sources: Vec<&'static str>,
    pub agreement_count: usize,
}

/// Combines candidates from multiple [`ConceptSource`]s into a single
/// ranked, deduped vote list.
pub struct ConceptVoter {
    sources: Vec<Box<dyn ConceptSource>>,
    config: VoterConfig,
}

impl ConceptVoter {
    pub fn new(sources: Vec<Box<dyn ConceptSource>>, config: VoterConfig) -> Self {
        Self { sources, config }
    }

    /// Run every source over `text` and fold the results per `config`.
    pub fn vote(&self, text: &str) -> Vec<ConceptVote> {
        let total_sources = self.sources.len().max(1);
        let mut tally: HashMap<String, (f32, Vec<&'static str>)> = HashMap::new();

        for source in &self.sources {
            let weight = self
                .config
                .weights
                .get(source.name())
                .copied()
                .unwrap_or(1.0);
            for concept in source.propose(text) {
                let entry = tally
                    .entry(concept)
                    .or_insert_with(|| (0.0, Vec::new()));
                entry.0 += weight;
                if !entry.1.contains(&source.name()) {
                    entry.1.push(source.name());
                }
            }
        }

        let mut votes: Vec<ConceptVote> = tally
            .into_iter()
            .map(|(concept, (score, sources))| {
                let agreement_count = sources.len();
                let confidence = (score / total_sources as f32).min(1.0);
                ConceptVote { concept, confidence, sources, agreement_count }
            })
            .collect();

        votes.retain(|v| match self.config.strategy {
            VotingStrategy::Union => v.agreement_count >= 1,
            VotingStrategy::Intersection => v.agreement_count == total_sources,
            VotingStrategy::Weighted => {
                v.agreement_count >= self.config.min_agreement_count
                    && v.confidence >= self.config.confidence_threshold
            }
        });

        votes.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        votes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(&'static str, Vec<&'static str>);
    impl ConceptSource for FixedSource {
        fn name(&self) -> &'static str {
            self.0
        }
        fn propose(&self, _text: &str) -> Vec<String> {
            self.1.iter().map(|s| s.to_string()).collect()
        }
    }

    #[test]
    fn union_keeps_everything_any_source_found() {
        let voter = ConceptVoter::new(
            vec![
                Box::new(FixedSource("a", vec!["Python"])),
                Box::new(FixedSource("b", vec!["Rust"])),
            ],
            VoterConfig { strategy: VotingStrategy::Union, ..Default::default() },
        );
        let votes = voter.vote("irrelevant");
        let names: Vec<_> = votes.iter().map(|v| v.concept.clone()).collect();
        assert!(names.contains(&"Python".to_string()));
        assert!(names.contains(&"Rust".to_string()));
    }

    #[test]
    fn intersection_keeps_only_shared_concepts() {
        let voter = ConceptVoter::new(
            vec![
                Box::new(FixedSource("a", vec!["Python", "Rust"])),
                Box::new(FixedSource("b", vec!["Rust"])),
            ],
            VoterConfig { strategy: VotingStrategy::Intersection, ..Default::default() },
        );
        let votes = voter.vote("irrelevant");
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].concept, "Rust");
        assert_eq!(votes[0].agreement_count, 2);
    }

    #[test]
    fn weighted_respects_confidence_threshold() {
        let mut weights = HashMap::new();
        weights.insert("a", 2.0);
        weights.insert("b", 0.1);
        let voter = ConceptVoter::new(
            vec![
                Box::new(FixedSource("a", vec!["Python"])),
                Box::new(FixedSource("b", vec!["Rust"])),
            ],
            VoterConfig {
                strategy: VotingStrategy::Weighted,
                weights,
                min_agreement_count: 1,
                confidence_threshold: 0.5,
            },
        );
        let votes = voter.vote("irrelevant");
        let names: Vec<_> = votes.iter().map(|v| v.concept.clone()).collect();
        assert!(names.contains(&"Python".to_string()));
        assert!(!names.contains(&"Rust".to_string()));
    }
}
