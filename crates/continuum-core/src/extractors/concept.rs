//! Concept extraction (spec §4.2) — a pure function over text, no I/O.

use std::collections::HashSet;

use regex::Regex;
use std::sync::LazyLock;

const STOPWORDS: &[&str] = &[
    "The", "This", "That", "These", "Those", "When", "Where", "What", "How", "Why",
];

static CAPITALIZED_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("static regex is valid")
});
static QUOTED_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("static regex is valid"));
static CAMEL_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-z]+(?:[A-Z][a-z0-9]*){2,}\b|\b[A-Z][a-z0-9]*(?:[A-Z][a-z0-9]*){1,}\b")
        .expect("static regex is valid")
});
static SNAKE_CASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z][a-z0-9]*(?:_[a-z0-9]+)+\b").expect("static regex is valid"));

/// Extracts concept names from free text.
///
/// Recognizes capitalized phrases, quoted terms, CamelCase and snake_case
/// technical terms, plus any caller-supplied custom patterns. Dedup is
/// case-insensitive; the first-seen casing of a name is what's kept.
#[derive(Debug, Clone, Default)]
pub struct ConceptExtractor {
    custom_patterns: Vec<Regex>,
}

impl ConceptExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a custom extraction pattern. Matches contribute candidate concept
    /// names alongside the built-in capitalized/quoted/technical-term rules.
    pub fn with_custom_pattern(mut self, pattern: Regex) -> Self {
        self.custom_patterns.push(pattern);
        self
    }

    /// Extract concept names, deduped case-insensitively, first-seen casing
    /// preserved, stopwords and length-<=2 candidates dropped.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut seen_lower: HashSet<String> = HashSet::new();
        let mut out: Vec<String> = Vec::new();

        let mut push = |candidate: &str| {
            let trimmed = candidate.trim();
            if trimmed.len() <= 2 {
                return;
            }
            if STOPWORDS.iter().any(|s| s.eq_ignore_ascii_case(trimmed)) {
                return;
            }
            let lower = trimmed.to_ascii_lowercase();
            if seen_lower.insert(lower) {
                out.push(trimmed.to_string());
            }
        };

        for m in CAPITALIZED_PHRASE.find_iter(text) {
            push(m.as_str());
        }
        for cap in QUOTED_TERM.captures_iter(text) {
            if let Some(m) = cap.get(1) {
                push(m.as_str());
            }
        }
        for m in CAMEL_CASE.find_iter(text) {
            push(m.as_str());
        }
        for m in SNAKE_CASE.find_iter(text) {
            push(m.as_str());
        }
        for pattern in &self.custom_patterns {
            for m in pattern.find_iter(text) {
                push(m.as_str());
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_capitalized_phrase() {
        let ex = ConceptExtractor::new();
        let found = ex.extract("Python is a programming language created by Guido van Rossum.");
        assert!(found.iter().any(|c| c == "Python"));
        assert!(found.iter().any(|c| c.contains("Guido")));
    }

    #[test]
    fn extracts_quoted_term() {
        let ex = ConceptExtractor::new();
        let found = ex.extract(r#"The secret is "ALPHA" today."#);
        assert!(found.iter().any(|c| c == "ALPHA"));
    }

    #[test]
    fn extracts_camel_and_snake_case() {
        let ex = ConceptExtractor::new();
        let found = ex.extract("We call memory_engine.process_turn from the EventLoopHandler.");
        assert!(found.iter().any(|c| c == "memory_engine"));
        assert!(found.iter().any(|c| c == "process_turn"));
        assert!(found.iter().any(|c| c == "EventLoopHandler"));
    }

    #[test]
    fn drops_stopwords_and_short_tokens() {
        let ex = ConceptExtractor::new();
        let found = ex.extract("The This That How Why Ok No");
        assert!(found.is_empty());
    }

    #[test]
    fn dedups_case_insensitively_preserving_first_casing() {
        let ex = ConceptExtractor::new();
        let found = ex.extract(r#""Python" and "python" are the same concept."#);
        assert_eq!(found.iter().filter(|c| c.eq_ignore_ascii_case("python")).count(), 1);
        assert_eq!(found[0], "Python");
    }

    #[test]
    fn custom_pattern_contributes_candidates() {
        let ex = ConceptExtractor::new()
            .with_custom_pattern(Regex::new(r"#\w+").unwrap());
        let found = ex.extract("Tag this with #continuum please");
        assert!(found.iter().any(|c| c == "#continuum"));
    }
}
