//! Decision extraction (spec §4.2) — only ever applied to assistant-role
//! text.

use regex::Regex;
use std::sync::LazyLock;

static DECISION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?mi)\bI (?:will|am going to|decided to|chose to)\s+(.+)").unwrap(),
        Regex::new(r"(?mi)\b(?:Creating|Building|Writing|Implementing)\s+(.+)").unwrap(),
        Regex::new(r"(?mi)\bMy (?:decision|choice|plan)\s+(?:is|was)\s+(.+)").unwrap(),
    ]
});

/// Extracts decision statements from assistant-role text.
#[derive(Debug, Clone)]
pub struct DecisionExtractor {
    min_length: usize,
    max_length: usize,
}

impl Default for DecisionExtractor {
    fn default() -> Self {
        Self { min_length: 10, max_length: 200 }
    }
}

impl DecisionExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bounds(mut self, min_length: usize, max_length: usize) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    /// Extract decision text from `text`. Returns an empty vec unless
    /// `is_assistant` is true, matching the spec's "only applied to
    /// assistant-role text" rule (§3 Decision, §4.2).
    pub fn extract(&self, text: &str, is_assistant: bool) -> Vec<String> {
        if !is_assistant {
            return Vec::new();
        }

        let mut out = Vec::new();
        for pattern in DECISION_PATTERNS.iter() {
            for cap in pattern.captures_iter(text) {
                let Some(m) = cap.get(1) else { continue };
                // Cut at sentence end so trailing unrelated text doesn't
                // get swept into the decision.
                let raw = m.as_str();
                let cut = raw.find(['\n', '.']).map(|i| &raw[..i]).unwrap_or(raw);
                let candidate = cut.trim().trim_end_matches('.').to_string();
                if candidate.len() >= self.min_length && candidate.len() <= self.max_length {
                    out.push(candidate);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_non_assistant_text() {
        let ex = DecisionExtractor::new();
        let out = ex.extract("I will create a new module for memory persistence.", false);
        assert!(out.is_empty());
    }

    #[test]
    fn extracts_i_will_pattern() {
        let ex = DecisionExtractor::new();
        let out = ex.extract(
            "I am going to create a new Python module for memory persistence.",
            true,
        );
        assert!(out.iter().any(|d| d.contains("create a new Python module")));
    }

    #[test]
    fn extracts_creating_pattern() {
        let ex = DecisionExtractor::new();
        let out = ex.extract("Creating a test harness for the attention graph.", true);
        assert!(out.iter().any(|d| d.contains("test harness")));
    }

    #[test]
    fn extracts_my_decision_pattern() {
        let ex = DecisionExtractor::new();
        let out = ex.extract("My plan is to ship the recall cache first.", true);
        assert!(out.iter().any(|d| d.contains("ship the recall cache first")));
    }

    #[test]
    fn rejects_candidates_outside_length_bounds() {
        let ex = DecisionExtractor::new().with_bounds(10, 20);
        let out = ex.extract("I will go.", true);
        assert!(out.is_empty());
    }
}
