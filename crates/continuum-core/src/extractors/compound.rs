//! Compound concept detection (spec §4.2 / §4.3).

/// Builds a deterministic compound name from a set of co-occurring concepts.
#[derive(Debug, Clone, Default)]
pub struct CompoundExtractor;

/// Maximum number of component concepts folded into a compound name.
pub const MAX_COMPONENTS: usize = 3;

impl CompoundExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Returns `None` when fewer than two concepts are present. Otherwise
    /// sorts ascending, takes up to [`MAX_COMPONENTS`], and joins with
    /// `" + "`.
    pub fn detect(&self, concepts: &[String]) -> Option<(String, Vec<String>)> {
        if concepts.len() < 2 {
            return None;
        }
        let mut sorted: Vec<String> = concepts.to_vec();
        sorted.sort();
        sorted.dedup();
        if sorted.len() < 2 {
            return None;
        }
        let components: Vec<String> = sorted.into_iter().take(MAX_COMPONENTS).collect();
        let name = components.join(" + ");
        Some((name, components))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_concept_yields_none() {
        let ex = CompoundExtractor::new();
        assert!(ex.detect(&["Python".to_string()]).is_none());
    }

    #[test]
    fn two_concepts_join_sorted() {
        let ex = CompoundExtractor::new();
        let (name, components) = ex
            .detect(&["Python".to_string(), "Guido".to_string()])
            .unwrap();
        assert_eq!(name, "Guido + Python");
        assert_eq!(components, vec!["Guido".to_string(), "Python".to_string()]);
    }

    #[test]
    fn caps_at_three_components() {
        let ex = CompoundExtractor::new();
        let concepts = vec![
            "Delta".to_string(),
            "Alpha".to_string(),
            "Charlie".to_string(),
            "Bravo".to_string(),
        ];
        let (name, components) = ex.detect(&concepts).unwrap();
        assert_eq!(components.len(), 3);
        assert_eq!(name, "Alpha + Bravo + Charlie");
    }
}
