//! Engine configuration (spec §9 "Module-level mutable configuration").
//!
//! An explicit value threaded through every constructor instead of a
//! global/lazily-initialized singleton. `Config::from_env()` reads the
//! environment variables enumerated in spec §6; everything else has a
//! sensible default and can be overridden directly on the struct (tests use
//! this to dial decay/hebbian constants to something observable in a single
//! tick).

use std::path::PathBuf;
use std::time::Duration;

/// Engine-wide tunables. Threaded through `Storage`, `AttentionGraphEngine`,
/// `QueryEngine`, `Cache`, and `MemoryEngine` constructors.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the relational store lives. `None` = platform default data dir.
    pub db_path: Option<PathBuf>,
    /// Tenant used when a caller does not specify one explicitly.
    pub default_tenant_id: String,

    // ---- Attention graph (§4.3) ----
    /// Multiplicative per-day decay applied before every touch.
    pub decay_factor: f64,
    /// Additive Hebbian reinforcement applied on every touch.
    pub hebbian_rate: f64,
    /// Strength assigned to a newly created edge.
    pub min_link_strength: f64,
    /// Pruning threshold: edges decayed below this are deleted.
    pub link_min_strength_before_prune: f64,
    /// Minimum effective strength for an edge to participate in recall
    /// expansion (§4.4 step 5).
    pub min_expansion_strength: f64,
    /// Recall entity-set cap multiplier relative to `max_concepts`.
    pub expansion_factor: usize,
    /// Softmax sharpness for the dream-mode walk: `weight = strength^(1/
    /// max(temperature, 0.1))`. Lower sharpens toward the strongest edges,
    /// higher flattens toward uniform exploration.
    pub dream_temperature: f64,

    // ---- Cache (§4.5) ----
    pub cache_enabled: bool,
    pub cache_host: String,
    pub cache_port: u16,
    pub cache_password: Option<String>,
    pub search_cache_ttl: Duration,
    pub stats_cache_ttl: Duration,
    pub cache_capacity: usize,

    // ---- Storage pool (§4.1) ----
    pub pool_max_size: u32,
    pub pool_connect_timeout: Duration,

    // ---- Embedding / neural predictor (§4.7) ----
    /// When set, co-occurrence edges are recorded as [`crate::entities::LinkType::Neural`]
    /// instead of `CoOccurrence`, mirroring the original system's Hebbian-vs-neural
    /// attention mode switch.
    pub neural_attention: bool,
    pub neural_model_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            default_tenant_id: "default".to_string(),

            decay_factor: 0.995,
            hebbian_rate: 0.1,
            min_link_strength: 0.3,
            link_min_strength_before_prune: 0.05,
            min_expansion_strength: 0.2,
            expansion_factor: 3,
            dream_temperature: 0.7,

            cache_enabled: true,
            cache_host: "127.0.0.1".to_string(),
            cache_port: 6379,
            cache_password: None,
            search_cache_ttl: Duration::from_secs(300),
            stats_cache_ttl: Duration::from_secs(60),
            cache_capacity: 10_000,

            pool_max_size: 16,
            pool_connect_timeout: Duration::from_secs(5),

            neural_attention: false,
            neural_model_path: None,
        }
    }
}

impl Config {
    /// Build a config from the environment variables enumerated in spec §6.
    /// Any variable that is unset or unparseable keeps its default.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(path) = std::env::var("DB_PATH") {
            cfg.db_path = Some(PathBuf::from(path));
        }
        if let Ok(tenant) = std::env::var("TENANT_ID") {
            cfg.default_tenant_id = tenant;
        }
        if let Ok(v) = std::env::var("CACHE_ENABLED") {
            cfg.cache_enabled = parse_bool(&v, cfg.cache_enabled);
        }
        if let Ok(v) = std::env::var("CACHE_HOST") {
            cfg.cache_host = v;
        }
        if let Ok(v) = std::env::var("CACHE_PORT") {
            if let Ok(port) = v.parse() {
                cfg.cache_port = port;
            }
        }
        if let Ok(v) = std::env::var("CACHE_PASSWORD") {
            cfg.cache_password = Some(v);
        }
        if let Ok(v) = std::env::var("NEURAL_ATTENTION") {
            cfg.neural_attention = parse_bool(&v, cfg.neural_attention);
        }
        if let Ok(v) = std::env::var("NEURAL_MODEL_PATH") {
            cfg.neural_model_path = Some(PathBuf::from(v));
        }

        cfg
    }
}

fn parse_bool(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_typicals() {
        let cfg = Config::default();
        assert_eq!(cfg.decay_factor, 0.995);
        assert_eq!(cfg.hebbian_rate, 0.1);
        assert_eq!(cfg.min_link_strength, 0.3);
        assert_eq!(cfg.link_min_strength_before_prune, 0.05);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("true", false));
        assert!(parse_bool("1", false));
        assert!(!parse_bool("false", true));
        assert!(!parse_bool("0", true));
        assert!(parse_bool("garbage", true));
    }
}
