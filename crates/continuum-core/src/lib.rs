//! # Continuum Core
//!
//! Per-tenant AI memory substrate. Turns raw conversational text into a
//! queryable attention graph: concepts and decisions are extracted, linked by
//! co-occurrence and Hebbian reinforcement, decayed over time, and recalled
//! through a fused lexical + graph + vector ranking.
//!
//! ## Modules
//!
//! - [`storage`] — pooled SQLite persistence, tenant-scoped CRUD
//! - [`extractors`] — pure-function concept/decision/compound extraction
//! - [`graph`] — the attention graph: touch, decay, prune, dream
//! - [`query`] — ranked recall, hybrid fusion, context assembly
//! - [`memory`] — the `MemoryEngine` façade: learn/recall/process_turn
//! - [`cache`] — tenant-namespaced cache with in-memory fallback
//! - [`embeddings`] — pluggable embedding provider contract
//! - [`federation`] — tier-gated contribution and anonymization
//! - [`concurrency`] — async adapter with pair-level locking
//! - [`export`] — tenant snapshot/restore for the CLI `export`/`import` commands
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use continuum_core::{Config, MemoryEngine};
//!
//! let engine = MemoryEngine::open(Config::default())?;
//! engine.learn("tenant-1", "I decided to use SQLite for storage", "session-1")?;
//! let hits = engine.recall("tenant-1", "storage decision", 10)?;
//! ```

pub mod cache;
pub mod concurrency;
pub mod config;
pub mod embeddings;
pub mod entities;
pub mod error;
pub mod export;
pub mod extractors;
pub mod federation;
pub mod graph;
pub mod memory;
pub mod query;
pub mod storage;

pub use cache::{Cache, InMemoryCache};
pub use concurrency::AsyncMemoryEngine;
pub use config::Config;
pub use embeddings::{EmbeddingProvider, HashingEmbeddingProvider, EMBEDDING_DIMENSIONS};
pub use entities::{
    AttentionLink, AutoMessage, AutoMessageRole, CompoundConcept, ConceptEvolutionEvent, Decision,
    Entity, EntityType, EvolutionEventType, Intention, IntentionStatus, LinkType, Message,
    ThinkingSnapshot,
};
pub use error::{ContinuumError, Result};
pub use export::{ExportBundle, ExportMetadata, ImportSummary};
pub use extractors::{
    CompoundExtractor, ConceptExtractor, ConceptSource, ConceptVote, ConceptVoter,
    DecisionExtractor, RegexSource, VoterConfig, VotingStrategy,
};
pub use federation::{AnonymizationLevel, FederationTier};
pub use graph::{AttentionGraphEngine, DreamJourney, DreamStep, TouchOutcome};
pub use memory::{EngineStats, LearnOutcome, MemoryEngine, RecallHit};
pub use query::{QueryEngine, RankedEntity};
pub use storage::{PoolStats, Storage};
