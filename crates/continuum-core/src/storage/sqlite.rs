//! Pooled SQLite storage (spec §4.1). Every query here is scoped by
//! `tenant_id`; there is no code path that reads across tenants.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use crate::config::Config;
use crate::entities::{
    AttentionLink, AutoMessage, AutoMessageRole, CompoundConcept, ConceptEvolutionEvent, Decision,
    Entity, EntityType, EvolutionEventType, Intention, IntentionStatus, LinkType, Message,
    ThinkingSnapshot,
};
use crate::error::{ContinuumError, Result};

use super::migrations::apply_migrations;

/// Connection pool introspection (spec §4.1 C1), surfaced by `continuum
/// doctor` and the `/v1/health` route.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// Connections the pool has opened since `Storage::open` (pooled + checked out).
    pub created: u32,
    /// Connections currently open and idle in the pool.
    pub current_open: u32,
    /// Configured upper bound on pool size (`Config::pool_max_size`).
    pub pool_capacity: u32,
}

/// Pooled SQLite-backed storage. Cloning is cheap: the pool is reference
/// counted, so every clone shares the same underlying connections.
#[derive(Clone)]
pub struct Storage {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl Storage {
    /// Open (creating if necessary) the database at `config.db_path`, or the
    /// platform data directory if unset.
    pub fn open(config: &Config) -> Result<Self> {
        let path = match &config.db_path {
            Some(p) => p.clone(),
            None => default_db_path()?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ContinuumError::StorageUnavailable(e.to_string()))?;
        }

        let manager = SqliteConnectionManager::file(&path).with_flags(
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        );
        Self::from_manager(manager, config)
    }

    /// In-process, ephemeral database. Used by tests and `continuum doctor`.
    pub fn open_in_memory(config: &Config) -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        Self::from_manager(manager, config)
    }

    fn from_manager(manager: SqliteConnectionManager, config: &Config) -> Result<Self> {
        let pool = Pool::builder()
            .max_size(config.pool_max_size)
            .connection_timeout(config.pool_connect_timeout)
            .build(manager)
            .map_err(|e| ContinuumError::StorageUnavailable(e.to_string()))?;

        {
            let conn = pool
                .get()
                .map_err(|e| ContinuumError::StorageUnavailable(e.to_string()))?;
            configure_connection(&conn)?;
            apply_migrations(&conn)?;
        }

        Ok(Self { pool: Arc::new(pool) })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(ContinuumError::from)
    }

    /// Whether the pool can currently hand out a connection.
    pub fn is_healthy(&self) -> bool {
        self.pool.get().is_ok()
    }

    /// Pool sizing/utilization snapshot (spec §4.1 C1). `r2d2` tracks only
    /// the connections currently open, not a lifetime creation counter, so
    /// `created` reports the present open count rather than an all-time total.
    pub fn get_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            created: state.connections,
            current_open: state.connections - state.idle_connections,
            pool_capacity: self.pool.max_size(),
        }
    }

    /// Storage backend identifier, surfaced alongside `get_stats` for
    /// operator-facing diagnostics.
    pub fn get_backend_info(&self) -> &'static str {
        "sqlite"
    }

    // -- entities --------------------------------------------------------

    /// Insert `name` if it doesn't already exist for `tenant_id` (case
    /// insensitive), otherwise return the existing row untouched.
    pub fn upsert_entity(
        &self,
        tenant_id: &str,
        name: &str,
        entity_type: EntityType,
        description: Option<&str>,
    ) -> Result<Entity> {
        let conn = self.conn()?;
        let name_lower = name.to_lowercase();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO entities (tenant_id, name, name_lower, entity_type, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(tenant_id, name_lower) DO NOTHING",
            params![tenant_id, name, name_lower, entity_type.as_str(), description, now.to_rfc3339()],
        )?;

        self.get_entity(tenant_id, name)?
            .ok_or_else(|| ContinuumError::InvariantViolation("entity upsert did not persist".into()))
    }

    pub fn get_entity(&self, tenant_id: &str, name: &str) -> Result<Option<Entity>> {
        let conn = self.conn()?;
        let name_lower = name.to_lowercase();
        conn.query_row(
            "SELECT id, tenant_id, name, entity_type, description, created_at
             FROM entities WHERE tenant_id = ?1 AND name_lower = ?2",
            params![tenant_id, name_lower],
            row_to_entity,
        )
        .optional()
        .map_err(ContinuumError::from)
    }

    pub fn list_entities(
        &self,
        tenant_id: &str,
        entity_type: Option<EntityType>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Entity>> {
        let conn = self.conn()?;
        let mut stmt = match entity_type {
            Some(_) => conn.prepare(
                "SELECT id, tenant_id, name, entity_type, description, created_at
                 FROM entities WHERE tenant_id = ?1 AND entity_type = ?2
                 ORDER BY created_at DESC LIMIT ?3 OFFSET ?4",
            )?,
            None => conn.prepare(
                "SELECT id, tenant_id, name, entity_type, description, created_at
                 FROM entities WHERE tenant_id = ?1
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
            )?,
        };

        let rows = match entity_type {
            Some(t) => stmt.query_map(params![tenant_id, t.as_str(), limit, offset], row_to_entity)?,
            None => stmt.query_map(params![tenant_id, limit, offset], row_to_entity)?,
        };
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(ContinuumError::from)
    }

    // -- messages ----------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn insert_message(
        &self,
        tenant_id: &str,
        user_message: &str,
        ai_response: &str,
        session_id: &str,
        metadata: &serde_json::Value,
        thinking: Option<&str>,
    ) -> Result<Message> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO messages (tenant_id, user_message, ai_response, session_id, created_at, metadata, thinking)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tenant_id,
                user_message,
                ai_response,
                session_id,
                now.to_rfc3339(),
                metadata.to_string(),
                thinking,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Message {
            id,
            tenant_id: tenant_id.to_string(),
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            session_id: session_id.to_string(),
            created_at: now,
            metadata: metadata.clone(),
            thinking: thinking.map(str::to_string),
        })
    }

    /// Verbatim lexical search over messages via FTS5, newest match first.
    pub fn search_messages_fts(&self, tenant_id: &str, query: &str, limit: i64) -> Result<Vec<Message>> {
        let conn = self.conn()?;
        let sanitized = sanitize_fts5_query(query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(
            "SELECT m.id, m.tenant_id, m.user_message, m.ai_response, m.session_id,
                    m.created_at, m.metadata, m.thinking
             FROM messages_fts
             JOIN messages m ON m.id = messages_fts.rowid
             WHERE messages_fts MATCH ?1 AND m.tenant_id = ?2
             ORDER BY rank LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![sanitized, tenant_id, limit], row_to_message)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(ContinuumError::from)
    }

    /// All messages for a tenant, newest first. Used by export (spec §6).
    pub fn list_messages(&self, tenant_id: &str, limit: i64) -> Result<Vec<Message>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, user_message, ai_response, session_id, created_at, metadata, thinking
             FROM messages WHERE tenant_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![tenant_id, limit], row_to_message)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(ContinuumError::from)
    }

    // -- auto messages -------------------------------------------------------

    pub fn next_message_number(&self, tenant_id: &str, instance_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        let max: Option<i64> = conn
            .query_row(
                "SELECT MAX(message_number) FROM auto_messages WHERE tenant_id = ?1 AND instance_id = ?2",
                params![tenant_id, instance_id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();
        Ok(max.unwrap_or(0) + 1)
    }

    pub fn insert_auto_message(
        &self,
        tenant_id: &str,
        instance_id: &str,
        role: AutoMessageRole,
        content: &str,
        metadata: &serde_json::Value,
    ) -> Result<AutoMessage> {
        let message_number = self.next_message_number(tenant_id, instance_id)?;
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO auto_messages (tenant_id, instance_id, timestamp, message_number, role, content, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tenant_id,
                instance_id,
                now.to_rfc3339(),
                message_number,
                role.as_str(),
                content,
                metadata.to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(AutoMessage {
            id,
            tenant_id: tenant_id.to_string(),
            instance_id: instance_id.to_string(),
            timestamp: now,
            message_number,
            role,
            content: content.to_string(),
            metadata: metadata.clone(),
        })
    }

    // -- decisions -----------------------------------------------------------

    pub fn insert_decision(
        &self,
        tenant_id: &str,
        instance_id: &str,
        decision_text: &str,
        context: Option<&str>,
        extracted_from: &str,
    ) -> Result<Decision> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO decisions (tenant_id, instance_id, timestamp, decision_text, context, extracted_from)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![tenant_id, instance_id, now.to_rfc3339(), decision_text, context, extracted_from],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Decision {
            id,
            tenant_id: tenant_id.to_string(),
            instance_id: instance_id.to_string(),
            timestamp: now,
            decision_text: decision_text.to_string(),
            context: context.map(str::to_string),
            extracted_from: extracted_from.to_string(),
        })
    }

    pub fn list_recent_decisions(&self, tenant_id: &str, limit: i64) -> Result<Vec<Decision>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, instance_id, timestamp, decision_text, context, extracted_from
             FROM decisions WHERE tenant_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![tenant_id, limit], row_to_decision)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(ContinuumError::from)
    }

    // -- attention links -------------------------------------------------------

    /// Look up a link regardless of which side `concept_a`/`concept_b` was
    /// originally inserted as (Open Question #1: pairs are not canonicalized).
    pub fn get_link(&self, tenant_id: &str, concept_a: &str, concept_b: &str) -> Result<Option<AttentionLink>> {
        let conn = self.conn()?;
        let a = concept_a.to_lowercase();
        let b = concept_b.to_lowercase();
        conn.query_row(
            "SELECT id, tenant_id, concept_a, concept_b, link_type, strength, created_at, last_accessed
             FROM attention_links
             WHERE tenant_id = ?1
               AND ((LOWER(concept_a) = ?2 AND LOWER(concept_b) = ?3)
                 OR (LOWER(concept_a) = ?3 AND LOWER(concept_b) = ?2))
             LIMIT 1",
            params![tenant_id, a, b],
            row_to_link,
        )
        .optional()
        .map_err(ContinuumError::from)
    }

    pub fn insert_link(
        &self,
        tenant_id: &str,
        concept_a: &str,
        concept_b: &str,
        link_type: LinkType,
        strength: f64,
    ) -> Result<AttentionLink> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO attention_links (tenant_id, concept_a, concept_b, link_type, strength, created_at, last_accessed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                tenant_id,
                concept_a,
                concept_b,
                link_type.as_str(),
                strength,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(AttentionLink {
            id,
            tenant_id: tenant_id.to_string(),
            concept_a: concept_a.to_string(),
            concept_b: concept_b.to_string(),
            link_type,
            strength,
            created_at: now,
            last_accessed: now,
        })
    }

    pub fn update_link_strength(&self, id: i64, strength: f64, last_accessed: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE attention_links SET strength = ?1, last_accessed = ?2 WHERE id = ?3",
            params![strength, last_accessed.to_rfc3339(), id],
        )?;
        Ok(())
    }

    /// All links touching `concept` above `min_strength`, strongest first.
    pub fn list_links_for_concept(&self, tenant_id: &str, concept: &str, min_strength: f64) -> Result<Vec<AttentionLink>> {
        let conn = self.conn()?;
        let lower = concept.to_lowercase();
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, concept_a, concept_b, link_type, strength, created_at, last_accessed
             FROM attention_links
             WHERE tenant_id = ?1 AND (LOWER(concept_a) = ?2 OR LOWER(concept_b) = ?2) AND strength >= ?3
             ORDER BY strength DESC",
        )?;
        let rows = stmt.query_map(params![tenant_id, lower, min_strength], row_to_link)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(ContinuumError::from)
    }

    /// Every link for a tenant, for full-graph operations (dream mode, export).
    pub fn list_all_links(&self, tenant_id: &str) -> Result<Vec<AttentionLink>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, concept_a, concept_b, link_type, strength, created_at, last_accessed
             FROM attention_links WHERE tenant_id = ?1",
        )?;
        let rows = stmt.query_map(params![tenant_id], row_to_link)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(ContinuumError::from)
    }

    /// Deletes links at or below `min_strength`. Returns the number removed.
    pub fn prune_links_below(&self, tenant_id: &str, min_strength: f64) -> Result<usize> {
        let conn = self.conn()?;
        let n = conn.execute(
            "DELETE FROM attention_links WHERE tenant_id = ?1 AND strength <= ?2",
            params![tenant_id, min_strength],
        )?;
        Ok(n)
    }

    // -- compound concepts -----------------------------------------------------

    pub fn upsert_compound(&self, tenant_id: &str, compound_name: &str, components: &[String]) -> Result<CompoundConcept> {
        let conn = self.conn()?;
        let now = Utc::now();
        let components_json = serde_json::to_string(components)
            .map_err(|e| ContinuumError::Validation(e.to_string()))?;
        conn.execute(
            "INSERT INTO compound_concepts (tenant_id, compound_name, component_concepts, co_occurrence_count, last_seen)
             VALUES (?1, ?2, ?3, 1, ?4)
             ON CONFLICT(tenant_id, compound_name)
             DO UPDATE SET co_occurrence_count = co_occurrence_count + 1, last_seen = excluded.last_seen",
            params![tenant_id, compound_name, components_json, now.to_rfc3339()],
        )?;
        conn.query_row(
            "SELECT tenant_id, compound_name, component_concepts, co_occurrence_count, last_seen
             FROM compound_concepts WHERE tenant_id = ?1 AND compound_name = ?2",
            params![tenant_id, compound_name],
            row_to_compound,
        )
        .map_err(ContinuumError::from)
    }

    pub fn list_compounds(&self, tenant_id: &str, limit: i64) -> Result<Vec<CompoundConcept>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT tenant_id, compound_name, component_concepts, co_occurrence_count, last_seen
             FROM compound_concepts WHERE tenant_id = ?1
             ORDER BY co_occurrence_count DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![tenant_id, limit], row_to_compound)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(ContinuumError::from)
    }

    // -- intentions -----------------------------------------------------------

    pub fn insert_intention(
        &self,
        tenant_id: &str,
        intention: &str,
        context: Option<&str>,
        priority: i32,
        session_id: Option<&str>,
        metadata: &serde_json::Value,
    ) -> Result<Intention> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO intentions (tenant_id, intention, context, priority, status, created_at, session_id, metadata)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7)",
            params![tenant_id, intention, context, priority, now.to_rfc3339(), session_id, metadata.to_string()],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Intention {
            id,
            tenant_id: tenant_id.to_string(),
            intention: intention.to_string(),
            context: context.map(str::to_string),
            priority,
            status: IntentionStatus::Pending,
            created_at: now,
            completed_at: None,
            session_id: session_id.map(str::to_string),
            metadata: metadata.clone(),
        })
    }

    pub fn list_intentions(&self, tenant_id: &str, status: Option<IntentionStatus>) -> Result<Vec<Intention>> {
        let conn = self.conn()?;
        let mut stmt = match status {
            Some(_) => conn.prepare(
                "SELECT id, tenant_id, intention, context, priority, status, created_at, completed_at, session_id, metadata
                 FROM intentions WHERE tenant_id = ?1 AND status = ?2 ORDER BY priority DESC, created_at ASC",
            )?,
            None => conn.prepare(
                "SELECT id, tenant_id, intention, context, priority, status, created_at, completed_at, session_id, metadata
                 FROM intentions WHERE tenant_id = ?1 ORDER BY priority DESC, created_at ASC",
            )?,
        };
        let rows = match status {
            Some(s) => stmt.query_map(params![tenant_id, s.as_str()], row_to_intention)?,
            None => stmt.query_map(params![tenant_id], row_to_intention)?,
        };
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(ContinuumError::from)
    }

    pub fn update_intention_status(&self, tenant_id: &str, id: i64, status: IntentionStatus) -> Result<()> {
        let conn = self.conn()?;
        let completed_at = matches!(status, IntentionStatus::Completed | IntentionStatus::Abandoned)
            .then(|| Utc::now().to_rfc3339());
        let n = conn.execute(
            "UPDATE intentions SET status = ?1, completed_at = ?2 WHERE tenant_id = ?3 AND id = ?4",
            params![status.as_str(), completed_at, tenant_id, id],
        )?;
        if n == 0 {
            return Err(ContinuumError::NotFound(format!("intention {id}")));
        }
        Ok(())
    }

    // -- concept evolution -----------------------------------------------------

    pub fn insert_evolution_event(
        &self,
        tenant_id: &str,
        concept_name: &str,
        event_type: EvolutionEventType,
        old_value: Option<&str>,
        new_value: Option<&str>,
        context: Option<&str>,
    ) -> Result<ConceptEvolutionEvent> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO concept_evolution (tenant_id, concept_name, event_type, old_value, new_value, context, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![tenant_id, concept_name, event_type.as_str(), old_value, new_value, context, now.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();
        Ok(ConceptEvolutionEvent {
            id,
            tenant_id: tenant_id.to_string(),
            concept_name: concept_name.to_string(),
            event_type,
            old_value: old_value.map(str::to_string),
            new_value: new_value.map(str::to_string),
            context: context.map(str::to_string),
            timestamp: now,
        })
    }

    pub fn list_evolution_events(&self, tenant_id: &str, concept_name: &str) -> Result<Vec<ConceptEvolutionEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, concept_name, event_type, old_value, new_value, context, timestamp
             FROM concept_evolution WHERE tenant_id = ?1 AND concept_name = ?2 ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map(params![tenant_id, concept_name], row_to_evolution_event)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(ContinuumError::from)
    }

    // -- thinking snapshots -----------------------------------------------------

    pub fn insert_snapshot(
        &self,
        tenant_id: &str,
        snapshot_type: &str,
        content: &serde_json::Value,
        metrics: &serde_json::Value,
    ) -> Result<ThinkingSnapshot> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO thinking_snapshots (tenant_id, snapshot_type, content, metrics, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![tenant_id, snapshot_type, content.to_string(), metrics.to_string(), now.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();
        Ok(ThinkingSnapshot {
            id,
            tenant_id: tenant_id.to_string(),
            snapshot_type: snapshot_type.to_string(),
            content: content.clone(),
            metrics: metrics.clone(),
            timestamp: now,
        })
    }

    pub fn list_snapshots(&self, tenant_id: &str, limit: i64) -> Result<Vec<ThinkingSnapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, snapshot_type, content, metrics, timestamp
             FROM thinking_snapshots WHERE tenant_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![tenant_id, limit], row_to_snapshot)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(ContinuumError::from)
    }

    // -- aggregate stats ---------------------------------------------------

    pub fn count_entities(&self, tenant_id: &str) -> Result<i64> {
        self.count("entities", tenant_id)
    }

    pub fn count_links(&self, tenant_id: &str) -> Result<i64> {
        self.count("attention_links", tenant_id)
    }

    pub fn count_messages(&self, tenant_id: &str) -> Result<i64> {
        self.count("messages", tenant_id)
    }

    fn count(&self, table: &str, tenant_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE tenant_id = ?1"),
            params![tenant_id],
            |row| row.get(0),
        )
        .map_err(ContinuumError::from)
    }
}

fn configure_connection(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;
         PRAGMA temp_store = MEMORY;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

fn default_db_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("dev", "continuum", "continuum")
        .ok_or_else(|| ContinuumError::StorageUnavailable("could not determine data directory".into()))?;
    Ok(dirs.data_dir().join("continuum.db"))
}

/// Escapes characters significant to the FTS5 MATCH query syntax so raw user
/// input can't break the query or inject FTS operators.
pub fn sanitize_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| {
            let cleaned: String = term.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect();
            cleaned
        })
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\"*"))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn row_to_entity(row: &rusqlite::Row) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        entity_type: EntityType::parse_name(&row.get::<_, String>(3)?),
        description: row.get(4)?,
        created_at: parse_rfc3339(row.get::<_, String>(5)?),
    })
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        user_message: row.get(2)?,
        ai_response: row.get(3)?,
        session_id: row.get(4)?,
        created_at: parse_rfc3339(row.get::<_, String>(5)?),
        metadata: serde_json::from_str(&row.get::<_, String>(6)?).unwrap_or(serde_json::Value::Null),
        thinking: row.get(7)?,
    })
}

fn row_to_decision(row: &rusqlite::Row) -> rusqlite::Result<Decision> {
    Ok(Decision {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        instance_id: row.get(2)?,
        timestamp: parse_rfc3339(row.get::<_, String>(3)?),
        decision_text: row.get(4)?,
        context: row.get(5)?,
        extracted_from: row.get(6)?,
    })
}

fn row_to_link(row: &rusqlite::Row) -> rusqlite::Result<AttentionLink> {
    Ok(AttentionLink {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        concept_a: row.get(2)?,
        concept_b: row.get(3)?,
        link_type: LinkType::parse_name(&row.get::<_, String>(4)?),
        strength: row.get(5)?,
        created_at: parse_rfc3339(row.get::<_, String>(6)?),
        last_accessed: parse_rfc3339(row.get::<_, String>(7)?),
    })
}

fn row_to_compound(row: &rusqlite::Row) -> rusqlite::Result<CompoundConcept> {
    Ok(CompoundConcept {
        tenant_id: row.get(0)?,
        compound_name: row.get(1)?,
        component_concepts: serde_json::from_str(&row.get::<_, String>(2)?).unwrap_or_default(),
        co_occurrence_count: row.get(3)?,
        last_seen: parse_rfc3339(row.get::<_, String>(4)?),
    })
}

fn row_to_intention(row: &rusqlite::Row) -> rusqlite::Result<Intention> {
    Ok(Intention {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        intention: row.get(2)?,
        context: row.get(3)?,
        priority: row.get(4)?,
        status: IntentionStatus::parse_name(&row.get::<_, String>(5)?).unwrap_or(IntentionStatus::Pending),
        created_at: parse_rfc3339(row.get::<_, String>(6)?),
        completed_at: row.get::<_, Option<String>>(7)?.map(parse_rfc3339),
        session_id: row.get(8)?,
        metadata: serde_json::from_str(&row.get::<_, String>(9)?).unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_evolution_event(row: &rusqlite::Row) -> rusqlite::Result<ConceptEvolutionEvent> {
    let event_type = match row.get::<_, String>(3)?.as_str() {
        "strengthened" => EvolutionEventType::Strengthened,
        "weakened" => EvolutionEventType::Weakened,
        "connected" => EvolutionEventType::Connected,
        "refined" => EvolutionEventType::Refined,
        "contradicted" => EvolutionEventType::Contradicted,
        _ => EvolutionEventType::Created,
    };
    Ok(ConceptEvolutionEvent {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        concept_name: row.get(2)?,
        event_type,
        old_value: row.get(4)?,
        new_value: row.get(5)?,
        context: row.get(6)?,
        timestamp: parse_rfc3339(row.get::<_, String>(7)?),
    })
}

fn row_to_snapshot(row: &rusqlite::Row) -> rusqlite::Result<ThinkingSnapshot> {
    Ok(ThinkingSnapshot {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        snapshot_type: row.get(2)?,
        content: serde_json::from_str(&row.get::<_, String>(3)?).unwrap_or(serde_json::Value::Null),
        metrics: serde_json::from_str(&row.get::<_, String>(4)?).unwrap_or(serde_json::Value::Null),
        timestamp: parse_rfc3339(row.get::<_, String>(5)?),
    })
}

fn parse_rfc3339(raw: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_storage() -> Storage {
        Storage::open_in_memory(&Config::default()).unwrap()
    }

    #[test]
    fn upsert_entity_is_idempotent() {
        let storage = test_storage();
        let first = storage.upsert_entity("tenant-a", "Rust", EntityType::Concept, None).unwrap();
        let second = storage.upsert_entity("tenant-a", "rust", EntityType::Concept, None).unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn entities_are_tenant_scoped() {
        let storage = test_storage();
        storage.upsert_entity("tenant-a", "Rust", EntityType::Concept, None).unwrap();
        assert!(storage.get_entity("tenant-b", "Rust").unwrap().is_none());
    }

    #[test]
    fn link_lookup_is_order_independent() {
        let storage = test_storage();
        storage.insert_link("tenant-a", "Rust", "Python", LinkType::CoOccurrence, 0.3).unwrap();
        assert!(storage.get_link("tenant-a", "Python", "Rust").unwrap().is_some());
    }

    #[test]
    fn prune_removes_only_weak_links() {
        let storage = test_storage();
        storage.insert_link("tenant-a", "A", "B", LinkType::Hebbian, 0.9).unwrap();
        storage.insert_link("tenant-a", "C", "D", LinkType::Hebbian, 0.01).unwrap();
        let pruned = storage.prune_links_below("tenant-a", 0.05).unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(storage.list_all_links("tenant-a").unwrap().len(), 1);
    }

    #[test]
    fn compound_concepts_bump_co_occurrence_on_repeat() {
        let storage = test_storage();
        let components = vec!["A".to_string(), "B".to_string()];
        storage.upsert_compound("tenant-a", "A + B", &components).unwrap();
        let second = storage.upsert_compound("tenant-a", "A + B", &components).unwrap();
        assert_eq!(second.co_occurrence_count, 2);
    }

    #[test]
    fn intentions_track_status_transitions() {
        let storage = test_storage();
        let intention = storage
            .insert_intention("tenant-a", "ship the recall cache", None, 5, None, &serde_json::json!({}))
            .unwrap();
        storage.update_intention_status("tenant-a", intention.id, IntentionStatus::Completed).unwrap();
        let pending = storage.list_intentions("tenant-a", Some(IntentionStatus::Pending)).unwrap();
        assert!(pending.is_empty());
    }

    #[test]
    fn auto_message_numbers_increment_per_instance() {
        let storage = test_storage();
        let first = storage
            .insert_auto_message("tenant-a", "inst-1", AutoMessageRole::User, "hello", &serde_json::json!({}))
            .unwrap();
        let second = storage
            .insert_auto_message("tenant-a", "inst-1", AutoMessageRole::Assistant, "hi", &serde_json::json!({}))
            .unwrap();
        assert_eq!(first.message_number, 1);
        assert_eq!(second.message_number, 2);
    }

    #[test]
    fn fts_search_finds_verbatim_messages() {
        let storage = test_storage();
        storage
            .insert_message("tenant-a", "what is hebbian learning", "an associative update rule", "s1", &serde_json::json!({}), None)
            .unwrap();
        let hits = storage.search_messages_fts("tenant-a", "hebbian", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn sanitize_fts5_query_strips_operators() {
        let cleaned = sanitize_fts5_query("foo\" OR bar*");
        assert!(!cleaned.contains('\n'));
        assert!(cleaned.contains("\"foo\""));
    }
}
