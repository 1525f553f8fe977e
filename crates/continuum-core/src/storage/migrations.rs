//! Database migrations — additive only, applied on every open (spec §4.1).

use rusqlite::Connection;

/// A single migration step.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

/// Ordered migration definitions. Never edit an already-shipped entry —
/// add a new one instead.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial multi-tenant schema: entities, messages, attention links, compounds",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Intentions, concept evolution log, thinking snapshots",
        up: MIGRATION_V2_UP,
    },
    Migration {
        version: 3,
        description: "FTS5 full-text index over verbatim messages",
        up: MIGRATION_V3_UP,
    },
];

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT NOT NULL,
    name TEXT NOT NULL,
    name_lower TEXT NOT NULL,
    entity_type TEXT NOT NULL DEFAULT 'concept',
    description TEXT,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_entities_tenant_name_lower ON entities(tenant_id, name_lower);
CREATE INDEX IF NOT EXISTS idx_entities_name ON entities(name);
CREATE INDEX IF NOT EXISTS idx_entities_tenant ON entities(tenant_id);
CREATE INDEX IF NOT EXISTS idx_entities_type ON entities(entity_type);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT NOT NULL,
    user_message TEXT NOT NULL,
    ai_response TEXT NOT NULL,
    session_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    thinking TEXT
);
CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id);
CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at);
CREATE INDEX IF NOT EXISTS idx_messages_tenant ON messages(tenant_id);

CREATE TABLE IF NOT EXISTS auto_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT NOT NULL,
    instance_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    message_number INTEGER NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_auto_messages_tenant ON auto_messages(tenant_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_auto_messages_instance_seq
    ON auto_messages(tenant_id, instance_id, message_number);

CREATE TABLE IF NOT EXISTS decisions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT NOT NULL,
    instance_id TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    decision_text TEXT NOT NULL,
    context TEXT,
    extracted_from TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_decisions_tenant ON decisions(tenant_id);

CREATE TABLE IF NOT EXISTS attention_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT NOT NULL,
    concept_a TEXT NOT NULL,
    concept_b TEXT NOT NULL,
    link_type TEXT NOT NULL DEFAULT 'co-occurrence',
    strength REAL NOT NULL DEFAULT 0.3,
    created_at TEXT NOT NULL,
    last_accessed TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_links_tenant ON attention_links(tenant_id);
CREATE INDEX IF NOT EXISTS idx_links_pair ON attention_links(concept_a, concept_b);
CREATE INDEX IF NOT EXISTS idx_links_strength ON attention_links(strength);

CREATE TABLE IF NOT EXISTS compound_concepts (
    tenant_id TEXT NOT NULL,
    compound_name TEXT NOT NULL,
    component_concepts TEXT NOT NULL,
    co_occurrence_count INTEGER NOT NULL DEFAULT 1,
    last_seen TEXT NOT NULL,
    PRIMARY KEY (tenant_id, compound_name)
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS intentions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT NOT NULL,
    intention TEXT NOT NULL,
    context TEXT,
    priority INTEGER NOT NULL DEFAULT 5,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    completed_at TEXT,
    session_id TEXT,
    metadata TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_intentions_tenant_status_priority
    ON intentions(tenant_id, status, priority DESC);

CREATE TABLE IF NOT EXISTS concept_evolution (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT NOT NULL,
    concept_name TEXT NOT NULL,
    event_type TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    context TEXT,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_evolution_concept ON concept_evolution(concept_name);
CREATE INDEX IF NOT EXISTS idx_evolution_timestamp ON concept_evolution(timestamp);

CREATE TABLE IF NOT EXISTS thinking_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id TEXT NOT NULL,
    snapshot_type TEXT NOT NULL,
    content TEXT NOT NULL,
    metrics TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_snapshots_tenant ON thinking_snapshots(tenant_id);

UPDATE schema_version SET version = 2, applied_at = datetime('now');
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (2, datetime('now'));
"#;

const MIGRATION_V3_UP: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
    user_message,
    ai_response,
    content='messages',
    content_rowid='id'
);

CREATE TRIGGER IF NOT EXISTS messages_ai AFTER INSERT ON messages BEGIN
    INSERT INTO messages_fts(rowid, user_message, ai_response)
    VALUES (NEW.id, NEW.user_message, NEW.ai_response);
END;

CREATE TRIGGER IF NOT EXISTS messages_ad AFTER DELETE ON messages BEGIN
    INSERT INTO messages_fts(messages_fts, rowid, user_message, ai_response)
    VALUES ('delete', OLD.id, OLD.user_message, OLD.ai_response);
END;

UPDATE schema_version SET version = 3, applied_at = datetime('now');
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (3, datetime('now'));
"#;

/// Current schema version applied to `conn`.
pub fn get_current_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
    .or(Ok(0))
}

/// Apply every migration newer than the current schema version.
pub fn apply_migrations(conn: &Connection) -> rusqlite::Result<u32> {
    let current = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current {
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "applying migration"
            );
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    // Additive column backfill, done by introspection rather than a
    // versioned migration so it's idempotent regardless of how an
    // existing database reached this schema (spec §4.1).
    ensure_column_backfilled(conn, "attention_links", "last_accessed", "created_at")?;

    Ok(applied)
}

/// If `table.column` is missing, add it and backfill its value from
/// `table.backfill_from`. No-op if the column already exists.
fn ensure_column_backfilled(
    conn: &Connection,
    table: &str,
    column: &str,
    backfill_from: &str,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let has_column = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|r| r.ok())
        .any(|name| name == column);
    drop(stmt);

    if !has_column {
        tracing::info!(table, column, "backfilling missing column");
        conn.execute_batch(&format!(
            "ALTER TABLE {table} ADD COLUMN {column} TEXT;
             UPDATE {table} SET {column} = {backfill_from} WHERE {column} IS NULL;"
        ))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_lands_on_latest_version() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, MIGRATIONS.last().unwrap().version);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        let applied_again = apply_migrations(&conn).unwrap();
        assert_eq!(applied_again, 0);
    }

    #[test]
    fn ensure_column_backfilled_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        ensure_column_backfilled(&conn, "attention_links", "last_accessed", "created_at").unwrap();
    }
}
