//! Database schema definitions.
//!
//! This module contains the complete SQLite schema for a Shotline project
//! store: the structured tables mirroring the dataset model, the
//! content-addressed chunk table, preview storage, the trash table for
//! pending deletions, and the single-row config table.

use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for a Shotline project database.
///
/// Timestamps are stored as INTEGER (Unix milliseconds). Every syncable
/// table carries `is_synced`/`synced_at` so push can load changed rows
/// without scanning content.
pub const SCHEMA_SQL: &str = r#"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- People
-- ====================

CREATE TABLE IF NOT EXISTS roles (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,
    role_id TEXT REFERENCES roles(id),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

-- ====================
-- Type Tables
-- ====================

CREATE TABLE IF NOT EXISTS entity_types (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS task_types (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS statuses (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    short_name TEXT,
    color TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

-- ====================
-- Entities & Tasks
-- ====================

-- Entities form a parent/child forest; bulk inserts must order parents
-- before children.
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    parent_id TEXT REFERENCES entities(id),
    entity_type_id TEXT NOT NULL REFERENCES entity_types(id),
    preview_id TEXT,
    is_library INTEGER DEFAULT 0,
    description TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_entities_parent ON entities(parent_id);
CREATE INDEX IF NOT EXISTS idx_entities_type ON entities(entity_type_id);
CREATE INDEX IF NOT EXISTS idx_entities_synced ON entities(is_synced, synced_at);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    entity_id TEXT REFERENCES entities(id),
    task_type_id TEXT NOT NULL REFERENCES task_types(id),
    status_id TEXT REFERENCES statuses(id),
    assignee_id TEXT REFERENCES users(id),
    is_dependency INTEGER DEFAULT 0,
    preview_id TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_tasks_entity ON tasks(entity_id);
CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assignee_id);
CREATE INDEX IF NOT EXISTS idx_tasks_synced ON tasks(is_synced, synced_at);

-- Checkpoints: versioned snapshots of a task's file content.
-- chunk_hashes is the comma-joined list of content digests backing the file.
CREATE TABLE IF NOT EXISTS checkpoints (
    id TEXT PRIMARY KEY,
    task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    revision INTEGER NOT NULL DEFAULT 0,
    chunk_hashes TEXT NOT NULL DEFAULT '',
    checksum TEXT NOT NULL DEFAULT '',
    file_size INTEGER NOT NULL DEFAULT 0,
    comment TEXT,
    author_id TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_checkpoints_task ON checkpoints(task_id, revision DESC);
CREATE INDEX IF NOT EXISTS idx_checkpoints_synced ON checkpoints(is_synced, synced_at);

CREATE TABLE IF NOT EXISTS templates (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    file_name TEXT,
    chunk_hashes TEXT NOT NULL DEFAULT '',
    checksum TEXT NOT NULL DEFAULT '',
    file_size INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

-- ====================
-- Links
-- ====================

CREATE TABLE IF NOT EXISTS task_dependencies (
    id TEXT PRIMARY KEY,
    task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    depends_on_task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0,
    UNIQUE(task_id, depends_on_task_id)
);

CREATE TABLE IF NOT EXISTS entity_dependencies (
    id TEXT PRIMARY KEY,
    entity_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    depends_on_entity_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0,
    UNIQUE(entity_id, depends_on_entity_id)
);

CREATE TABLE IF NOT EXISTS workflows (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS workflow_links (
    id TEXT PRIMARY KEY,
    workflow_id TEXT NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
    from_node TEXT NOT NULL,
    to_node TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS workflow_entities (
    id TEXT PRIMARY KEY,
    workflow_id TEXT NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
    entity_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS workflow_tasks (
    id TEXT PRIMARY KEY,
    workflow_id TEXT NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
    task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS task_tags (
    id TEXT PRIMARY KEY,
    task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER,
    is_synced INTEGER DEFAULT 0,
    UNIQUE(task_id, tag_id)
);

-- ====================
-- Binary Payload
-- ====================

-- Content-addressed chunk store: hash is the SHA-256 of the decompressed
-- payload, written at most once, never deleted.
CREATE TABLE IF NOT EXISTS chunks (
    hash TEXT PRIMARY KEY,
    payload BLOB NOT NULL,
    size INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS previews (
    id TEXT PRIMARY KEY,
    data BLOB NOT NULL
);

-- ====================
-- Sync Bookkeeping
-- ====================

-- Pending local deletions, drained into the tombstone list on push.
CREATE TABLE IF NOT EXISTS trash (
    record_id TEXT PRIMARY KEY,
    deleted_at INTEGER NOT NULL
);

-- Single-row project config; each sync-relevant field carries its own
-- modification time and synced flag.
CREATE TABLE IF NOT EXISTS config (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    server_url TEXT,
    user_id TEXT,
    sync_token TEXT,
    sync_token_updated_at INTEGER,
    sync_token_synced INTEGER DEFAULT 0,
    project_preview_id TEXT,
    project_preview_updated_at INTEGER,
    project_preview_synced INTEGER DEFAULT 0,
    working_dir TEXT,
    working_dir_updated_at INTEGER,
    working_dir_synced INTEGER DEFAULT 0
);

INSERT OR IGNORE INTO config (id) VALUES (1);
"#;

/// Names of the structured (syncable) tables, in creation order.
///
/// Used by the overwrite path to clear a store before rewriting it and by
/// `mark_all_synced`. Order matters for clearing: children before parents.
pub const STRUCTURED_TABLES: &[&str] = &[
    "task_tags",
    "workflow_tasks",
    "workflow_entities",
    "workflow_links",
    "workflows",
    "entity_dependencies",
    "task_dependencies",
    "templates",
    "checkpoints",
    "tasks",
    "entities",
    "tags",
    "statuses",
    "task_types",
    "entity_types",
    "users",
    "roles",
];

/// Apply the schema to a connection.
///
/// Idempotent: every statement is `IF NOT EXISTS`. Also records the schema
/// version row on first application.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![CURRENT_SCHEMA_VERSION.to_string(), now],
    )?;

    Ok(())
}

/// Delete every row from the structured tables.
///
/// Chunks, previews, trash and config survive; chunks are content-addressed
/// and never deleted, and config holds local identity.
pub fn clear_structured_tables(conn: &Connection) -> Result<()> {
    for table in STRUCTURED_TABLES {
        conn.execute(&format!("DELETE FROM {table}"), [])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_applies_to_memory_db() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        // Config row is seeded.
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM config", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();
    }

    #[test]
    fn test_clear_structured_tables() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let now = 1_000;
        conn.execute(
            "INSERT INTO roles (id, name, created_at, updated_at) VALUES ('r1', 'artist', ?1, ?1)",
            [now],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO chunks (hash, payload, size) VALUES ('abc', x'00', 1)",
            [],
        )
        .unwrap();

        clear_structured_tables(&conn).unwrap();

        let roles: i64 = conn
            .query_row("SELECT COUNT(*) FROM roles", [], |r| r.get(0))
            .unwrap();
        let chunks: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))
            .unwrap();
        assert_eq!(roles, 0);
        assert_eq!(chunks, 1, "chunk store must survive a clear");
    }
}
