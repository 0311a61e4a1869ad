//! SQLite storage implementation.
//!
//! This module provides the local project store: record accessors for every
//! syncable table, the content-addressed chunk table, preview storage, the
//! trash table and the single-row config table.
//!
//! Record writers (`insert_*` / `update_*`) are merge-path writers: they are
//! called while applying a remote dataset, so they mark rows as synced.
//! Locally originated mutations flip `is_synced` back to 0 through the CRUD
//! layer, which is outside the sync core.
//!
//! All record-level functions take `&Connection` so they work both on a
//! plain connection and inside a `Transaction` (which derefs to one).

use crate::error::{Error, Result};
use crate::model::{
    Checkpoint, Entity, EntityDependency, EntityType, Role, Status, Tag, Task, TaskDependency,
    TaskTag, TaskType, Template, Tombstone, User, Workflow, WorkflowEntity, WorkflowLink,
    WorkflowTask,
};
use crate::storage::schema::{apply_schema, STRUCTURED_TABLES};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// SQLite-based project store.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation inside an IMMEDIATE transaction.
    ///
    /// IMMEDIATE acquires the write lock up front so a sync call never
    /// deadlocks against its own later writes. The closure receives the
    /// transaction; returning `Err` rolls everything back.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot start, the closure fails,
    /// or the commit fails.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction) -> Result<R>,
    {
        tracing::debug!(op, "begin mutation");
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

/// Check whether a rusqlite error is a UNIQUE constraint violation.
///
/// The persistence layer surfaces these as [`Error::Duplicate`] so callers
/// can branch without matching on SQLite message strings.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Convert a write error, mapping UNIQUE violations to `Error::Duplicate`.
fn write_error(err: rusqlite::Error, id: &str) -> Error {
    if is_unique_violation(&err) {
        Error::Duplicate { id: id.to_string() }
    } else {
        Error::Database(err)
    }
}

fn query_all<T, F>(conn: &Connection, sql: &str, map: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], map)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

// ==================
// Roles
// ==================

fn row_to_role(row: &Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

const ROLE_COLS: &str = "id, name, created_at, updated_at";

pub fn get_role(conn: &Connection, id: &str) -> Result<Option<Role>> {
    conn.query_row(
        &format!("SELECT {ROLE_COLS} FROM roles WHERE id = ?1"),
        [id],
        row_to_role,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_role(conn: &Connection, r: &Role) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO roles (id, name, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![r.id, r.name, r.created_at, r.updated_at, now],
    )
    .map_err(|e| write_error(e, &r.id))?;
    Ok(())
}

pub fn update_role(conn: &Connection, r: &Role) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE roles SET name = ?2, updated_at = ?3, synced_at = ?4, is_synced = 1 WHERE id = ?1",
        params![r.id, r.name, r.updated_at, now],
    )?;
    Ok(())
}

pub fn all_roles(conn: &Connection) -> Result<Vec<Role>> {
    query_all(
        conn,
        &format!("SELECT {ROLE_COLS} FROM roles ORDER BY id"),
        row_to_role,
    )
}

pub fn changed_roles(conn: &Connection) -> Result<Vec<Role>> {
    query_all(
        conn,
        &format!("SELECT {ROLE_COLS} FROM roles WHERE is_synced = 0 ORDER BY id"),
        row_to_role,
    )
}

// ==================
// Users
// ==================

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const USER_COLS: &str = "id, name, email, role_id, created_at, updated_at";

pub fn get_user(conn: &Connection, id: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
        [id],
        row_to_user,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_user(conn: &Connection, u: &User) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO users (id, name, email, role_id, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
        params![u.id, u.name, u.email, u.role_id, u.created_at, u.updated_at, now],
    )
    .map_err(|e| write_error(e, &u.id))?;
    Ok(())
}

/// Reassign a user's role. The only user field the merge writer mutates.
pub fn update_user_role(
    conn: &Connection,
    id: &str,
    role_id: Option<&str>,
    updated_at: i64,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE users SET role_id = ?2, updated_at = ?3, synced_at = ?4, is_synced = 1 WHERE id = ?1",
        params![id, role_id, updated_at, now],
    )?;
    Ok(())
}

pub fn all_users(conn: &Connection) -> Result<Vec<User>> {
    query_all(
        conn,
        &format!("SELECT {USER_COLS} FROM users ORDER BY id"),
        row_to_user,
    )
}

pub fn changed_users(conn: &Connection) -> Result<Vec<User>> {
    query_all(
        conn,
        &format!("SELECT {USER_COLS} FROM users WHERE is_synced = 0 ORDER BY id"),
        row_to_user,
    )
}

// ==================
// Entity Types / Task Types
// ==================

fn row_to_entity_type(row: &Row<'_>) -> rusqlite::Result<EntityType> {
    Ok(EntityType {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

pub fn get_entity_type(conn: &Connection, id: &str) -> Result<Option<EntityType>> {
    conn.query_row(
        "SELECT id, name, created_at, updated_at FROM entity_types WHERE id = ?1",
        [id],
        row_to_entity_type,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_entity_type(conn: &Connection, t: &EntityType) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO entity_types (id, name, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![t.id, t.name, t.created_at, t.updated_at, now],
    )
    .map_err(|e| write_error(e, &t.id))?;
    Ok(())
}

pub fn update_entity_type(conn: &Connection, t: &EntityType) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE entity_types SET name = ?2, updated_at = ?3, synced_at = ?4, is_synced = 1 WHERE id = ?1",
        params![t.id, t.name, t.updated_at, now],
    )?;
    Ok(())
}

pub fn all_entity_types(conn: &Connection) -> Result<Vec<EntityType>> {
    query_all(
        conn,
        "SELECT id, name, created_at, updated_at FROM entity_types ORDER BY id",
        row_to_entity_type,
    )
}

pub fn changed_entity_types(conn: &Connection) -> Result<Vec<EntityType>> {
    query_all(
        conn,
        "SELECT id, name, created_at, updated_at FROM entity_types WHERE is_synced = 0 ORDER BY id",
        row_to_entity_type,
    )
}

fn row_to_task_type(row: &Row<'_>) -> rusqlite::Result<TaskType> {
    Ok(TaskType {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

pub fn get_task_type(conn: &Connection, id: &str) -> Result<Option<TaskType>> {
    conn.query_row(
        "SELECT id, name, created_at, updated_at FROM task_types WHERE id = ?1",
        [id],
        row_to_task_type,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_task_type(conn: &Connection, t: &TaskType) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO task_types (id, name, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![t.id, t.name, t.created_at, t.updated_at, now],
    )
    .map_err(|e| write_error(e, &t.id))?;
    Ok(())
}

pub fn update_task_type(conn: &Connection, t: &TaskType) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE task_types SET name = ?2, updated_at = ?3, synced_at = ?4, is_synced = 1 WHERE id = ?1",
        params![t.id, t.name, t.updated_at, now],
    )?;
    Ok(())
}

pub fn all_task_types(conn: &Connection) -> Result<Vec<TaskType>> {
    query_all(
        conn,
        "SELECT id, name, created_at, updated_at FROM task_types ORDER BY id",
        row_to_task_type,
    )
}

pub fn changed_task_types(conn: &Connection) -> Result<Vec<TaskType>> {
    query_all(
        conn,
        "SELECT id, name, created_at, updated_at FROM task_types WHERE is_synced = 0 ORDER BY id",
        row_to_task_type,
    )
}

// ==================
// Statuses / Tags
// ==================

fn row_to_status(row: &Row<'_>) -> rusqlite::Result<Status> {
    Ok(Status {
        id: row.get(0)?,
        name: row.get(1)?,
        short_name: row.get(2)?,
        color: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const STATUS_COLS: &str = "id, name, short_name, color, created_at, updated_at";

pub fn get_status(conn: &Connection, id: &str) -> Result<Option<Status>> {
    conn.query_row(
        &format!("SELECT {STATUS_COLS} FROM statuses WHERE id = ?1"),
        [id],
        row_to_status,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_status(conn: &Connection, s: &Status) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO statuses (id, name, short_name, color, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
        params![s.id, s.name, s.short_name, s.color, s.created_at, s.updated_at, now],
    )
    .map_err(|e| write_error(e, &s.id))?;
    Ok(())
}

pub fn update_status(conn: &Connection, s: &Status) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE statuses SET name = ?2, short_name = ?3, color = ?4, updated_at = ?5, synced_at = ?6, is_synced = 1
         WHERE id = ?1",
        params![s.id, s.name, s.short_name, s.color, s.updated_at, now],
    )?;
    Ok(())
}

pub fn all_statuses(conn: &Connection) -> Result<Vec<Status>> {
    query_all(
        conn,
        &format!("SELECT {STATUS_COLS} FROM statuses ORDER BY id"),
        row_to_status,
    )
}

pub fn changed_statuses(conn: &Connection) -> Result<Vec<Status>> {
    query_all(
        conn,
        &format!("SELECT {STATUS_COLS} FROM statuses WHERE is_synced = 0 ORDER BY id"),
        row_to_status,
    )
}

fn row_to_tag(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

pub fn get_tag(conn: &Connection, id: &str) -> Result<Option<Tag>> {
    conn.query_row(
        "SELECT id, name, created_at, updated_at FROM tags WHERE id = ?1",
        [id],
        row_to_tag,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_tag(conn: &Connection, t: &Tag) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO tags (id, name, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![t.id, t.name, t.created_at, t.updated_at, now],
    )
    .map_err(|e| write_error(e, &t.id))?;
    Ok(())
}

pub fn update_tag(conn: &Connection, t: &Tag) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE tags SET name = ?2, updated_at = ?3, synced_at = ?4, is_synced = 1 WHERE id = ?1",
        params![t.id, t.name, t.updated_at, now],
    )?;
    Ok(())
}

pub fn all_tags(conn: &Connection) -> Result<Vec<Tag>> {
    query_all(
        conn,
        "SELECT id, name, created_at, updated_at FROM tags ORDER BY id",
        row_to_tag,
    )
}

pub fn changed_tags(conn: &Connection) -> Result<Vec<Tag>> {
    query_all(
        conn,
        "SELECT id, name, created_at, updated_at FROM tags WHERE is_synced = 0 ORDER BY id",
        row_to_tag,
    )
}

// ==================
// Entities
// ==================

fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        entity_type_id: row.get(3)?,
        preview_id: row.get(4)?,
        is_library: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const ENTITY_COLS: &str =
    "id, name, parent_id, entity_type_id, preview_id, is_library, description, created_at, updated_at";

pub fn get_entity(conn: &Connection, id: &str) -> Result<Option<Entity>> {
    conn.query_row(
        &format!("SELECT {ENTITY_COLS} FROM entities WHERE id = ?1"),
        [id],
        row_to_entity,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_entity(conn: &Connection, e: &Entity) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO entities
            (id, name, parent_id, entity_type_id, preview_id, is_library, description,
             created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1)",
        params![
            e.id,
            e.name,
            e.parent_id,
            e.entity_type_id,
            e.preview_id,
            e.is_library,
            e.description,
            e.created_at,
            e.updated_at,
            now
        ],
    )
    .map_err(|err| write_error(err, &e.id))?;
    Ok(())
}

/// Update the non-structural entity fields (name, type, description).
///
/// Parent, preview and library flag are written through their targeted
/// setters only when they actually differ, to keep write amplification down.
pub fn update_entity_core(conn: &Connection, e: &Entity) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE entities SET name = ?2, entity_type_id = ?3, description = ?4,
             updated_at = ?5, synced_at = ?6, is_synced = 1
         WHERE id = ?1",
        params![e.id, e.name, e.entity_type_id, e.description, e.updated_at, now],
    )?;
    Ok(())
}

pub fn update_entity_parent(conn: &Connection, id: &str, parent_id: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE entities SET parent_id = ?2 WHERE id = ?1",
        params![id, parent_id],
    )?;
    Ok(())
}

pub fn update_entity_preview(conn: &Connection, id: &str, preview_id: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE entities SET preview_id = ?2 WHERE id = ?1",
        params![id, preview_id],
    )?;
    Ok(())
}

pub fn update_entity_library(conn: &Connection, id: &str, is_library: bool) -> Result<()> {
    conn.execute(
        "UPDATE entities SET is_library = ?2 WHERE id = ?1",
        params![id, is_library],
    )?;
    Ok(())
}

pub fn all_entities(conn: &Connection) -> Result<Vec<Entity>> {
    query_all(
        conn,
        &format!("SELECT {ENTITY_COLS} FROM entities ORDER BY id"),
        row_to_entity,
    )
}

pub fn changed_entities(conn: &Connection) -> Result<Vec<Entity>> {
    query_all(
        conn,
        &format!("SELECT {ENTITY_COLS} FROM entities WHERE is_synced = 0 ORDER BY id"),
        row_to_entity,
    )
}

/// Ids of all entities currently in the store.
///
/// The topological sorter treats these as already-satisfied parents, so a
/// delta dataset may reference unchanged local entities.
pub fn existing_entity_ids(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT id FROM entities")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut out = HashSet::new();
    for row in rows {
        out.insert(row?);
    }
    Ok(out)
}

// ==================
// Tasks
// ==================

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        entity_id: row.get(2)?,
        task_type_id: row.get(3)?,
        status_id: row.get(4)?,
        assignee_id: row.get(5)?,
        is_dependency: row.get(6)?,
        preview_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

const TASK_COLS: &str = "id, name, entity_id, task_type_id, status_id, assignee_id, is_dependency, preview_id, created_at, updated_at";

pub fn get_task(conn: &Connection, id: &str) -> Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {TASK_COLS} FROM tasks WHERE id = ?1"),
        [id],
        row_to_task,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_task(conn: &Connection, t: &Task) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO tasks
            (id, name, entity_id, task_type_id, status_id, assignee_id, is_dependency,
             preview_id, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1)",
        params![
            t.id,
            t.name,
            t.entity_id,
            t.task_type_id,
            t.status_id,
            t.assignee_id,
            t.is_dependency,
            t.preview_id,
            t.created_at,
            t.updated_at,
            now
        ],
    )
    .map_err(|e| write_error(e, &t.id))?;
    Ok(())
}

pub fn update_task(conn: &Connection, t: &Task) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE tasks SET name = ?2, entity_id = ?3, task_type_id = ?4, status_id = ?5,
             assignee_id = ?6, is_dependency = ?7, preview_id = ?8, updated_at = ?9,
             synced_at = ?10, is_synced = 1
         WHERE id = ?1",
        params![
            t.id,
            t.name,
            t.entity_id,
            t.task_type_id,
            t.status_id,
            t.assignee_id,
            t.is_dependency,
            t.preview_id,
            t.updated_at,
            now
        ],
    )?;
    Ok(())
}

pub fn all_tasks(conn: &Connection) -> Result<Vec<Task>> {
    query_all(
        conn,
        &format!("SELECT {TASK_COLS} FROM tasks ORDER BY id"),
        row_to_task,
    )
}

pub fn changed_tasks(conn: &Connection) -> Result<Vec<Task>> {
    query_all(
        conn,
        &format!("SELECT {TASK_COLS} FROM tasks WHERE is_synced = 0 ORDER BY id"),
        row_to_task,
    )
}

// ==================
// Checkpoints / Templates
// ==================

fn row_to_checkpoint(row: &Row<'_>) -> rusqlite::Result<Checkpoint> {
    Ok(Checkpoint {
        id: row.get(0)?,
        task_id: row.get(1)?,
        revision: row.get(2)?,
        chunk_hashes: row.get(3)?,
        checksum: row.get(4)?,
        file_size: row.get(5)?,
        comment: row.get(6)?,
        author_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

const CHECKPOINT_COLS: &str = "id, task_id, revision, chunk_hashes, checksum, file_size, comment, author_id, created_at, updated_at";

pub fn get_checkpoint(conn: &Connection, id: &str) -> Result<Option<Checkpoint>> {
    conn.query_row(
        &format!("SELECT {CHECKPOINT_COLS} FROM checkpoints WHERE id = ?1"),
        [id],
        row_to_checkpoint,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_checkpoint(conn: &Connection, c: &Checkpoint) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO checkpoints
            (id, task_id, revision, chunk_hashes, checksum, file_size, comment, author_id,
             created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1)",
        params![
            c.id,
            c.task_id,
            c.revision,
            c.chunk_hashes,
            c.checksum,
            c.file_size,
            c.comment,
            c.author_id,
            c.created_at,
            c.updated_at,
            now
        ],
    )
    .map_err(|e| write_error(e, &c.id))?;
    Ok(())
}

pub fn update_checkpoint(conn: &Connection, c: &Checkpoint) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE checkpoints SET task_id = ?2, revision = ?3, chunk_hashes = ?4, checksum = ?5,
             file_size = ?6, comment = ?7, author_id = ?8, updated_at = ?9,
             synced_at = ?10, is_synced = 1
         WHERE id = ?1",
        params![
            c.id,
            c.task_id,
            c.revision,
            c.chunk_hashes,
            c.checksum,
            c.file_size,
            c.comment,
            c.author_id,
            c.updated_at,
            now
        ],
    )?;
    Ok(())
}

pub fn all_checkpoints(conn: &Connection) -> Result<Vec<Checkpoint>> {
    query_all(
        conn,
        &format!("SELECT {CHECKPOINT_COLS} FROM checkpoints ORDER BY id"),
        row_to_checkpoint,
    )
}

pub fn changed_checkpoints(conn: &Connection) -> Result<Vec<Checkpoint>> {
    query_all(
        conn,
        &format!("SELECT {CHECKPOINT_COLS} FROM checkpoints WHERE is_synced = 0 ORDER BY id"),
        row_to_checkpoint,
    )
}

fn row_to_template(row: &Row<'_>) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        file_name: row.get(2)?,
        chunk_hashes: row.get(3)?,
        checksum: row.get(4)?,
        file_size: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const TEMPLATE_COLS: &str =
    "id, name, file_name, chunk_hashes, checksum, file_size, created_at, updated_at";

pub fn get_template(conn: &Connection, id: &str) -> Result<Option<Template>> {
    conn.query_row(
        &format!("SELECT {TEMPLATE_COLS} FROM templates WHERE id = ?1"),
        [id],
        row_to_template,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_template(conn: &Connection, t: &Template) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO templates
            (id, name, file_name, chunk_hashes, checksum, file_size, created_at, updated_at,
             synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)",
        params![
            t.id,
            t.name,
            t.file_name,
            t.chunk_hashes,
            t.checksum,
            t.file_size,
            t.created_at,
            t.updated_at,
            now
        ],
    )
    .map_err(|e| write_error(e, &t.id))?;
    Ok(())
}

pub fn update_template(conn: &Connection, t: &Template) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE templates SET name = ?2, file_name = ?3, chunk_hashes = ?4, checksum = ?5,
             file_size = ?6, updated_at = ?7, synced_at = ?8, is_synced = 1
         WHERE id = ?1",
        params![
            t.id,
            t.name,
            t.file_name,
            t.chunk_hashes,
            t.checksum,
            t.file_size,
            t.updated_at,
            now
        ],
    )?;
    Ok(())
}

pub fn all_templates(conn: &Connection) -> Result<Vec<Template>> {
    query_all(
        conn,
        &format!("SELECT {TEMPLATE_COLS} FROM templates ORDER BY id"),
        row_to_template,
    )
}

pub fn changed_templates(conn: &Connection) -> Result<Vec<Template>> {
    query_all(
        conn,
        &format!("SELECT {TEMPLATE_COLS} FROM templates WHERE is_synced = 0 ORDER BY id"),
        row_to_template,
    )
}

// ==================
// Dependency Links
// ==================

fn row_to_task_dep(row: &Row<'_>) -> rusqlite::Result<TaskDependency> {
    Ok(TaskDependency {
        id: row.get(0)?,
        task_id: row.get(1)?,
        depends_on_task_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

const TASK_DEP_COLS: &str = "id, task_id, depends_on_task_id, created_at, updated_at";

pub fn get_task_dependency(conn: &Connection, id: &str) -> Result<Option<TaskDependency>> {
    conn.query_row(
        &format!("SELECT {TASK_DEP_COLS} FROM task_dependencies WHERE id = ?1"),
        [id],
        row_to_task_dep,
    )
    .optional()
    .map_err(Error::from)
}

/// Insert a task dependency link.
///
/// A duplicate `(task_id, depends_on_task_id)` pair surfaces as
/// [`Error::Duplicate`]; re-applying a dataset is expected to hit this.
pub fn insert_task_dependency(conn: &Connection, d: &TaskDependency) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO task_dependencies
            (id, task_id, depends_on_task_id, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![d.id, d.task_id, d.depends_on_task_id, d.created_at, d.updated_at, now],
    )
    .map_err(|e| write_error(e, &d.id))?;
    Ok(())
}

pub fn all_task_dependencies(conn: &Connection) -> Result<Vec<TaskDependency>> {
    query_all(
        conn,
        &format!("SELECT {TASK_DEP_COLS} FROM task_dependencies ORDER BY id"),
        row_to_task_dep,
    )
}

pub fn changed_task_dependencies(conn: &Connection) -> Result<Vec<TaskDependency>> {
    query_all(
        conn,
        &format!("SELECT {TASK_DEP_COLS} FROM task_dependencies WHERE is_synced = 0 ORDER BY id"),
        row_to_task_dep,
    )
}

fn row_to_entity_dep(row: &Row<'_>) -> rusqlite::Result<EntityDependency> {
    Ok(EntityDependency {
        id: row.get(0)?,
        entity_id: row.get(1)?,
        depends_on_entity_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

const ENTITY_DEP_COLS: &str = "id, entity_id, depends_on_entity_id, created_at, updated_at";

pub fn get_entity_dependency(conn: &Connection, id: &str) -> Result<Option<EntityDependency>> {
    conn.query_row(
        &format!("SELECT {ENTITY_DEP_COLS} FROM entity_dependencies WHERE id = ?1"),
        [id],
        row_to_entity_dep,
    )
    .optional()
    .map_err(Error::from)
}

/// Insert an entity dependency link. Duplicates surface as [`Error::Duplicate`].
pub fn insert_entity_dependency(conn: &Connection, d: &EntityDependency) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO entity_dependencies
            (id, entity_id, depends_on_entity_id, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![d.id, d.entity_id, d.depends_on_entity_id, d.created_at, d.updated_at, now],
    )
    .map_err(|e| write_error(e, &d.id))?;
    Ok(())
}

pub fn all_entity_dependencies(conn: &Connection) -> Result<Vec<EntityDependency>> {
    query_all(
        conn,
        &format!("SELECT {ENTITY_DEP_COLS} FROM entity_dependencies ORDER BY id"),
        row_to_entity_dep,
    )
}

pub fn changed_entity_dependencies(conn: &Connection) -> Result<Vec<EntityDependency>> {
    query_all(
        conn,
        &format!(
            "SELECT {ENTITY_DEP_COLS} FROM entity_dependencies WHERE is_synced = 0 ORDER BY id"
        ),
        row_to_entity_dep,
    )
}

// ==================
// Workflows
// ==================

fn row_to_workflow(row: &Row<'_>) -> rusqlite::Result<Workflow> {
    Ok(Workflow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

const WORKFLOW_COLS: &str = "id, name, description, created_at, updated_at";

pub fn get_workflow(conn: &Connection, id: &str) -> Result<Option<Workflow>> {
    conn.query_row(
        &format!("SELECT {WORKFLOW_COLS} FROM workflows WHERE id = ?1"),
        [id],
        row_to_workflow,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_workflow(conn: &Connection, w: &Workflow) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO workflows (id, name, description, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![w.id, w.name, w.description, w.created_at, w.updated_at, now],
    )
    .map_err(|e| write_error(e, &w.id))?;
    Ok(())
}

pub fn update_workflow(conn: &Connection, w: &Workflow) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE workflows SET name = ?2, description = ?3, updated_at = ?4, synced_at = ?5, is_synced = 1
         WHERE id = ?1",
        params![w.id, w.name, w.description, w.updated_at, now],
    )?;
    Ok(())
}

pub fn all_workflows(conn: &Connection) -> Result<Vec<Workflow>> {
    query_all(
        conn,
        &format!("SELECT {WORKFLOW_COLS} FROM workflows ORDER BY id"),
        row_to_workflow,
    )
}

pub fn changed_workflows(conn: &Connection) -> Result<Vec<Workflow>> {
    query_all(
        conn,
        &format!("SELECT {WORKFLOW_COLS} FROM workflows WHERE is_synced = 0 ORDER BY id"),
        row_to_workflow,
    )
}

fn row_to_workflow_link(row: &Row<'_>) -> rusqlite::Result<WorkflowLink> {
    Ok(WorkflowLink {
        id: row.get(0)?,
        workflow_id: row.get(1)?,
        from_node: row.get(2)?,
        to_node: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const WORKFLOW_LINK_COLS: &str = "id, workflow_id, from_node, to_node, created_at, updated_at";

pub fn get_workflow_link(conn: &Connection, id: &str) -> Result<Option<WorkflowLink>> {
    conn.query_row(
        &format!("SELECT {WORKFLOW_LINK_COLS} FROM workflow_links WHERE id = ?1"),
        [id],
        row_to_workflow_link,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_workflow_link(conn: &Connection, l: &WorkflowLink) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO workflow_links
            (id, workflow_id, from_node, to_node, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
        params![l.id, l.workflow_id, l.from_node, l.to_node, l.created_at, l.updated_at, now],
    )
    .map_err(|e| write_error(e, &l.id))?;
    Ok(())
}

pub fn update_workflow_link(conn: &Connection, l: &WorkflowLink) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "UPDATE workflow_links SET workflow_id = ?2, from_node = ?3, to_node = ?4,
             updated_at = ?5, synced_at = ?6, is_synced = 1
         WHERE id = ?1",
        params![l.id, l.workflow_id, l.from_node, l.to_node, l.updated_at, now],
    )?;
    Ok(())
}

pub fn all_workflow_links(conn: &Connection) -> Result<Vec<WorkflowLink>> {
    query_all(
        conn,
        &format!("SELECT {WORKFLOW_LINK_COLS} FROM workflow_links ORDER BY id"),
        row_to_workflow_link,
    )
}

pub fn changed_workflow_links(conn: &Connection) -> Result<Vec<WorkflowLink>> {
    query_all(
        conn,
        &format!("SELECT {WORKFLOW_LINK_COLS} FROM workflow_links WHERE is_synced = 0 ORDER BY id"),
        row_to_workflow_link,
    )
}

fn row_to_workflow_entity(row: &Row<'_>) -> rusqlite::Result<WorkflowEntity> {
    Ok(WorkflowEntity {
        id: row.get(0)?,
        workflow_id: row.get(1)?,
        entity_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

const WORKFLOW_ENTITY_COLS: &str = "id, workflow_id, entity_id, created_at, updated_at";

pub fn get_workflow_entity(conn: &Connection, id: &str) -> Result<Option<WorkflowEntity>> {
    conn.query_row(
        &format!("SELECT {WORKFLOW_ENTITY_COLS} FROM workflow_entities WHERE id = ?1"),
        [id],
        row_to_workflow_entity,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_workflow_entity(conn: &Connection, w: &WorkflowEntity) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO workflow_entities
            (id, workflow_id, entity_id, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![w.id, w.workflow_id, w.entity_id, w.created_at, w.updated_at, now],
    )
    .map_err(|e| write_error(e, &w.id))?;
    Ok(())
}

pub fn all_workflow_entities(conn: &Connection) -> Result<Vec<WorkflowEntity>> {
    query_all(
        conn,
        &format!("SELECT {WORKFLOW_ENTITY_COLS} FROM workflow_entities ORDER BY id"),
        row_to_workflow_entity,
    )
}

pub fn changed_workflow_entities(conn: &Connection) -> Result<Vec<WorkflowEntity>> {
    query_all(
        conn,
        &format!(
            "SELECT {WORKFLOW_ENTITY_COLS} FROM workflow_entities WHERE is_synced = 0 ORDER BY id"
        ),
        row_to_workflow_entity,
    )
}

fn row_to_workflow_task(row: &Row<'_>) -> rusqlite::Result<WorkflowTask> {
    Ok(WorkflowTask {
        id: row.get(0)?,
        workflow_id: row.get(1)?,
        task_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

const WORKFLOW_TASK_COLS: &str = "id, workflow_id, task_id, created_at, updated_at";

pub fn get_workflow_task(conn: &Connection, id: &str) -> Result<Option<WorkflowTask>> {
    conn.query_row(
        &format!("SELECT {WORKFLOW_TASK_COLS} FROM workflow_tasks WHERE id = ?1"),
        [id],
        row_to_workflow_task,
    )
    .optional()
    .map_err(Error::from)
}

pub fn insert_workflow_task(conn: &Connection, w: &WorkflowTask) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO workflow_tasks
            (id, workflow_id, task_id, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![w.id, w.workflow_id, w.task_id, w.created_at, w.updated_at, now],
    )
    .map_err(|e| write_error(e, &w.id))?;
    Ok(())
}

pub fn all_workflow_tasks(conn: &Connection) -> Result<Vec<WorkflowTask>> {
    query_all(
        conn,
        &format!("SELECT {WORKFLOW_TASK_COLS} FROM workflow_tasks ORDER BY id"),
        row_to_workflow_task,
    )
}

pub fn changed_workflow_tasks(conn: &Connection) -> Result<Vec<WorkflowTask>> {
    query_all(
        conn,
        &format!(
            "SELECT {WORKFLOW_TASK_COLS} FROM workflow_tasks WHERE is_synced = 0 ORDER BY id"
        ),
        row_to_workflow_task,
    )
}

// ==================
// Task Tags
// ==================

fn row_to_task_tag(row: &Row<'_>) -> rusqlite::Result<TaskTag> {
    Ok(TaskTag {
        id: row.get(0)?,
        task_id: row.get(1)?,
        tag_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

const TASK_TAG_COLS: &str = "id, task_id, tag_id, created_at, updated_at";

pub fn get_task_tag(conn: &Connection, id: &str) -> Result<Option<TaskTag>> {
    conn.query_row(
        &format!("SELECT {TASK_TAG_COLS} FROM task_tags WHERE id = ?1"),
        [id],
        row_to_task_tag,
    )
    .optional()
    .map_err(Error::from)
}

/// Insert a task-tag link. Duplicates surface as [`Error::Duplicate`].
pub fn insert_task_tag(conn: &Connection, t: &TaskTag) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO task_tags (id, task_id, tag_id, created_at, updated_at, synced_at, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![t.id, t.task_id, t.tag_id, t.created_at, t.updated_at, now],
    )
    .map_err(|e| write_error(e, &t.id))?;
    Ok(())
}

pub fn all_task_tags(conn: &Connection) -> Result<Vec<TaskTag>> {
    query_all(
        conn,
        &format!("SELECT {TASK_TAG_COLS} FROM task_tags ORDER BY id"),
        row_to_task_tag,
    )
}

pub fn changed_task_tags(conn: &Connection) -> Result<Vec<TaskTag>> {
    query_all(
        conn,
        &format!("SELECT {TASK_TAG_COLS} FROM task_tags WHERE is_synced = 0 ORDER BY id"),
        row_to_task_tag,
    )
}

// ==================
// Chunks
// ==================

pub fn chunk_exists(conn: &Connection, hash: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM chunks WHERE hash = ?1", [hash], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

/// Persist a chunk. Duplicate hashes are silently accepted: the store is
/// content-addressed, so an existing row is already the right payload.
pub fn insert_chunk(conn: &Connection, hash: &str, payload: &[u8]) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO chunks (hash, payload, size) VALUES (?1, ?2, ?3)",
        params![hash, payload, payload.len() as i64],
    )?;
    Ok(())
}

pub fn get_chunk_payload(conn: &Connection, hash: &str) -> Result<Option<Vec<u8>>> {
    conn.query_row(
        "SELECT payload FROM chunks WHERE hash = ?1",
        [hash],
        |row| row.get(0),
    )
    .optional()
    .map_err(Error::from)
}

/// Compressed size of a stored chunk, if present.
pub fn chunk_size(conn: &Connection, hash: &str) -> Result<Option<i64>> {
    conn.query_row("SELECT size FROM chunks WHERE hash = ?1", [hash], |row| {
        row.get(0)
    })
    .optional()
    .map_err(Error::from)
}

/// Subset of `hashes` absent from the chunk table, input order preserved.
pub fn missing_chunk_hashes(conn: &Connection, hashes: &[String]) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    for hash in hashes {
        if !chunk_exists(conn, hash)? {
            missing.push(hash.clone());
        }
    }
    Ok(missing)
}

// ==================
// Previews
// ==================

pub fn preview_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM previews WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

pub fn insert_preview(conn: &Connection, id: &str, data: &[u8]) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO previews (id, data) VALUES (?1, ?2)",
        params![id, data],
    )?;
    Ok(())
}

pub fn get_preview(conn: &Connection, id: &str) -> Result<Option<Vec<u8>>> {
    conn.query_row("SELECT data FROM previews WHERE id = ?1", [id], |row| {
        row.get(0)
    })
    .optional()
    .map_err(Error::from)
}

pub fn missing_preview_ids(conn: &Connection, ids: &[String]) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    for id in ids {
        if !preview_exists(conn, id)? {
            missing.push(id.clone());
        }
    }
    Ok(missing)
}

// ==================
// Trash / Tombstones
// ==================

pub fn add_trash(conn: &Connection, record_id: &str, deleted_at: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO trash (record_id, deleted_at) VALUES (?1, ?2)",
        params![record_id, deleted_at],
    )?;
    Ok(())
}

pub fn trash_tombstones(conn: &Connection) -> Result<Vec<Tombstone>> {
    query_all(
        conn,
        "SELECT record_id, deleted_at FROM trash ORDER BY deleted_at",
        |row| {
            Ok(Tombstone {
                id: row.get(0)?,
                deleted_at: row.get(1)?,
            })
        },
    )
}

pub fn clear_trash(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM trash", [])?;
    Ok(())
}

/// Delete a record id from every structured table.
///
/// Tombstone application does not know which kind of record an id named, so
/// the delete sweeps all tables; links go with their owners via cascades.
pub fn delete_record_everywhere(conn: &Connection, id: &str) -> Result<()> {
    for table in STRUCTURED_TABLES {
        conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
    }
    Ok(())
}

// ==================
// Sync Bookkeeping
// ==================

/// Mark every structured row as synced.
pub fn mark_all_synced(conn: &Connection, now: i64) -> Result<()> {
    for table in STRUCTURED_TABLES {
        conn.execute(
            &format!("UPDATE {table} SET is_synced = 1, synced_at = ?1 WHERE is_synced = 0"),
            [now],
        )?;
    }
    conn.execute(
        "UPDATE config SET sync_token_synced = 1, project_preview_synced = 1, working_dir_synced = 1
         WHERE id = 1",
        [],
    )?;
    Ok(())
}

pub fn count_unsynced(conn: &Connection, table: &str) -> Result<usize> {
    let n: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE is_synced = 0"),
        [],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(n).unwrap_or(0))
}

// ==================
// Config
// ==================

fn config_text(conn: &Connection, column: &str) -> Result<Option<String>> {
    conn.query_row(
        &format!("SELECT {column} FROM config WHERE id = 1"),
        [],
        |row| row.get(0),
    )
    .optional()
    .map_err(Error::from)
    .map(Option::flatten)
}

pub fn sync_token(conn: &Connection) -> Result<Option<String>> {
    config_text(conn, "sync_token")
}

/// Record the remote's sync token. Written inside the same transaction that
/// commits a full pull, so the fast path can never observe a token ahead of
/// the data it stands for.
pub fn set_sync_token(conn: &Connection, token: &str, now: i64) -> Result<()> {
    conn.execute(
        "UPDATE config SET sync_token = ?1, sync_token_updated_at = ?2, sync_token_synced = 1
         WHERE id = 1",
        params![token, now],
    )?;
    Ok(())
}

pub fn project_preview_id(conn: &Connection) -> Result<Option<String>> {
    config_text(conn, "project_preview_id")
}

pub fn set_project_preview_id(conn: &Connection, preview_id: &str, now: i64) -> Result<()> {
    conn.execute(
        "UPDATE config SET project_preview_id = ?1, project_preview_updated_at = ?2 WHERE id = 1",
        params![preview_id, now],
    )?;
    Ok(())
}

pub fn server_url(conn: &Connection) -> Result<Option<String>> {
    config_text(conn, "server_url")
}

pub fn set_server_url(conn: &Connection, url: &str) -> Result<()> {
    conn.execute("UPDATE config SET server_url = ?1 WHERE id = 1", [url])?;
    Ok(())
}

pub fn user_id(conn: &Connection) -> Result<Option<String>> {
    config_text(conn, "user_id")
}

pub fn set_user_id(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("UPDATE config SET user_id = ?1 WHERE id = 1", [id])?;
    Ok(())
}

pub fn working_dir(conn: &Connection) -> Result<Option<String>> {
    config_text(conn, "working_dir")
}

pub fn set_working_dir(conn: &Connection, dir: &str, now: i64) -> Result<()> {
    conn.execute(
        "UPDATE config SET working_dir = ?1, working_dir_updated_at = ?2, working_dir_synced = 0
         WHERE id = 1",
        params![dir, now],
    )?;
    Ok(())
}
