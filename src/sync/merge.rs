//! Merge writer: applies a remote dataset to the local store.
//!
//! Processing order is fixed and dependency-respecting so referential
//! validation never sees a child before its parent. Per record the rule is:
//! tombstone wins, then create-if-absent, then overwrite only if the
//! incoming copy is strictly newer (equal timestamps keep local).

use std::collections::HashSet;

use rusqlite::Connection;

use crate::error::Error;
use crate::model::{Entity, User};
use crate::storage::sqlite as store;
use crate::sync::dataset::{self, ProjectData, topological_sort};
use crate::sync::types::{MergeStats, SyncError, SyncResult};

/// How a dataset is written into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Create-or-update-if-newer with tombstone filtering.
    ///
    /// With `strict` set, every chunk and preview referenced by the incoming
    /// dataset must already exist locally or the whole application fails
    /// before any row is written. Push paths use this so the remote never
    /// receives a dataset referencing data it won't also receive.
    Merge { strict: bool },
    /// Unconditional insert of every record.
    ///
    /// Assumes the destination tables are empty (from-scratch initial pull)
    /// and bypasses tombstone filtering because no local writes exist yet.
    Overwrite,
}

/// Apply a dataset to the store under the given mode.
///
/// Runs against whatever connection it is given; callers wrap it in their
/// transaction so a failure rolls back the whole application.
///
/// # Errors
///
/// Strict-mode consistency failures ([`SyncError::MissingChunks`],
/// [`SyncError::MissingPreviews`]), ordering failures from the entity sort,
/// or any storage error.
pub fn apply_dataset(
    conn: &Connection,
    data: &ProjectData,
    mode: MergeMode,
) -> SyncResult<MergeStats> {
    if let MergeMode::Merge { strict: true } = mode {
        validate_references(conn, data)?;
    }

    let overwrite = mode == MergeMode::Overwrite;
    let tombstones: HashSet<&str> = if overwrite {
        HashSet::new()
    } else {
        data.tombstones.iter().map(|t| t.id.as_str()).collect()
    };

    let mut stats = MergeStats::default();

    // Deletion wins: clear tombstoned ids before applying records.
    if !overwrite {
        for tombstone in &data.tombstones {
            store::delete_record_everywhere(conn, &tombstone.id)?;
            stats.deleted += 1;
        }
    }

    merge_records(
        conn,
        &data.roles,
        &tombstones,
        overwrite,
        &mut stats,
        |r| (&r.id, r.updated_at),
        store::get_role,
        store::insert_role,
        store::update_role,
    )?;

    merge_users(conn, &data.users, &tombstones, overwrite, &mut stats)?;

    merge_records(
        conn,
        &data.entity_types,
        &tombstones,
        overwrite,
        &mut stats,
        |t| (&t.id, t.updated_at),
        store::get_entity_type,
        store::insert_entity_type,
        store::update_entity_type,
    )?;

    merge_records(
        conn,
        &data.task_types,
        &tombstones,
        overwrite,
        &mut stats,
        |t| (&t.id, t.updated_at),
        store::get_task_type,
        store::insert_task_type,
        store::update_task_type,
    )?;

    merge_records(
        conn,
        &data.statuses,
        &tombstones,
        overwrite,
        &mut stats,
        |s| (&s.id, s.updated_at),
        store::get_status,
        store::insert_status,
        store::update_status,
    )?;

    merge_records(
        conn,
        &data.tags,
        &tombstones,
        overwrite,
        &mut stats,
        |t| (&t.id, t.updated_at),
        store::get_tag,
        store::insert_tag,
        store::update_tag,
    )?;

    merge_entities(conn, &data.entities, &tombstones, overwrite, &mut stats)?;

    merge_records(
        conn,
        &data.tasks,
        &tombstones,
        overwrite,
        &mut stats,
        |t| (&t.id, t.updated_at),
        store::get_task,
        store::insert_task,
        store::update_task,
    )?;

    merge_records(
        conn,
        &data.checkpoints,
        &tombstones,
        overwrite,
        &mut stats,
        |c| (&c.id, c.updated_at),
        store::get_checkpoint,
        store::insert_checkpoint,
        store::update_checkpoint,
    )?;

    merge_links(
        conn,
        &data.task_dependencies,
        &tombstones,
        &mut stats,
        |d| &d.id,
        store::get_task_dependency,
        store::insert_task_dependency,
    )?;

    merge_links(
        conn,
        &data.entity_dependencies,
        &tombstones,
        &mut stats,
        |d| &d.id,
        store::get_entity_dependency,
        store::insert_entity_dependency,
    )?;

    merge_records(
        conn,
        &data.templates,
        &tombstones,
        overwrite,
        &mut stats,
        |t| (&t.id, t.updated_at),
        store::get_template,
        store::insert_template,
        store::update_template,
    )?;

    merge_records(
        conn,
        &data.workflows,
        &tombstones,
        overwrite,
        &mut stats,
        |w| (&w.id, w.updated_at),
        store::get_workflow,
        store::insert_workflow,
        store::update_workflow,
    )?;

    merge_records(
        conn,
        &data.workflow_links,
        &tombstones,
        overwrite,
        &mut stats,
        |l| (&l.id, l.updated_at),
        store::get_workflow_link,
        store::insert_workflow_link,
        store::update_workflow_link,
    )?;

    merge_links(
        conn,
        &data.workflow_entities,
        &tombstones,
        &mut stats,
        |w| &w.id,
        store::get_workflow_entity,
        store::insert_workflow_entity,
    )?;

    merge_links(
        conn,
        &data.workflow_tasks,
        &tombstones,
        &mut stats,
        |w| &w.id,
        store::get_workflow_task,
        store::insert_workflow_task,
    )?;

    merge_links(
        conn,
        &data.task_tags,
        &tombstones,
        &mut stats,
        |t| &t.id,
        store::get_task_tag,
        store::insert_task_tag,
    )?;

    Ok(stats)
}

/// Strict-mode pre-validation: every referenced chunk and preview must
/// already be present locally.
fn validate_references(conn: &Connection, data: &ProjectData) -> SyncResult<()> {
    let chunks = dataset::referenced_chunks(data);
    let missing = store::missing_chunk_hashes(conn, &chunks)?;
    if !missing.is_empty() {
        return Err(SyncError::MissingChunks {
            count: missing.len(),
        });
    }

    let previews = dataset::referenced_previews(data);
    let missing = store::missing_preview_ids(conn, &previews)?;
    if !missing.is_empty() {
        return Err(SyncError::MissingPreviews {
            count: missing.len(),
        });
    }

    Ok(())
}

/// Generic create-or-update-if-newer application for one collection.
#[allow(clippy::too_many_arguments)]
fn merge_records<T, K, G, I, U>(
    conn: &Connection,
    records: &[T],
    tombstones: &HashSet<&str>,
    overwrite: bool,
    stats: &mut MergeStats,
    key: K,
    get: G,
    insert: I,
    update: U,
) -> SyncResult<()>
where
    K: Fn(&T) -> (&String, i64),
    G: Fn(&Connection, &str) -> crate::error::Result<Option<T>>,
    I: Fn(&Connection, &T) -> crate::error::Result<()>,
    U: Fn(&Connection, &T) -> crate::error::Result<()>,
{
    for record in records {
        let (id, incoming_mtime) = key(record);

        if overwrite {
            insert(conn, record)?;
            stats.created += 1;
            continue;
        }

        if tombstones.contains(id.as_str()) {
            stats.suppressed += 1;
            continue;
        }

        match get(conn, id)? {
            None => {
                insert(conn, record)?;
                stats.created += 1;
            }
            Some(local) => {
                let (_, local_mtime) = key(&local);
                if incoming_mtime > local_mtime {
                    update(conn, record)?;
                    stats.updated += 1;
                } else {
                    stats.skipped += 1;
                }
            }
        }
    }
    Ok(())
}

/// Users merge with role reassignment as the only mutation.
fn merge_users(
    conn: &Connection,
    users: &[User],
    tombstones: &HashSet<&str>,
    overwrite: bool,
    stats: &mut MergeStats,
) -> SyncResult<()> {
    for user in users {
        if overwrite {
            store::insert_user(conn, user)?;
            stats.created += 1;
            continue;
        }

        if tombstones.contains(user.id.as_str()) {
            stats.suppressed += 1;
            continue;
        }

        match store::get_user(conn, &user.id)? {
            None => {
                store::insert_user(conn, user)?;
                stats.created += 1;
            }
            Some(local) => {
                if user.updated_at > local.updated_at && user.role_id != local.role_id {
                    store::update_user_role(
                        conn,
                        &user.id,
                        user.role_id.as_deref(),
                        user.updated_at,
                    )?;
                    stats.updated += 1;
                } else {
                    stats.skipped += 1;
                }
            }
        }
    }
    Ok(())
}

/// Entities merge: topologically ordered, with field-minimal updates.
fn merge_entities(
    conn: &Connection,
    entities: &[Entity],
    tombstones: &HashSet<&str>,
    overwrite: bool,
    stats: &mut MergeStats,
) -> SyncResult<()> {
    let known = store::existing_entity_ids(conn)?;
    let sorted = topological_sort(entities.to_vec(), &known)?;

    for entity in &sorted {
        if overwrite {
            store::insert_entity(conn, entity)?;
            stats.created += 1;
            continue;
        }

        if tombstones.contains(entity.id.as_str()) {
            stats.suppressed += 1;
            continue;
        }

        match store::get_entity(conn, &entity.id)? {
            None => {
                store::insert_entity(conn, entity)?;
                stats.created += 1;
            }
            Some(local) => {
                if entity.updated_at > local.updated_at {
                    store::update_entity_core(conn, entity)?;
                    // Structural sub-fields are written only when they
                    // actually differ, to keep write amplification down.
                    if entity.parent_id != local.parent_id {
                        store::update_entity_parent(conn, &entity.id, entity.parent_id.as_deref())?;
                    }
                    if entity.preview_id != local.preview_id {
                        store::update_entity_preview(
                            conn,
                            &entity.id,
                            entity.preview_id.as_deref(),
                        )?;
                    }
                    if entity.is_library != local.is_library {
                        store::update_entity_library(conn, &entity.id, entity.is_library)?;
                    }
                    stats.updated += 1;
                } else {
                    stats.skipped += 1;
                }
            }
        }
    }
    Ok(())
}

/// Insert-only link application.
///
/// Links are immutable: present-by-id is a skip, and a UNIQUE violation on
/// the link pair (same edge under another id) is a benign skip to tolerate
/// redundant re-application.
fn merge_links<T, K, G, I>(
    conn: &Connection,
    links: &[T],
    tombstones: &HashSet<&str>,
    stats: &mut MergeStats,
    key: K,
    get: G,
    insert: I,
) -> SyncResult<()>
where
    K: Fn(&T) -> &String,
    G: Fn(&Connection, &str) -> crate::error::Result<Option<T>>,
    I: Fn(&Connection, &T) -> crate::error::Result<()>,
{
    for link in links {
        let id = key(link);

        if tombstones.contains(id.as_str()) {
            stats.suppressed += 1;
            continue;
        }

        if get(conn, id)?.is_some() {
            stats.skipped += 1;
            continue;
        }

        match insert(conn, link) {
            Ok(()) => stats.created += 1,
            Err(Error::Duplicate { .. }) => stats.duplicate_links += 1,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, Task, TaskDependency, Template, Tombstone};
    use crate::storage::SqliteStorage;

    fn role(id: &str, name: &str, updated_at: i64) -> Role {
        Role {
            id: id.to_string(),
            name: name.to_string(),
            created_at: 1_000,
            updated_at,
        }
    }

    fn task(id: &str, name: &str, updated_at: i64) -> Task {
        Task {
            id: id.to_string(),
            name: name.to_string(),
            entity_id: None,
            task_type_id: "tt".to_string(),
            status_id: None,
            assignee_id: None,
            is_dependency: false,
            preview_id: None,
            created_at: 1_000,
            updated_at,
        }
    }

    fn dep(id: &str, task: &str, on: &str) -> TaskDependency {
        TaskDependency {
            id: id.to_string(),
            task_id: task.to_string(),
            depends_on_task_id: on.to_string(),
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    #[test]
    fn test_merge_creates_absent_records() {
        let storage = SqliteStorage::open_memory().unwrap();
        let mut data = ProjectData::default();
        data.roles.push(role("r1", "artist", 1_000));
        data.tasks.push(task("t1", "model hero", 1_000));

        let stats =
            apply_dataset(storage.conn(), &data, MergeMode::Merge { strict: false }).unwrap();
        assert_eq!(stats.created, 2);
        assert!(store::get_task(storage.conn(), "t1").unwrap().is_some());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let storage = SqliteStorage::open_memory().unwrap();
        let mut data = ProjectData::default();
        data.roles.push(role("r1", "artist", 1_000));
        data.tasks.push(task("t1", "model hero", 1_000));
        data.task_dependencies.push(dep("d1", "t1", "t2"));

        apply_dataset(storage.conn(), &data, MergeMode::Merge { strict: false }).unwrap();
        let second =
            apply_dataset(storage.conn(), &data, MergeMode::Merge { strict: false }).unwrap();

        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.skipped, 3);

        let tasks = store::all_tasks(storage.conn()).unwrap();
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_last_writer_wins() {
        let storage = SqliteStorage::open_memory().unwrap();

        let mut data = ProjectData::default();
        data.tasks.push(task("t1", "local name", 10));
        apply_dataset(storage.conn(), &data, MergeMode::Merge { strict: false }).unwrap();

        // Older incoming copy keeps local.
        let mut older = ProjectData::default();
        older.tasks.push(task("t1", "stale name", 5));
        let stats =
            apply_dataset(storage.conn(), &older, MergeMode::Merge { strict: false }).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(
            store::get_task(storage.conn(), "t1").unwrap().unwrap().name,
            "local name"
        );

        // Equal timestamps keep local too.
        let mut equal = ProjectData::default();
        equal.tasks.push(task("t1", "same age", 10));
        let stats =
            apply_dataset(storage.conn(), &equal, MergeMode::Merge { strict: false }).unwrap();
        assert_eq!(stats.skipped, 1);

        // Newer incoming copy replaces.
        let mut newer = ProjectData::default();
        newer.tasks.push(task("t1", "fresh name", 15));
        let stats =
            apply_dataset(storage.conn(), &newer, MergeMode::Merge { strict: false }).unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(
            store::get_task(storage.conn(), "t1").unwrap().unwrap().name,
            "fresh name"
        );
    }

    #[test]
    fn test_tombstone_precedence() {
        let storage = SqliteStorage::open_memory().unwrap();

        // Record exists locally before the merge.
        let mut seed = ProjectData::default();
        seed.tasks.push(task("t_dead", "doomed", 1_000));
        apply_dataset(storage.conn(), &seed, MergeMode::Merge { strict: false }).unwrap();

        // Incoming dataset carries both the record and its tombstone.
        let mut data = ProjectData::default();
        data.tasks.push(task("t_dead", "resurrected?", 9_000));
        data.tombstones.push(Tombstone {
            id: "t_dead".to_string(),
            deleted_at: 5_000,
        });

        let stats =
            apply_dataset(storage.conn(), &data, MergeMode::Merge { strict: false }).unwrap();
        assert_eq!(stats.suppressed, 1);
        assert_eq!(stats.deleted, 1);
        assert!(store::get_task(storage.conn(), "t_dead").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_dependency_link_is_benign() {
        let storage = SqliteStorage::open_memory().unwrap();

        let mut data = ProjectData::default();
        data.task_dependencies.push(dep("d1", "t1", "t2"));
        apply_dataset(storage.conn(), &data, MergeMode::Merge { strict: false }).unwrap();

        // Same edge under a different id: UNIQUE(task_id, depends_on_task_id)
        // fires and the merge carries on.
        let mut redundant = ProjectData::default();
        redundant.task_dependencies.push(dep("d2", "t1", "t2"));
        redundant.tasks.push(task("t_after", "still applied", 1));

        let stats =
            apply_dataset(storage.conn(), &redundant, MergeMode::Merge { strict: false })
                .unwrap();
        assert_eq!(stats.duplicate_links, 1);
        assert!(store::get_task(storage.conn(), "t_after").unwrap().is_some());
    }

    #[test]
    fn test_overwrite_ignores_tombstones_and_timestamps() {
        let storage = SqliteStorage::open_memory().unwrap();

        let mut data = ProjectData::default();
        data.tasks.push(task("t1", "fresh", 1));
        data.tombstones.push(Tombstone {
            id: "t1".to_string(),
            deleted_at: 9_000,
        });

        let stats = apply_dataset(storage.conn(), &data, MergeMode::Overwrite).unwrap();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.suppressed, 0);
        assert!(store::get_task(storage.conn(), "t1").unwrap().is_some());
    }

    #[test]
    fn test_strict_mode_missing_chunks() {
        let storage = SqliteStorage::open_memory().unwrap();

        let mut data = ProjectData::default();
        data.templates.push(Template {
            id: "tpl1".into(),
            name: "base".into(),
            file_name: None,
            chunk_hashes: "nowhere_to_be_found".into(),
            checksum: "c".into(),
            file_size: 10,
            created_at: 0,
            updated_at: 0,
        });

        let err = apply_dataset(storage.conn(), &data, MergeMode::Merge { strict: true })
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingChunks { count: 1 }));

        // Nothing was partially applied.
        assert!(store::all_templates(storage.conn()).unwrap().is_empty());
    }

    #[test]
    fn test_strict_mode_passes_when_data_present() {
        let storage = SqliteStorage::open_memory().unwrap();
        store::insert_chunk(storage.conn(), "have_it", b"x").unwrap();

        let mut data = ProjectData::default();
        data.templates.push(Template {
            id: "tpl1".into(),
            name: "base".into(),
            file_name: None,
            chunk_hashes: "have_it".into(),
            checksum: "c".into(),
            file_size: 10,
            created_at: 0,
            updated_at: 0,
        });

        let stats =
            apply_dataset(storage.conn(), &data, MergeMode::Merge { strict: true }).unwrap();
        assert_eq!(stats.created, 1);
    }

    #[test]
    fn test_user_merge_is_role_reassignment_only() {
        let storage = SqliteStorage::open_memory().unwrap();

        let mut seed = ProjectData::default();
        seed.users.push(User {
            id: "u1".into(),
            name: "Dana".into(),
            email: None,
            role_id: Some("r_artist".into()),
            created_at: 1_000,
            updated_at: 1_000,
        });
        apply_dataset(storage.conn(), &seed, MergeMode::Merge { strict: false }).unwrap();

        let mut update = ProjectData::default();
        update.users.push(User {
            id: "u1".into(),
            name: "Renamed Elsewhere".into(),
            email: None,
            role_id: Some("r_lead".into()),
            created_at: 1_000,
            updated_at: 2_000,
        });
        apply_dataset(storage.conn(), &update, MergeMode::Merge { strict: false }).unwrap();

        let local = store::get_user(storage.conn(), "u1").unwrap().unwrap();
        assert_eq!(local.role_id.as_deref(), Some("r_lead"));
        assert_eq!(local.name, "Dana", "only the role is reassigned");
    }

    #[test]
    fn test_entity_merge_minimal_subfield_writes() {
        let storage = SqliteStorage::open_memory().unwrap();

        let mut seed = ProjectData::default();
        let mut entity = crate::sync::dataset::tests::make_entity("e1", None);
        entity.preview_id = Some("pv_old".into());
        seed.entities.push(entity);
        apply_dataset(storage.conn(), &seed, MergeMode::Merge { strict: false }).unwrap();

        let mut update = ProjectData::default();
        let mut entity = crate::sync::dataset::tests::make_entity("e1", None);
        entity.preview_id = Some("pv_new".into());
        entity.is_library = true;
        entity.updated_at = 2_000;
        update.entities.push(entity);
        apply_dataset(storage.conn(), &update, MergeMode::Merge { strict: false }).unwrap();

        let local = store::get_entity(storage.conn(), "e1").unwrap().unwrap();
        assert_eq!(local.preview_id.as_deref(), Some("pv_new"));
        assert!(local.is_library);
    }
}
