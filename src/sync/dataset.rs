//! The dataset snapshot and its differ.
//!
//! `ProjectData` is the transient bundle of every syncable collection,
//! materialized per sync call either from local rows or from a decoded
//! remote transfer. The differ computes what the local store is missing:
//! preview ids and chunk hashes, the latter restricted by the pull policy.

use std::collections::{HashMap, HashSet, VecDeque};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::model::{
    Checkpoint, Entity, EntityDependency, EntityType, Role, Status, Tag, Task, TaskDependency,
    TaskTag, TaskType, Template, Tombstone, User, Workflow, WorkflowEntity, WorkflowLink,
    WorkflowTask,
};
use crate::storage::sqlite as store;
use crate::sync::types::{SyncError, SyncOptions, SyncResult};

/// The full or delta bundle of structured records exchanged during sync.
///
/// A value object: never persisted as a unit, rebuilt per call.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProjectData {
    pub roles: Vec<Role>,
    pub users: Vec<User>,
    pub entity_types: Vec<EntityType>,
    pub task_types: Vec<TaskType>,
    pub statuses: Vec<Status>,
    pub tags: Vec<Tag>,
    pub entities: Vec<Entity>,
    pub tasks: Vec<Task>,
    pub checkpoints: Vec<Checkpoint>,
    pub task_dependencies: Vec<TaskDependency>,
    pub entity_dependencies: Vec<EntityDependency>,
    pub templates: Vec<Template>,
    pub workflows: Vec<Workflow>,
    pub workflow_links: Vec<WorkflowLink>,
    pub workflow_entities: Vec<WorkflowEntity>,
    pub workflow_tasks: Vec<WorkflowTask>,
    pub task_tags: Vec<TaskTag>,
    pub project_preview_id: Option<String>,
    pub tombstones: Vec<Tombstone>,
}

impl ProjectData {
    /// True iff every collection is empty and the preview reference is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
            && self.users.is_empty()
            && self.entity_types.is_empty()
            && self.task_types.is_empty()
            && self.statuses.is_empty()
            && self.tags.is_empty()
            && self.entities.is_empty()
            && self.tasks.is_empty()
            && self.checkpoints.is_empty()
            && self.task_dependencies.is_empty()
            && self.entity_dependencies.is_empty()
            && self.templates.is_empty()
            && self.workflows.is_empty()
            && self.workflow_links.is_empty()
            && self.workflow_entities.is_empty()
            && self.workflow_tasks.is_empty()
            && self.task_tags.is_empty()
            && self.project_preview_id.as_deref().unwrap_or("").is_empty()
            && self.tombstones.is_empty()
    }

    /// Total number of structured records (tombstones excluded).
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.roles.len()
            + self.users.len()
            + self.entity_types.len()
            + self.task_types.len()
            + self.statuses.len()
            + self.tags.len()
            + self.entities.len()
            + self.tasks.len()
            + self.checkpoints.len()
            + self.task_dependencies.len()
            + self.entity_dependencies.len()
            + self.templates.len()
            + self.workflows.len()
            + self.workflow_links.len()
            + self.workflow_entities.len()
            + self.workflow_tasks.len()
            + self.task_tags.len()
    }
}

/// Chunk requirements computed for a pull.
#[derive(Debug, Default, Clone)]
pub struct ChunkRequirements {
    /// Referenced hashes absent from the local store, first-seen order.
    pub missing: Vec<String>,
    /// Every hash referenced by the in-scope artifacts, first-seen order.
    pub referenced: Vec<String>,
    /// Sum of the declared file sizes of artifacts with at least one missing
    /// chunk. Whole-artifact sizes, for progress display only.
    pub total_bytes: u64,
}

/// Order entities so every record appears after its parent.
///
/// `known` holds entity ids already present in the destination store; a
/// parent reference into `known` is satisfied without appearing in the
/// input. The output is a valid bulk-insert order.
///
/// # Errors
///
/// [`SyncError::UnresolvedParent`] if an entity references a parent that is
/// neither in the input nor in `known`; [`SyncError::EntityCycle`] if the
/// parent graph has no valid order. Never returns a partial order.
pub fn topological_sort(
    entities: Vec<Entity>,
    known: &HashSet<String>,
) -> SyncResult<Vec<Entity>> {
    let ids: HashSet<String> = entities.iter().map(|e| e.id.clone()).collect();

    // children[parent] -> indexes of entities waiting on that parent
    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut queue: VecDeque<usize> = VecDeque::new();

    for (idx, entity) in entities.iter().enumerate() {
        match entity.parent_id.as_deref() {
            None => queue.push_back(idx),
            Some(parent) if !ids.contains(parent) => {
                if known.contains(parent) {
                    queue.push_back(idx);
                } else {
                    return Err(SyncError::UnresolvedParent {
                        entity_id: entity.id.clone(),
                        parent_id: parent.to_string(),
                    });
                }
            }
            Some(parent) => children.entry(parent).or_default().push(idx),
        }
    }

    let mut order: Vec<usize> = Vec::with_capacity(entities.len());
    while let Some(idx) = queue.pop_front() {
        order.push(idx);
        if let Some(waiting) = children.remove(entities[idx].id.as_str()) {
            for child in waiting {
                queue.push_back(child);
            }
        }
    }

    if order.len() < entities.len() {
        return Err(SyncError::EntityCycle {
            count: entities.len() - order.len(),
        });
    }

    // Consume the input in sorted order without cloning records.
    let mut slots: Vec<Option<Entity>> = entities.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .map(|idx| slots[idx].take().expect("each index emitted once"))
        .collect())
}

/// Preview ids referenced anywhere in the dataset but absent locally.
///
/// # Errors
///
/// Returns an error if the preview lookup fails.
pub fn missing_previews(data: &ProjectData, conn: &Connection) -> SyncResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut missing = Vec::new();

    let candidates = data
        .entities
        .iter()
        .filter_map(|e| e.preview_id.as_deref())
        .chain(data.tasks.iter().filter_map(|t| t.preview_id.as_deref()))
        .chain(data.project_preview_id.as_deref())
        .filter(|id| !id.is_empty());

    for id in candidates {
        if !seen.insert(id.to_string()) {
            continue;
        }
        if !store::preview_exists(conn, id)? {
            missing.push(id.to_string());
        }
    }

    Ok(missing)
}

/// Compute the chunk hashes the local store is missing.
///
/// Only the latest checkpoint per task is considered (highest revision, ties
/// broken by most recent creation timestamp), plus all templates. Tasks are
/// selected by policy: assigned to `user_id`, flagged as dependencies when
/// `pull_dependencies` is set, or everything when `pull_everything` is set.
///
/// # Errors
///
/// Returns an error if a chunk existence lookup fails.
pub fn missing_chunks(
    data: &ProjectData,
    conn: &Connection,
    user_id: Option<&str>,
    opts: &SyncOptions,
) -> SyncResult<ChunkRequirements> {
    let selected: HashSet<&str> = data
        .tasks
        .iter()
        .filter(|task| {
            opts.pull_everything
                || (opts.pull_dependencies && task.is_dependency)
                || (user_id.is_some() && task.assignee_id.as_deref() == user_id)
        })
        .map(|task| task.id.as_str())
        .collect();

    // Latest checkpoint per selected task.
    let mut latest: HashMap<&str, &Checkpoint> = HashMap::new();
    for cp in &data.checkpoints {
        if !selected.contains(cp.task_id.as_str()) {
            continue;
        }
        let newer = match latest.get(cp.task_id.as_str()) {
            None => true,
            Some(best) => {
                cp.revision > best.revision
                    || (cp.revision == best.revision && cp.created_at > best.created_at)
            }
        };
        if newer {
            latest.insert(cp.task_id.as_str(), cp);
        }
    }

    let mut req = ChunkRequirements::default();
    let mut seen_referenced = HashSet::new();
    let mut seen_missing = HashSet::new();

    let artifacts = latest
        .into_values()
        .map(|cp| (cp.chunk_list(), cp.file_size))
        .chain(
            data.templates
                .iter()
                .map(|tpl| (tpl.chunk_list(), tpl.file_size)),
        );

    for (hashes, file_size) in artifacts {
        let mut artifact_incomplete = false;
        for hash in hashes {
            if seen_referenced.insert(hash.clone()) {
                req.referenced.push(hash.clone());
            }
            if seen_missing.contains(&hash) {
                artifact_incomplete = true;
                continue;
            }
            if !store::chunk_exists(conn, &hash)? {
                artifact_incomplete = true;
                seen_missing.insert(hash.clone());
                req.missing.push(hash);
            }
        }
        if artifact_incomplete {
            req.total_bytes += u64::try_from(file_size).unwrap_or(0);
        }
    }

    Ok(req)
}

/// Build a dataset from every local row.
///
/// Used on the up-to-date pull path: the structured data is already local,
/// so the differ runs against this snapshot with zero `/data` requests.
///
/// # Errors
///
/// Returns an error if any table read fails.
pub fn load_full(conn: &Connection) -> SyncResult<ProjectData> {
    Ok(ProjectData {
        roles: store::all_roles(conn)?,
        users: store::all_users(conn)?,
        entity_types: store::all_entity_types(conn)?,
        task_types: store::all_task_types(conn)?,
        statuses: store::all_statuses(conn)?,
        tags: store::all_tags(conn)?,
        entities: store::all_entities(conn)?,
        tasks: store::all_tasks(conn)?,
        checkpoints: store::all_checkpoints(conn)?,
        task_dependencies: store::all_task_dependencies(conn)?,
        entity_dependencies: store::all_entity_dependencies(conn)?,
        templates: store::all_templates(conn)?,
        workflows: store::all_workflows(conn)?,
        workflow_links: store::all_workflow_links(conn)?,
        workflow_entities: store::all_workflow_entities(conn)?,
        workflow_tasks: store::all_workflow_tasks(conn)?,
        task_tags: store::all_task_tags(conn)?,
        project_preview_id: store::project_preview_id(conn)?,
        tombstones: Vec::new(),
    })
}

/// Build a delta dataset from unsynced rows plus pending deletions.
///
/// This is the push payload; an empty result means there is nothing to send.
///
/// # Errors
///
/// Returns an error if any table read fails.
pub fn load_changed(conn: &Connection) -> SyncResult<ProjectData> {
    Ok(ProjectData {
        roles: store::changed_roles(conn)?,
        users: store::changed_users(conn)?,
        entity_types: store::changed_entity_types(conn)?,
        task_types: store::changed_task_types(conn)?,
        statuses: store::changed_statuses(conn)?,
        tags: store::changed_tags(conn)?,
        entities: store::changed_entities(conn)?,
        tasks: store::changed_tasks(conn)?,
        checkpoints: store::changed_checkpoints(conn)?,
        task_dependencies: store::changed_task_dependencies(conn)?,
        entity_dependencies: store::changed_entity_dependencies(conn)?,
        templates: store::changed_templates(conn)?,
        workflows: store::changed_workflows(conn)?,
        workflow_links: store::changed_workflow_links(conn)?,
        workflow_entities: store::changed_workflow_entities(conn)?,
        workflow_tasks: store::changed_workflow_tasks(conn)?,
        task_tags: store::changed_task_tags(conn)?,
        project_preview_id: None,
        tombstones: store::trash_tombstones(conn)?,
    })
}

/// Every chunk hash referenced by the dataset's checkpoints and templates,
/// first-seen order. Used by push to ask the remote what it is missing.
#[must_use]
pub fn referenced_chunks(data: &ProjectData) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for hashes in data
        .checkpoints
        .iter()
        .map(Checkpoint::chunk_list)
        .chain(data.templates.iter().map(Template::chunk_list))
    {
        for hash in hashes {
            if seen.insert(hash.clone()) {
                out.push(hash);
            }
        }
    }
    out
}

/// Every preview id referenced by the dataset, first-seen order.
#[must_use]
pub fn referenced_previews(data: &ProjectData) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let candidates = data
        .entities
        .iter()
        .filter_map(|e| e.preview_id.as_deref())
        .chain(data.tasks.iter().filter_map(|t| t.preview_id.as_deref()))
        .chain(data.project_preview_id.as_deref())
        .filter(|id| !id.is_empty());
    for id in candidates {
        if seen.insert(id.to_string()) {
            out.push(id.to_string());
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    pub(crate) fn make_entity(id: &str, parent: Option<&str>) -> Entity {
        Entity {
            id: id.to_string(),
            name: id.to_string(),
            parent_id: parent.map(String::from),
            entity_type_id: "et_shot".to_string(),
            preview_id: None,
            is_library: false,
            description: None,
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    fn make_task(id: &str, assignee: Option<&str>, is_dependency: bool) -> Task {
        Task {
            id: id.to_string(),
            name: id.to_string(),
            entity_id: None,
            task_type_id: "tt_model".to_string(),
            status_id: None,
            assignee_id: assignee.map(String::from),
            is_dependency,
            preview_id: None,
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    fn make_checkpoint(id: &str, task: &str, revision: i64, hashes: &str, size: i64) -> Checkpoint {
        Checkpoint {
            id: id.to_string(),
            task_id: task.to_string(),
            revision,
            chunk_hashes: hashes.to_string(),
            checksum: "c".to_string(),
            file_size: size,
            comment: None,
            author_id: None,
            created_at: 1_000 + revision,
            updated_at: 1_000 + revision,
        }
    }

    #[test]
    fn test_is_empty() {
        let mut data = ProjectData::default();
        assert!(data.is_empty());

        data.project_preview_id = Some(String::new());
        assert!(data.is_empty(), "blank preview reference is still empty");

        data.tombstones.push(Tombstone {
            id: "x".into(),
            deleted_at: 1,
        });
        assert!(!data.is_empty(), "a deletion-only dataset is not empty");
    }

    #[test]
    fn test_topological_sort_children_after_parents() {
        let entities = vec![
            make_entity("c", Some("b")),
            make_entity("a", None),
            make_entity("b", Some("a")),
            make_entity("d", Some("a")),
        ];
        let sorted = topological_sort(entities, &HashSet::new()).unwrap();

        let pos: HashMap<&str, usize> = sorted
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.as_str(), i))
            .collect();
        assert!(pos["a"] < pos["b"]);
        assert!(pos["b"] < pos["c"]);
        assert!(pos["a"] < pos["d"]);
        assert_eq!(sorted.len(), 4);
    }

    #[test]
    fn test_topological_sort_cycle_is_error() {
        let entities = vec![
            make_entity("a", Some("b")),
            make_entity("b", Some("a")),
            make_entity("r", None),
        ];
        let err = topological_sort(entities, &HashSet::new()).unwrap_err();
        assert!(matches!(err, SyncError::EntityCycle { count: 2 }));
    }

    #[test]
    fn test_topological_sort_unresolved_parent_is_error() {
        let entities = vec![make_entity("a", Some("ghost"))];
        let err = topological_sort(entities, &HashSet::new()).unwrap_err();
        assert!(matches!(err, SyncError::UnresolvedParent { .. }));
    }

    #[test]
    fn test_topological_sort_known_parent_is_satisfied() {
        let mut known = HashSet::new();
        known.insert("local_root".to_string());

        let entities = vec![make_entity("a", Some("local_root"))];
        let sorted = topological_sort(entities, &known).unwrap();
        assert_eq!(sorted.len(), 1);
    }

    #[test]
    fn test_missing_chunks_latest_checkpoint_only() {
        let storage = SqliteStorage::open_memory().unwrap();
        let mut data = ProjectData::default();
        data.tasks.push(make_task("t1", Some("u1"), false));
        // Old revision references "old"; latest references "new_a,new_b".
        data.checkpoints
            .push(make_checkpoint("cp1", "t1", 1, "old", 100));
        data.checkpoints
            .push(make_checkpoint("cp2", "t1", 2, "new_a,new_b", 200));

        let opts = SyncOptions::default();
        let req = missing_chunks(&data, storage.conn(), Some("u1"), &opts).unwrap();
        assert_eq!(req.missing, vec!["new_a".to_string(), "new_b".to_string()]);
        assert_eq!(req.total_bytes, 200);
    }

    #[test]
    fn test_missing_chunks_respects_policy() {
        let storage = SqliteStorage::open_memory().unwrap();
        let mut data = ProjectData::default();
        data.tasks.push(make_task("mine", Some("u1"), false));
        data.tasks.push(make_task("dep", None, true));
        data.tasks.push(make_task("other", Some("u2"), false));
        data.checkpoints
            .push(make_checkpoint("cp1", "mine", 1, "h_mine", 10));
        data.checkpoints
            .push(make_checkpoint("cp2", "dep", 1, "h_dep", 10));
        data.checkpoints
            .push(make_checkpoint("cp3", "other", 1, "h_other", 10));

        let opts = SyncOptions::default();
        let req = missing_chunks(&data, storage.conn(), Some("u1"), &opts).unwrap();
        assert_eq!(req.missing, vec!["h_mine".to_string()]);

        let opts = SyncOptions {
            pull_dependencies: true,
            ..SyncOptions::default()
        };
        let req = missing_chunks(&data, storage.conn(), Some("u1"), &opts).unwrap();
        assert_eq!(req.missing.len(), 2);

        let opts = SyncOptions {
            pull_everything: true,
            ..SyncOptions::default()
        };
        let req = missing_chunks(&data, storage.conn(), Some("u1"), &opts).unwrap();
        assert_eq!(req.missing.len(), 3);
    }

    #[test]
    fn test_missing_chunks_skips_locally_present() {
        let storage = SqliteStorage::open_memory().unwrap();
        crate::storage::sqlite::insert_chunk(storage.conn(), "present", b"x").unwrap();

        let mut data = ProjectData::default();
        data.templates.push(Template {
            id: "tpl1".into(),
            name: "base scene".into(),
            file_name: None,
            chunk_hashes: "present,absent".into(),
            checksum: "c".into(),
            file_size: 50,
            created_at: 0,
            updated_at: 0,
        });

        let req =
            missing_chunks(&data, storage.conn(), None, &SyncOptions::default()).unwrap();
        assert_eq!(req.missing, vec!["absent".to_string()]);
        assert_eq!(req.referenced.len(), 2);
        assert_eq!(req.total_bytes, 50);
    }

    #[test]
    fn test_missing_previews() {
        let storage = SqliteStorage::open_memory().unwrap();
        crate::storage::sqlite::insert_preview(storage.conn(), "pv_have", b"img").unwrap();

        let mut data = ProjectData::default();
        let mut entity = make_entity("e1", None);
        entity.preview_id = Some("pv_have".into());
        data.entities.push(entity);
        let mut task = make_task("t1", None, false);
        task.preview_id = Some("pv_need".into());
        data.tasks.push(task);
        data.project_preview_id = Some("pv_proj".into());

        let missing = missing_previews(&data, storage.conn()).unwrap();
        assert_eq!(missing, vec!["pv_need".to_string(), "pv_proj".to_string()]);
    }
}
