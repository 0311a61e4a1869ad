//! Syncable record types.
//!
//! Every record that travels through a sync operation carries `id`,
//! `created_at` and `updated_at` (Unix milliseconds). `updated_at` drives
//! last-writer-wins conflict resolution during merge; equal timestamps keep
//! the local row.

use serde::{Deserialize, Serialize};

/// A user role (admin, supervisor, artist, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A project member.
///
/// During merge only the role assignment is mutable; identity fields are
/// written once on create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub role_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Kind of a production entity (shot, asset, sequence, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Kind of a task (modeling, rigging, compositing, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskType {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A task status (todo, in progress, done, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub name: String,
    pub short_name: Option<String>,
    pub color: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A free-form tag attachable to tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A production entity (shot, asset, ...).
///
/// Entities form a directed forest through `parent_id`. Creation validates
/// that the parent exists, so bulk inserts must be topologically ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    /// Parent entity id; `None` for roots.
    pub parent_id: Option<String>,
    pub entity_type_id: String,
    /// Preview image id, if one has been attached.
    pub preview_id: Option<String>,
    /// Library entities are shared across projects.
    pub is_library: bool,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A unit of work attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub entity_id: Option<String>,
    pub task_type_id: String,
    pub status_id: Option<String>,
    pub assignee_id: Option<String>,
    /// Marked when another task depends on this one; dependency pulls use it
    /// to widen the chunk selection.
    pub is_dependency: bool,
    pub preview_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A versioned snapshot of a task's file content.
///
/// The file payload lives in the chunk store; `chunk_hashes` is the
/// comma-joined list of content digests, `checksum` is a separate whole-file
/// integrity digest over the decompressed concatenation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub task_id: String,
    pub revision: i64,
    pub chunk_hashes: String,
    pub checksum: String,
    /// Declared size of the whole decompressed artifact, in bytes.
    pub file_size: i64,
    pub comment: Option<String>,
    pub author_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Checkpoint {
    /// Chunk digests referenced by this checkpoint, in payload order.
    #[must_use]
    pub fn chunk_list(&self) -> Vec<String> {
        split_hash_list(&self.chunk_hashes)
    }
}

/// A reusable file template, also chunk-backed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub file_name: Option<String>,
    pub chunk_hashes: String,
    pub checksum: String,
    pub file_size: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Template {
    /// Chunk digests referenced by this template, in payload order.
    #[must_use]
    pub fn chunk_list(&self) -> Vec<String> {
        split_hash_list(&self.chunk_hashes)
    }
}

/// Task-to-task dependency link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub id: String,
    pub task_id: String,
    pub depends_on_task_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Entity-to-entity dependency link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDependency {
    pub id: String,
    pub entity_id: String,
    pub depends_on_entity_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An edge in a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowLink {
    pub id: String,
    pub workflow_id: String,
    pub from_node: String,
    pub to_node: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Membership of an entity in a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEntity {
    pub id: String,
    pub workflow_id: String,
    pub entity_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Membership of a task in a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTask {
    pub id: String,
    pub workflow_id: String,
    pub task_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Tag attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTag {
    pub id: String,
    pub task_id: String,
    pub tag_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Marker recording that a record id was deleted.
///
/// Presence in the tombstone set suppresses re-creation of the id during
/// merge and is cheaper to check than re-querying deletion state per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tombstone {
    pub id: String,
    pub deleted_at: i64,
}

/// Split a comma-joined digest list, dropping empty segments.
fn split_hash_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_list_splits_and_trims() {
        let cp = Checkpoint {
            id: "cp_1".into(),
            task_id: "task_1".into(),
            revision: 1,
            chunk_hashes: "aaa, bbb,,ccc".into(),
            checksum: "x".into(),
            file_size: 10,
            comment: None,
            author_id: None,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(cp.chunk_list(), vec!["aaa", "bbb", "ccc"]);
    }

    #[test]
    fn test_chunk_list_empty() {
        let tpl = Template {
            id: "tpl_1".into(),
            name: "t".into(),
            file_name: None,
            chunk_hashes: String::new(),
            checksum: "x".into(),
            file_size: 0,
            created_at: 0,
            updated_at: 0,
        };
        assert!(tpl.chunk_list().is_empty());
    }
}
