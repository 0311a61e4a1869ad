//! Data models for Shotline.
//!
//! This module contains every syncable record kind:
//! - Structural: `Entity`, `EntityType`, `Task`, `TaskType`, `Status`
//! - Binary-backed: `Checkpoint`, `Template`
//! - Links: `TaskDependency`, `EntityDependency`, `TaskTag`, workflow links
//! - People: `User`, `Role`
//! - Deletion markers: `Tombstone`

pub mod records;

pub use records::{
    Checkpoint, Entity, EntityDependency, EntityType, Role, Status, Tag, Task, TaskDependency,
    TaskTag, TaskType, Template, Tombstone, User, Workflow, WorkflowEntity, WorkflowLink,
    WorkflowTask,
};
