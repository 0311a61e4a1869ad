//! Synchronization core.
//!
//! This module reconciles the local project store against a remote copy
//! (HTTP server or peer store file) and moves binary payload data through a
//! content-addressed, deduplicated, compressed chunk store:
//!
//! - **Codec** ([`codec`]): SHA-256 content addressing, zstd compression,
//!   TLV wire framing, streaming decode with integrity verification
//! - **Chunk store** ([`chunks`]): existence cache, verified writes,
//!   batched/streamed transfer with dedup-savings progress
//! - **Dataset & differ** ([`dataset`]): the `ProjectData` snapshot,
//!   topological entity ordering, missing-chunk/preview computation
//! - **Merge writer** ([`merge`]): create-or-update-if-newer application
//!   with tombstone precedence and strict pre-validation
//! - **Orchestrator** ([`engine`]): pull/push/clone/status against a
//!   [`remote::Remote`]
//!
//! # Consistency model
//!
//! Structured data commits in one local transaction; chunk payloads commit
//! independently afterwards, one transaction per chunk or batch. Every
//! operation is idempotent, so an interrupted sync resumes by recomputing
//! the missing set on the next call. Concurrent sync calls against one
//! store must be serialized by the caller.

pub mod chunks;
pub mod codec;
pub mod dataset;
pub mod engine;
pub mod merge;
pub mod remote;
pub mod types;

pub use chunks::{ChunkService, ExistenceCache, PUSH_BATCH_BYTES};
pub use codec::{Chunk, ChunkReader};
pub use dataset::{ChunkRequirements, ProjectData};
pub use engine::SyncEngine;
pub use merge::{apply_dataset, MergeMode};
pub use remote::{open_remote, FileRemote, HttpRemote, Remote};
pub use types::{
    BatchOutcome, CancelToken, ChunkInfo, ChunkTransferStats, MergeStats, ProgressFn, PullReport,
    PushReport, RemoteMeta, StatusReport, SyncError, SyncOptions, SyncResult, TransferProgress,
};
