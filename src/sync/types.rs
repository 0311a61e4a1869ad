//! Sync types: errors, options, progress reporting, transfer statistics.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Sync-specific errors.
///
/// The taxonomy follows the transfer failure policy: transport errors are
/// fatal to the current call, protocol errors surface the remote's message
/// verbatim, integrity errors cover corrupt or truncated chunk records, and
/// consistency errors (missing chunks/previews, unresolvable entity order)
/// are distinct so callers can branch on them.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// IO error during file or stream operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Connection-level failure talking to the remote.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote rejected the request (HTTP 400); body surfaced verbatim.
    #[error("Remote error: {message}")]
    Remote { message: String },

    /// Any other non-success status; nothing useful in the body.
    #[error("Unexpected remote status: {status}")]
    UnexpectedStatus { status: u16 },

    /// A TLV record was cut short (incomplete header or value).
    #[error("Truncated chunk record: needed {needed} bytes, had {remaining}")]
    Truncated { needed: usize, remaining: usize },

    /// A chunk's decompressed content does not hash to its tag.
    #[error("Corrupt chunk: {hash}")]
    CorruptChunk { hash: String },

    /// A chunk payload exceeds the 24-bit length ceiling.
    #[error("Chunk payload too large: {size} bytes (max {max})", max = super::codec::MAX_VALUE_LEN)]
    ChunkTooLarge { size: usize },

    /// A chunk hash is not a 64-char hex digest of 32 bytes.
    #[error("Invalid chunk hash: {hash}")]
    InvalidChunkHash { hash: String },

    /// Strict merge found referenced chunks absent from the local store.
    #[error("Dataset references {count} missing chunk(s)")]
    MissingChunks { count: usize },

    /// Strict merge found referenced previews absent from the local store.
    #[error("Dataset references {count} missing preview(s)")]
    MissingPreviews { count: usize },

    /// An entity references a parent that is neither incoming nor local.
    #[error("Entity {entity_id} references unresolved parent {parent_id}")]
    UnresolvedParent { entity_id: String, parent_id: String },

    /// The entity parent graph contains a cycle.
    #[error("Entity hierarchy contains a cycle ({count} unorderable entities)")]
    EntityCycle { count: usize },

    /// The remote spec is neither a URL nor an existing store file.
    #[error("Invalid remote: {0}")]
    InvalidRemote(String),

    /// The operation was cancelled cooperatively.
    #[error("Sync cancelled")]
    Cancelled,
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<crate::error::Error> for SyncError {
    fn from(err: crate::error::Error) -> Self {
        match err {
            crate::error::Error::Sync(e) => e,
            crate::error::Error::Io(e) => Self::Io(e),
            crate::error::Error::Json(e) => Self::Json(e),
            other => Self::Database(other.to_string()),
        }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Policy knobs for a pull.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Bypass the sync-token fast path and fetch the full remote dataset.
    pub force: bool,
    /// Also pull chunks for tasks flagged as dependencies of assigned work.
    pub pull_dependencies: bool,
    /// Pull chunks for every task, not just assigned ones.
    pub pull_everything: bool,
}

/// Cooperative cancellation handle.
///
/// Polled at the top of every transfer loop and before every network call.
/// Cancellation is best-effort: the unit of work in flight completes, and
/// everything already committed stays committed (content addressing makes
/// the retry safe).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next poll point.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Return `Err(Cancelled)` if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] once `cancel` has been called.
    pub fn check(&self) -> SyncResult<()> {
        if self.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Progress snapshot handed to the transfer callback after each unit of
/// work (one chunk or one batch).
#[derive(Debug, Clone)]
pub struct TransferProgress {
    pub bytes_done: u64,
    pub bytes_total: u64,
    /// Human-readable description of the current step.
    pub message: String,
    /// Supplementary info; transfers report dedup savings here.
    pub detail: String,
}

/// Callback invoked after each transfer unit.
pub type ProgressFn<'a> = dyn FnMut(&TransferProgress) + 'a;

/// Metadata for one chunk as known to a store (local or remote).
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct ChunkInfo {
    pub hash: String,
    /// Compressed payload size in bytes.
    pub size: u64,
}

/// Remote project metadata fetched at the start of a pull.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct RemoteMeta {
    /// Opaque version marker for the remote project state.
    pub sync_token: String,
    pub project_preview_id: Option<String>,
}

/// Statistics from applying a dataset.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MergeStats {
    /// Records created locally.
    pub created: usize,
    /// Records overwritten because the incoming copy was strictly newer.
    pub updated: usize,
    /// Records kept local (not newer, or no change).
    pub skipped: usize,
    /// Records dropped because a tombstone suppressed them.
    pub suppressed: usize,
    /// Dependency links skipped as already present.
    pub duplicate_links: usize,
    /// Local records removed by incoming tombstones.
    pub deleted: usize,
}

impl MergeStats {
    /// Total records processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.suppressed + self.duplicate_links
    }
}

/// Statistics from a chunk transfer (either direction).
#[derive(Debug, Default, Clone, Serialize)]
pub struct ChunkTransferStats {
    /// Chunks actually moved.
    pub transferred: usize,
    /// Compressed bytes moved.
    pub bytes: u64,
    /// Compressed bytes skipped because the destination already had them.
    pub saved_bytes: u64,
}

impl ChunkTransferStats {
    /// Dedup savings as a percentage of the total candidate volume.
    #[must_use]
    pub fn saved_percent(&self) -> u64 {
        let total = self.bytes + self.saved_bytes;
        if total == 0 {
            0
        } else {
            self.saved_bytes * 100 / total
        }
    }
}

/// Outcome of a batch chunk write.
#[derive(Debug, Default, Clone)]
pub struct BatchOutcome {
    /// Chunks decoded, verified and persisted.
    pub stored: usize,
    /// Hashes whose payload failed integrity verification.
    pub failed: Vec<String>,
}

/// Result of a pull operation.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PullReport {
    /// True when the token fast path was taken (no dataset transfer).
    pub up_to_date: bool,
    pub merge: MergeStats,
    pub chunks: ChunkTransferStats,
    /// Previews fetched.
    pub previews: usize,
}

/// Result of a push operation.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PushReport {
    /// False when there were no local changes and no network call was made.
    pub pushed: bool,
    /// Structured records sent.
    pub records: usize,
    pub tombstones: usize,
    pub chunks: ChunkTransferStats,
    /// Previews uploaded.
    pub previews: usize,
}

/// Snapshot of local sync state for `shotline status`.
#[derive(Debug, Default, Clone, Serialize)]
pub struct StatusReport {
    /// Unsynced row counts per table, tables with zero omitted.
    pub unsynced: Vec<(String, usize)>,
    /// Deletions waiting to be pushed as tombstones.
    pub pending_deletions: usize,
    pub sync_token: Option<String>,
}

impl StatusReport {
    /// True when a push would have nothing to send.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.pending_deletions == 0 && self.unsynced.iter().all(|(_, n)| *n == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());

        token.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(SyncError::Cancelled)));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_saved_percent() {
        let stats = ChunkTransferStats {
            transferred: 1,
            bytes: 25,
            saved_bytes: 75,
        };
        assert_eq!(stats.saved_percent(), 75);

        assert_eq!(ChunkTransferStats::default().saved_percent(), 0);
    }

    #[test]
    fn test_status_report_clean() {
        let mut report = StatusReport::default();
        assert!(report.is_clean());

        report.unsynced.push(("tasks".into(), 2));
        assert!(!report.is_clean());
    }
}
