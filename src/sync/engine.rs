//! Sync orchestrator: pull, push, clone and status.
//!
//! A pull runs `FetchRemoteMetadata → {UpToDate | NeedsFullRefresh} →
//! TransferPreviews → (refresh) RewriteDataset → ComputeMissingChunks →
//! Commit → TransferChunks`. The chunk transfer deliberately happens after
//! the local transaction commits: a cancelled or failed download must not
//! roll back already-merged structured data. Each stored chunk commits
//! independently, so resuming a sync just recomputes the missing set.
//!
//! A push is one transaction end to end: `ClearTrash → LoadChangedRows →
//! (empty? Done) → PushChunks → PushPreviews → PushDataset(strict) →
//! MarkAllSynced → Commit`.

use crate::storage::schema::{clear_structured_tables, STRUCTURED_TABLES};
use crate::storage::sqlite as store;
use crate::storage::SqliteStorage;
use crate::sync::chunks::{ChunkService, ExistenceCache};
use crate::sync::dataset::{self, ChunkRequirements};
use crate::sync::merge::{self, MergeMode};
use crate::sync::remote::Remote;
use crate::sync::types::{
    CancelToken, ChunkTransferStats, ProgressFn, PullReport, PushReport, StatusReport, SyncError,
    SyncOptions, SyncResult, TransferProgress,
};

/// Drives sync operations against a local store.
///
/// Not safe for concurrent use: callers must serialize sync calls against
/// the same store.
pub struct SyncEngine<'a> {
    storage: &'a mut SqliteStorage,
}

impl<'a> SyncEngine<'a> {
    #[must_use]
    pub fn new(storage: &'a mut SqliteStorage) -> Self {
        Self { storage }
    }

    /// Pull the remote project state into the local store.
    ///
    /// When the cached sync token matches the remote's and `force` is off,
    /// the dataset is built from local rows only and no `/data` request is
    /// issued; the differ still runs so an interrupted chunk transfer
    /// resumes.
    ///
    /// # Errors
    ///
    /// Transport/protocol failures, merge failures, or cancellation. A
    /// failure during chunk transfer leaves the committed structured data
    /// in place.
    pub fn pull(
        &mut self,
        remote: &mut dyn Remote,
        opts: &SyncOptions,
        progress: &mut ProgressFn<'_>,
        cancel: &CancelToken,
    ) -> SyncResult<PullReport> {
        let force = opts.force;
        let now = chrono::Utc::now().timestamp_millis();

        // Structured phase: everything up to chunk transfer is one
        // transaction.
        let (mut report, requirements) = self
            .storage
            .mutate("pull", |tx| {
                cancel.check()?;
                let meta = remote.project_meta()?;
                let local_token = store::sync_token(tx)?;
                let up_to_date =
                    !force && local_token.as_deref() == Some(meta.sync_token.as_str());
                tracing::info!(up_to_date, "pull: fetched remote metadata");

                let data = if up_to_date {
                    dataset::load_full(tx)?
                } else {
                    cancel.check()?;
                    remote.fetch_dataset()?
                };

                let mut report = PullReport {
                    up_to_date,
                    ..PullReport::default()
                };

                // Previews travel inside the structured transaction.
                let missing = dataset::missing_previews(&data, tx)?;
                let total = missing.len();
                for (done, id) in missing.iter().enumerate() {
                    cancel.check()?;
                    let bytes = remote.fetch_preview(id)?;
                    store::insert_preview(tx, id, &bytes)?;
                    report.previews += 1;
                    progress(&TransferProgress {
                        bytes_done: (done + 1) as u64,
                        bytes_total: total as u64,
                        message: "fetching previews".to_string(),
                        detail: String::new(),
                    });
                }

                if !up_to_date {
                    let fresh = !has_structured_rows(tx)?;
                    let mode = if fresh {
                        // From-scratch pull: wipe and rewrite without
                        // per-record checks.
                        clear_structured_tables(tx)?;
                        MergeMode::Overwrite
                    } else {
                        MergeMode::Merge { strict: false }
                    };
                    report.merge = merge::apply_dataset(tx, &data, mode)?;
                }

                let user = store::user_id(tx)?;
                let requirements =
                    dataset::missing_chunks(&data, tx, user.as_deref(), opts)?;

                // Token bookkeeping commits atomically with the data it
                // stands for.
                if !up_to_date {
                    store::set_sync_token(tx, &meta.sync_token, now)?;
                    if let Some(preview) = &meta.project_preview_id {
                        store::set_project_preview_id(tx, preview, now)?;
                    }
                }

                Ok((report, requirements))
            })
            .map_err(SyncError::from)?;

        // Binary phase, post-commit: separate transaction per stored chunk.
        report.chunks = self.transfer_chunks(remote, &requirements, progress, cancel)?;

        Ok(report)
    }

    fn transfer_chunks(
        &mut self,
        remote: &mut dyn Remote,
        requirements: &ChunkRequirements,
        progress: &mut ProgressFn<'_>,
        cancel: &CancelToken,
    ) -> SyncResult<ChunkTransferStats> {
        if requirements.missing.is_empty() {
            return Ok(ChunkTransferStats::default());
        }

        tracing::info!(
            missing = requirements.missing.len(),
            referenced = requirements.referenced.len(),
            total_bytes = requirements.total_bytes,
            "pull: transferring chunks"
        );

        // Ask over the full referenced set so the skip pass can report dedup
        // savings for everything already present.
        let infos = remote.chunk_infos(&requirements.referenced)?;
        let service = ChunkService::new(self.storage.conn());
        let mut cache = ExistenceCache::new();
        service.pull(remote, &infos, &mut cache, progress, cancel)
    }

    /// Push local changes to the remote.
    ///
    /// With no changed rows and no pending deletions this returns without a
    /// single network call.
    ///
    /// # Errors
    ///
    /// Consistency failures (dataset references chunks/previews the local
    /// store does not hold), transport failures, or cancellation. Any
    /// failure rolls back the trash clearing and synced markers, so the
    /// next push retries the same delta.
    pub fn push(
        &mut self,
        remote: &mut dyn Remote,
        progress: &mut ProgressFn<'_>,
        cancel: &CancelToken,
    ) -> SyncResult<PushReport> {
        let now = chrono::Utc::now().timestamp_millis();

        let report = self
            .storage
            .mutate("push", |tx| {
                cancel.check()?;
                let data = dataset::load_changed(tx)?;
                if data.is_empty() {
                    tracing::info!("push: nothing to send");
                    return Ok(PushReport::default());
                }

                let service = ChunkService::new(tx);

                // The remote must never receive a dataset referencing data
                // it won't also receive, so everything referenced has to be
                // here first.
                let referenced = dataset::referenced_chunks(&data);
                let local_missing = service.compute_missing(&referenced)?;
                if !local_missing.is_empty() {
                    return Err(SyncError::MissingChunks {
                        count: local_missing.len(),
                    }
                    .into());
                }

                cancel.check()?;
                let remote_missing = if referenced.is_empty() {
                    Vec::new()
                } else {
                    remote.missing_chunks(&referenced)?
                };
                let infos = service.local_infos(&remote_missing)?;
                let pushed_bytes: u64 = infos.iter().map(|i| i.size).sum();
                let all_bytes: u64 = service
                    .local_infos(&referenced)?
                    .iter()
                    .map(|i| i.size)
                    .sum();
                let chunks = service.push(
                    remote,
                    &infos,
                    all_bytes.saturating_sub(pushed_bytes),
                    progress,
                    cancel,
                )?;

                let preview_ids = dataset::referenced_previews(&data);
                let mut previews = 0usize;
                if !preview_ids.is_empty() {
                    for id in remote.missing_previews(&preview_ids)? {
                        cancel.check()?;
                        let bytes = store::get_preview(tx, &id)?
                            .ok_or(SyncError::MissingPreviews { count: 1 })?;
                        remote.push_preview(&id, &bytes)?;
                        previews += 1;
                    }
                }

                cancel.check()?;
                remote.push_dataset(&data)?;

                store::clear_trash(tx)?;
                store::mark_all_synced(tx, now)?;

                Ok(PushReport {
                    pushed: true,
                    records: data.record_count(),
                    tombstones: data.tombstones.len(),
                    chunks,
                    previews,
                })
            })
            .map_err(SyncError::from)?;

        Ok(report)
    }

    /// Clone a remote project into this (fresh) store.
    ///
    /// A pull with the token fast path bypassed; an empty destination lands
    /// in overwrite mode.
    ///
    /// # Errors
    ///
    /// Same failure surface as [`SyncEngine::pull`].
    pub fn clone_from(
        &mut self,
        remote: &mut dyn Remote,
        opts: &SyncOptions,
        progress: &mut ProgressFn<'_>,
        cancel: &CancelToken,
    ) -> SyncResult<PullReport> {
        let opts = SyncOptions {
            force: true,
            ..*opts
        };
        self.pull(remote, &opts, progress, cancel)
    }

    /// Summarize local sync state: unsynced rows, pending deletions, token.
    ///
    /// # Errors
    ///
    /// Returns an error if a table count fails.
    pub fn status(&self) -> SyncResult<StatusReport> {
        let conn = self.storage.conn();
        let mut report = StatusReport {
            sync_token: store::sync_token(conn)?,
            ..StatusReport::default()
        };

        for table in STRUCTURED_TABLES {
            let count = store::count_unsynced(conn, table)?;
            if count > 0 {
                report.unsynced.push(((*table).to_string(), count));
            }
        }
        report.pending_deletions = store::trash_tombstones(conn)?.len();

        Ok(report)
    }
}

/// True if any structured table has at least one row.
fn has_structured_rows(conn: &rusqlite::Connection) -> SyncResult<bool> {
    for table in STRUCTURED_TABLES {
        let any: Option<i64> = conn
            .query_row(&format!("SELECT 1 FROM {table} LIMIT 1"), [], |row| {
                row.get(0)
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(SyncError::from(other)),
            })?;
        if any.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Checkpoint, Task, TaskType};
    use crate::sync::codec::{self, Chunk};
    use crate::sync::dataset::ProjectData;
    use crate::sync::types::{ChunkInfo, RemoteMeta};
    use std::collections::HashMap;
    use std::io::Read;

    /// In-memory remote that records every call, in the style of the
    /// storage-layer mock fixtures.
    #[derive(Default)]
    struct MockRemote {
        token: String,
        dataset: ProjectData,
        chunks: HashMap<String, Vec<u8>>,
        previews: HashMap<String, Vec<u8>>,
        meta_fetches: usize,
        data_fetches: usize,
        pushed_datasets: Vec<ProjectData>,
        pushed_chunk_batches: usize,
        pushed_previews: usize,
        missing_chunk_queries: usize,
    }

    impl MockRemote {
        fn with_token(token: &str) -> Self {
            Self {
                token: token.to_string(),
                ..Self::default()
            }
        }

        fn add_chunk(&mut self, chunk: &Chunk) {
            self.chunks.insert(chunk.hash.clone(), chunk.payload.clone());
        }
    }

    impl Remote for MockRemote {
        fn project_meta(&mut self) -> SyncResult<RemoteMeta> {
            self.meta_fetches += 1;
            Ok(RemoteMeta {
                sync_token: self.token.clone(),
                project_preview_id: None,
            })
        }

        fn fetch_dataset(&mut self) -> SyncResult<ProjectData> {
            self.data_fetches += 1;
            Ok(self.dataset.clone())
        }

        fn push_dataset(&mut self, data: &ProjectData) -> SyncResult<()> {
            self.pushed_datasets.push(data.clone());
            Ok(())
        }

        fn chunk_infos(&mut self, hashes: &[String]) -> SyncResult<Vec<ChunkInfo>> {
            Ok(hashes
                .iter()
                .filter_map(|h| {
                    self.chunks.get(h).map(|payload| ChunkInfo {
                        hash: h.clone(),
                        size: payload.len() as u64,
                    })
                })
                .collect())
        }

        fn missing_chunks(&mut self, hashes: &[String]) -> SyncResult<Vec<String>> {
            self.missing_chunk_queries += 1;
            Ok(hashes
                .iter()
                .filter(|h| !self.chunks.contains_key(*h))
                .cloned()
                .collect())
        }

        fn fetch_chunks(&mut self, hashes: &[String]) -> SyncResult<Vec<u8>> {
            let mut out = Vec::new();
            for hash in hashes {
                let payload = self.chunks.get(hash).cloned().unwrap_or_default();
                out.extend_from_slice(&codec::encode_chunk(&Chunk::new(
                    hash.clone(),
                    payload,
                ))?);
            }
            Ok(out)
        }

        fn stream_chunks(&mut self, hashes: &[String]) -> SyncResult<Box<dyn Read>> {
            let tlv = self.fetch_chunks(hashes)?;
            Ok(Box::new(std::io::Cursor::new(tlv)))
        }

        fn push_chunks(&mut self, tlv: &[u8]) -> SyncResult<()> {
            self.pushed_chunk_batches += 1;
            let mut offset = 0;
            while offset < tlv.len() {
                let (hash, payload, consumed) = codec::decode_chunk(&tlv[offset..])?;
                offset += consumed;
                self.chunks.insert(hash, payload);
            }
            Ok(())
        }

        fn missing_previews(&mut self, ids: &[String]) -> SyncResult<Vec<String>> {
            Ok(ids
                .iter()
                .filter(|id| !self.previews.contains_key(*id))
                .cloned()
                .collect())
        }

        fn fetch_preview(&mut self, id: &str) -> SyncResult<Vec<u8>> {
            self.previews
                .get(id)
                .cloned()
                .ok_or(SyncError::MissingPreviews { count: 1 })
        }

        fn push_preview(&mut self, id: &str, data: &[u8]) -> SyncResult<()> {
            self.pushed_previews += 1;
            self.previews.insert(id.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn quiet() -> impl FnMut(&TransferProgress) {
        |_: &TransferProgress| {}
    }

    fn task(id: &str, assignee: Option<&str>) -> Task {
        Task {
            id: id.to_string(),
            name: id.to_string(),
            entity_id: None,
            task_type_id: "tt".to_string(),
            status_id: None,
            assignee_id: assignee.map(String::from),
            is_dependency: false,
            preview_id: None,
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    fn checkpoint(id: &str, task: &str, hashes: &str) -> Checkpoint {
        Checkpoint {
            id: id.to_string(),
            task_id: task.to_string(),
            revision: 1,
            chunk_hashes: hashes.to_string(),
            checksum: "c".to_string(),
            file_size: 64,
            comment: None,
            author_id: None,
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    #[test]
    fn test_pull_full_refresh_into_fresh_store() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        store::set_user_id(storage.conn(), "u1").unwrap();

        let chunk = Chunk::from_content(b"checkpoint bytes").unwrap();
        let mut remote = MockRemote::with_token("tok-1");
        remote.dataset.task_types.push(TaskType {
            id: "tt".into(),
            name: "model".into(),
            created_at: 1_000,
            updated_at: 1_000,
        });
        remote.dataset.tasks.push(task("t1", Some("u1")));
        remote
            .dataset
            .checkpoints
            .push(checkpoint("cp1", "t1", &chunk.hash));
        remote.add_chunk(&chunk);

        let mut progress = quiet();
        let report = SyncEngine::new(&mut storage)
            .pull(
                &mut remote,
                &SyncOptions::default(),
                &mut progress,
                &CancelToken::new(),
            )
            .unwrap();

        assert!(!report.up_to_date);
        assert_eq!(report.merge.created, 3);
        assert_eq!(report.chunks.transferred, 1);
        assert!(store::get_task(storage.conn(), "t1").unwrap().is_some());
        assert!(store::chunk_exists(storage.conn(), &chunk.hash).unwrap());
        // Token recorded for the next fast path.
        assert_eq!(
            store::sync_token(storage.conn()).unwrap().as_deref(),
            Some("tok-1")
        );
    }

    #[test]
    fn test_pull_fast_path_issues_zero_data_requests() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        store::set_sync_token(storage.conn(), "tok-1", 1_000).unwrap();

        let mut remote = MockRemote::with_token("tok-1");
        let mut progress = quiet();
        let report = SyncEngine::new(&mut storage)
            .pull(
                &mut remote,
                &SyncOptions::default(),
                &mut progress,
                &CancelToken::new(),
            )
            .unwrap();

        assert!(report.up_to_date);
        assert_eq!(remote.meta_fetches, 1);
        assert_eq!(remote.data_fetches, 0, "fast path must not fetch /data");
    }

    #[test]
    fn test_pull_force_bypasses_fast_path() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        store::set_sync_token(storage.conn(), "tok-1", 1_000).unwrap();

        let mut remote = MockRemote::with_token("tok-1");
        let opts = SyncOptions {
            force: true,
            ..SyncOptions::default()
        };
        let mut progress = quiet();
        let report = SyncEngine::new(&mut storage)
            .pull(&mut remote, &opts, &mut progress, &CancelToken::new())
            .unwrap();

        assert!(!report.up_to_date);
        assert_eq!(remote.data_fetches, 1);
    }

    #[test]
    fn test_pull_resumes_interrupted_chunk_transfer() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        store::set_user_id(storage.conn(), "u1").unwrap();

        let first = Chunk::from_content(b"first artifact chunk").unwrap();
        let second = Chunk::from_content(b"second artifact chunk").unwrap();
        let mut remote = MockRemote::with_token("tok-1");
        remote.dataset.tasks.push(task("t1", Some("u1")));
        remote.dataset.checkpoints.push(checkpoint(
            "cp1",
            "t1",
            &format!("{},{}", first.hash, second.hash),
        ));
        remote.add_chunk(&first);
        remote.add_chunk(&second);

        // Cancel after the first downloaded chunk: the structured phase has
        // already committed, one chunk lands, the second never arrives.
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let mut cancelling = move |p: &TransferProgress| {
            if p.message.contains("downloading") {
                trigger.cancel();
            }
        };
        let result = SyncEngine::new(&mut storage).pull(
            &mut remote,
            &SyncOptions::default(),
            &mut cancelling,
            &cancel,
        );
        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert!(store::get_task(storage.conn(), "t1").unwrap().is_some());
        assert!(store::chunk_exists(storage.conn(), &first.hash).unwrap());
        assert!(!store::chunk_exists(storage.conn(), &second.hash).unwrap());

        // Second pull: token matches, dataset comes from local rows, and
        // only the missing chunk is fetched.
        let mut progress = quiet();
        let report = SyncEngine::new(&mut storage)
            .pull(
                &mut remote,
                &SyncOptions::default(),
                &mut progress,
                &CancelToken::new(),
            )
            .unwrap();

        assert!(report.up_to_date);
        assert_eq!(remote.data_fetches, 1, "resume uses local rows");
        assert_eq!(report.chunks.transferred, 1);
        assert!(report.chunks.saved_bytes > 0, "first chunk counted as saved");
        assert!(store::chunk_exists(storage.conn(), &second.hash).unwrap());
    }

    #[test]
    fn test_push_with_no_changes_makes_no_network_calls() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut remote = MockRemote::with_token("tok-1");

        let mut progress = quiet();
        let report = SyncEngine::new(&mut storage)
            .push(&mut remote, &mut progress, &CancelToken::new())
            .unwrap();

        assert!(!report.pushed);
        assert_eq!(remote.meta_fetches, 0);
        assert_eq!(remote.missing_chunk_queries, 0);
        assert!(remote.pushed_datasets.is_empty());
    }

    #[test]
    fn test_push_sends_changed_rows_and_missing_chunks() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        let chunk = Chunk::from_content(b"local artifact").unwrap();
        store::insert_chunk(storage.conn(), &chunk.hash, &chunk.payload).unwrap();
        store::insert_task(storage.conn(), &task("t1", None)).unwrap();
        store::insert_checkpoint(storage.conn(), &checkpoint("cp1", "t1", &chunk.hash)).unwrap();
        // Flip to unsynced as a local CRUD write would.
        storage
            .conn()
            .execute("UPDATE tasks SET is_synced = 0", [])
            .unwrap();
        storage
            .conn()
            .execute("UPDATE checkpoints SET is_synced = 0", [])
            .unwrap();

        let mut remote = MockRemote::with_token("tok-1");
        let mut progress = quiet();
        let report = SyncEngine::new(&mut storage)
            .push(&mut remote, &mut progress, &CancelToken::new())
            .unwrap();

        assert!(report.pushed);
        assert_eq!(report.records, 2);
        assert_eq!(report.chunks.transferred, 1);
        assert!(remote.chunks.contains_key(&chunk.hash));
        assert_eq!(remote.pushed_datasets.len(), 1);

        // Everything marked synced: a second push is a no-op.
        let report = SyncEngine::new(&mut storage)
            .push(&mut remote, &mut progress, &CancelToken::new())
            .unwrap();
        assert!(!report.pushed);
    }

    #[test]
    fn test_push_fails_when_referenced_chunk_absent_locally() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        store::insert_task(storage.conn(), &task("t1", None)).unwrap();
        store::insert_checkpoint(storage.conn(), &checkpoint("cp1", "t1", "no_such_chunk"))
            .unwrap();
        storage
            .conn()
            .execute("UPDATE checkpoints SET is_synced = 0", [])
            .unwrap();

        let mut remote = MockRemote::with_token("tok-1");
        let mut progress = quiet();
        let err = SyncEngine::new(&mut storage)
            .push(&mut remote, &mut progress, &CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, SyncError::MissingChunks { .. }));
        assert!(remote.pushed_datasets.is_empty(), "nothing partially applied");
    }

    #[test]
    fn test_push_drains_trash_into_tombstones() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        store::add_trash(storage.conn(), "t_gone", 2_000).unwrap();

        let mut remote = MockRemote::with_token("tok-1");
        let mut progress = quiet();
        let report = SyncEngine::new(&mut storage)
            .push(&mut remote, &mut progress, &CancelToken::new())
            .unwrap();

        assert!(report.pushed);
        assert_eq!(report.tombstones, 1);
        assert_eq!(remote.pushed_datasets[0].tombstones[0].id, "t_gone");
        assert!(store::trash_tombstones(storage.conn()).unwrap().is_empty());
    }

    #[test]
    fn test_status_reports_unsynced_and_trash() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        store::insert_task(storage.conn(), &task("t1", None)).unwrap();
        storage
            .conn()
            .execute("UPDATE tasks SET is_synced = 0", [])
            .unwrap();
        store::add_trash(storage.conn(), "x", 1).unwrap();

        let engine = SyncEngine::new(&mut storage);
        let report = engine.status().unwrap();
        assert_eq!(report.unsynced, vec![("tasks".to_string(), 1)]);
        assert_eq!(report.pending_deletions, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_clone_from_file_peer() {
        // Build a populated peer store.
        let peer_storage = SqliteStorage::open_memory().unwrap();
        let chunk = Chunk::from_content(b"peer artifact").unwrap();
        store::insert_chunk(peer_storage.conn(), &chunk.hash, &chunk.payload).unwrap();
        store::insert_task(peer_storage.conn(), &task("t1", Some("u1"))).unwrap();
        store::insert_checkpoint(
            peer_storage.conn(),
            &checkpoint("cp1", "t1", &chunk.hash),
        )
        .unwrap();
        let mut peer = crate::sync::remote::FileRemote::from_storage(peer_storage);

        let mut storage = SqliteStorage::open_memory().unwrap();
        store::set_user_id(storage.conn(), "u1").unwrap();

        let mut progress = quiet();
        let report = SyncEngine::new(&mut storage)
            .clone_from(
                &mut peer,
                &SyncOptions::default(),
                &mut progress,
                &CancelToken::new(),
            )
            .unwrap();

        assert!(!report.up_to_date);
        assert!(store::get_task(storage.conn(), "t1").unwrap().is_some());
        assert!(store::chunk_exists(storage.conn(), &chunk.hash).unwrap());
    }
}
