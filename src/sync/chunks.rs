//! Chunk store service: existence checks, verified writes, and transfer.
//!
//! All transfer loops are serial with one request in flight, poll the
//! cancellation token before each unit of work, and report progress after
//! each unit. Everything already written stays written on failure; content
//! addressing makes a retry recompute the missing set and continue.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::storage::sqlite as store;
use crate::sync::codec::{self, Chunk, ChunkReader};
use crate::sync::remote::Remote;
use crate::sync::types::{
    BatchOutcome, CancelToken, ChunkInfo, ChunkTransferStats, ProgressFn, SyncError, SyncResult,
    TransferProgress,
};

/// Cumulative compressed-byte threshold per HTTP push request.
pub const PUSH_BATCH_BYTES: usize = 512 * 1024;

/// Session-scoped existence cache.
///
/// Populated as chunks are confirmed present to avoid repeat point lookups
/// across a large request. Owned by the caller and scoped to one sync
/// operation; never shared across calls.
#[derive(Debug, Default)]
pub struct ExistenceCache {
    seen: HashSet<String>,
}

impl ExistenceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn contains(&self, hash: &str) -> bool {
        self.seen.contains(hash)
    }

    fn mark(&mut self, hash: &str) {
        self.seen.insert(hash.to_string());
    }
}

/// Chunk store operations over a local connection.
pub struct ChunkService<'a> {
    conn: &'a Connection,
}

impl<'a> ChunkService<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Check whether a chunk is present, consulting the cache first.
    ///
    /// On a storage hit the cache is marked so the next check is free.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lookup fails.
    pub fn exists(&self, hash: &str, cache: &mut ExistenceCache) -> SyncResult<bool> {
        if cache.contains(hash) {
            return Ok(true);
        }
        if store::chunk_exists(self.conn, hash)? {
            cache.mark(hash);
            return Ok(true);
        }
        Ok(false)
    }

    /// Verify and persist one chunk.
    ///
    /// The payload is decompressed and re-hashed before the write; duplicate
    /// hashes are silently accepted as already satisfied.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::CorruptChunk`] on digest mismatch.
    pub fn put(&self, chunk: &Chunk) -> SyncResult<()> {
        codec::verify_chunk(&chunk.hash, &chunk.payload)?;
        store::insert_chunk(self.conn, &chunk.hash, &chunk.payload)?;
        Ok(())
    }

    /// Decode a raw TLV buffer and persist every valid chunk.
    ///
    /// A record whose content fails verification is skipped and accumulated
    /// into the failed list; valid records before and after it are still
    /// stored. A truncated record aborts the whole call.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Truncated`] for a malformed buffer.
    pub fn put_batch(&self, tlv: &[u8]) -> SyncResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        let mut offset = 0;

        while offset < tlv.len() {
            let (hash, payload, consumed) = codec::decode_chunk(&tlv[offset..])?;
            offset += consumed;

            match codec::verify_chunk(&hash, &payload) {
                Ok(_) => {
                    store::insert_chunk(self.conn, &hash, &payload)?;
                    outcome.stored += 1;
                }
                Err(_) => {
                    tracing::warn!(hash, "corrupt chunk in batch, skipping");
                    outcome.failed.push(hash);
                }
            }
        }

        Ok(outcome)
    }

    /// Subset of `candidates` absent from the local store, used for dedup
    /// before any push.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage lookup fails.
    pub fn compute_missing(&self, candidates: &[String]) -> SyncResult<Vec<String>> {
        Ok(store::missing_chunk_hashes(self.conn, candidates)?)
    }

    /// Local chunk infos (compressed sizes) for the given hashes.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingChunks`] if a hash has no local payload.
    pub fn local_infos(&self, hashes: &[String]) -> SyncResult<Vec<ChunkInfo>> {
        let mut infos = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let size = store::chunk_size(self.conn, hash)?
                .ok_or(SyncError::MissingChunks { count: 1 })?;
            infos.push(ChunkInfo {
                hash: hash.clone(),
                size: u64::try_from(size).unwrap_or(0),
            });
        }
        Ok(infos)
    }

    /// Transfer the given chunks from the remote into the local store.
    ///
    /// Chunks already present locally are skipped and counted as dedup
    /// savings. HTTP remotes are read as one streamed TLV response decoded
    /// incrementally (peak memory is one chunk); file-backed remotes are
    /// read chunk by chunk through their own store.
    ///
    /// Each stored chunk commits on its own, so an interrupted transfer
    /// leaves a partially-populated but internally consistent store.
    ///
    /// # Errors
    ///
    /// Streamed corruption aborts the whole call ([`SyncError::CorruptChunk`]);
    /// cancellation surfaces as [`SyncError::Cancelled`].
    pub fn pull(
        &self,
        remote: &mut dyn Remote,
        infos: &[ChunkInfo],
        cache: &mut ExistenceCache,
        progress: &mut ProgressFn<'_>,
        cancel: &CancelToken,
    ) -> SyncResult<ChunkTransferStats> {
        let bytes_total: u64 = infos.iter().map(|i| i.size).sum();
        let mut stats = ChunkTransferStats::default();
        let mut bytes_done: u64 = 0;

        let mut needed: Vec<&ChunkInfo> = Vec::new();
        for info in infos {
            cancel.check()?;
            if self.exists(&info.hash, cache)? {
                stats.saved_bytes += info.size;
                bytes_done += info.size;
            } else {
                needed.push(info);
            }
        }

        if needed.is_empty() {
            report(progress, bytes_done, bytes_total, "chunks up to date", &stats);
            return Ok(stats);
        }

        if remote.is_file() {
            for info in needed {
                cancel.check()?;
                let chunk = remote.fetch_chunk(&info.hash)?;
                self.put(&chunk)?;
                cache.mark(&info.hash);
                stats.transferred += 1;
                stats.bytes += info.size;
                bytes_done += info.size;
                report(progress, bytes_done, bytes_total, "copying chunks", &stats);
            }
        } else {
            let hashes: Vec<String> = needed.iter().map(|i| i.hash.clone()).collect();
            let sizes: std::collections::HashMap<&str, u64> =
                needed.iter().map(|i| (i.hash.as_str(), i.size)).collect();

            let reader = remote.stream_chunks(&hashes)?;
            for record in ChunkReader::new(reader) {
                cancel.check()?;
                let (hash, payload) = record?;
                // Streaming decode aborts on the first corrupt chunk.
                self.put(&Chunk::new(hash.clone(), payload))?;
                cache.mark(&hash);
                let size = sizes.get(hash.as_str()).copied().unwrap_or(0);
                stats.transferred += 1;
                stats.bytes += size;
                bytes_done += size;
                report(progress, bytes_done, bytes_total, "downloading chunks", &stats);
            }
        }

        Ok(stats)
    }

    /// Transfer the given chunks from the local store to the remote.
    ///
    /// HTTP remotes receive TLV batches flushed whenever the cumulative
    /// compressed size reaches [`PUSH_BATCH_BYTES`], plus once more for the
    /// remainder. File-backed remotes receive everything in one call and
    /// write row-by-row inside a single transaction on their side.
    ///
    /// `saved_bytes` is the compressed volume the destination already had;
    /// it only feeds the dedup percentage in progress reporting.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, missing local payloads, or
    /// cancellation.
    pub fn push(
        &self,
        remote: &mut dyn Remote,
        infos: &[ChunkInfo],
        saved_bytes: u64,
        progress: &mut ProgressFn<'_>,
        cancel: &CancelToken,
    ) -> SyncResult<ChunkTransferStats> {
        let bytes_total: u64 = infos.iter().map(|i| i.size).sum();
        let mut stats = ChunkTransferStats {
            saved_bytes,
            ..ChunkTransferStats::default()
        };

        if infos.is_empty() {
            report(progress, 0, 0, "no chunks to push", &stats);
            return Ok(stats);
        }

        if remote.is_file() {
            let mut tlv = Vec::new();
            for info in infos {
                cancel.check()?;
                tlv.extend_from_slice(&self.encode_local(&info.hash)?);
                stats.transferred += 1;
                stats.bytes += info.size;
            }
            remote.push_chunks(&tlv)?;
            report(progress, stats.bytes, bytes_total, "copied chunks", &stats);
            return Ok(stats);
        }

        let mut batch = Vec::new();
        let mut batch_count = 0usize;
        for info in infos {
            cancel.check()?;
            batch.extend_from_slice(&self.encode_local(&info.hash)?);
            batch_count += 1;

            if batch.len() >= PUSH_BATCH_BYTES {
                remote.push_chunks(&batch)?;
                stats.transferred += batch_count;
                stats.bytes += batch.len() as u64;
                report(progress, stats.bytes, bytes_total, "uploading chunks", &stats);
                batch.clear();
                batch_count = 0;
            }
        }

        if !batch.is_empty() {
            cancel.check()?;
            remote.push_chunks(&batch)?;
            stats.transferred += batch_count;
            stats.bytes += batch.len() as u64;
            report(progress, stats.bytes, bytes_total, "uploading chunks", &stats);
        }

        Ok(stats)
    }

    /// TLV-encode a locally stored chunk.
    fn encode_local(&self, hash: &str) -> SyncResult<Vec<u8>> {
        let payload = store::get_chunk_payload(self.conn, hash)?
            .ok_or(SyncError::MissingChunks { count: 1 })?;
        codec::encode_chunk(&Chunk::new(hash.to_string(), payload))
    }
}

fn report(
    progress: &mut ProgressFn<'_>,
    bytes_done: u64,
    bytes_total: u64,
    message: &str,
    stats: &ChunkTransferStats,
) {
    progress(&TransferProgress {
        bytes_done,
        bytes_total,
        message: message.to_string(),
        detail: format!("deduplicated {}%", stats.saved_percent()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use crate::sync::codec::encode_chunks;

    fn chunk(content: &[u8]) -> Chunk {
        Chunk::from_content(content).unwrap()
    }

    #[test]
    fn test_put_verifies_and_stores() {
        let storage = SqliteStorage::open_memory().unwrap();
        let service = ChunkService::new(storage.conn());

        let c = chunk(b"hello chunk");
        service.put(&c).unwrap();
        assert!(store::chunk_exists(storage.conn(), &c.hash).unwrap());

        // Duplicate write is accepted silently.
        service.put(&c).unwrap();
    }

    #[test]
    fn test_put_rejects_corrupt_payload() {
        let storage = SqliteStorage::open_memory().unwrap();
        let service = ChunkService::new(storage.conn());

        let good = chunk(b"real content");
        let tampered = Chunk::new(good.hash.clone(), chunk(b"other content").payload);
        let err = service.put(&tampered).unwrap_err();
        assert!(matches!(err, SyncError::CorruptChunk { .. }));
        assert!(!store::chunk_exists(storage.conn(), &good.hash).unwrap());
    }

    #[test]
    fn test_exists_populates_cache() {
        let storage = SqliteStorage::open_memory().unwrap();
        let service = ChunkService::new(storage.conn());
        let mut cache = ExistenceCache::new();

        let c = chunk(b"cached");
        assert!(!service.exists(&c.hash, &mut cache).unwrap());

        service.put(&c).unwrap();
        assert!(service.exists(&c.hash, &mut cache).unwrap());
        assert!(cache.contains(&c.hash));
    }

    #[test]
    fn test_compute_missing() {
        let storage = SqliteStorage::open_memory().unwrap();
        let service = ChunkService::new(storage.conn());

        let chunks: Vec<Chunk> = [b"a".as_ref(), b"b", b"c", b"d", b"e"]
            .iter()
            .map(|c| chunk(c))
            .collect();
        // 3 of 5 already present locally.
        service.put(&chunks[0]).unwrap();
        service.put(&chunks[2]).unwrap();
        service.put(&chunks[4]).unwrap();

        let candidates: Vec<String> = chunks.iter().map(|c| c.hash.clone()).collect();
        let missing = service.compute_missing(&candidates).unwrap();
        assert_eq!(missing, vec![chunks[1].hash.clone(), chunks[3].hash.clone()]);
    }

    #[test]
    fn test_put_batch_collects_corrupt_and_keeps_neighbors() {
        let storage = SqliteStorage::open_memory().unwrap();
        let service = ChunkService::new(storage.conn());

        let before = chunk(b"valid before");
        let after = chunk(b"valid after");
        // Header + value whose content does not hash to its tag.
        let corrupt = Chunk::new(chunk(b"claimed content").hash, chunk(b"actual bytes").payload);

        let tlv =
            encode_chunks(&[before.clone(), corrupt.clone(), after.clone()]).unwrap();
        let outcome = service.put_batch(&tlv).unwrap();

        assert_eq!(outcome.stored, 2);
        assert_eq!(outcome.failed, vec![corrupt.hash.clone()]);
        assert!(store::chunk_exists(storage.conn(), &before.hash).unwrap());
        assert!(store::chunk_exists(storage.conn(), &after.hash).unwrap());
        assert!(!store::chunk_exists(storage.conn(), &corrupt.hash).unwrap());
    }

    #[test]
    fn test_put_batch_truncated_is_error() {
        let storage = SqliteStorage::open_memory().unwrap();
        let service = ChunkService::new(storage.conn());

        let mut tlv = encode_chunks(&[chunk(b"whole")]).unwrap();
        tlv.truncate(tlv.len() - 2);
        assert!(matches!(
            service.put_batch(&tlv),
            Err(SyncError::Truncated { .. })
        ));
    }

    #[test]
    fn test_local_infos_requires_payloads() {
        let storage = SqliteStorage::open_memory().unwrap();
        let service = ChunkService::new(storage.conn());

        let c = chunk(b"present");
        service.put(&c).unwrap();

        let infos = service.local_infos(&[c.hash.clone()]).unwrap();
        assert_eq!(infos[0].size as usize, c.size);

        let err = service.local_infos(&["absent".to_string()]).unwrap_err();
        assert!(matches!(err, SyncError::MissingChunks { .. }));
    }
}
