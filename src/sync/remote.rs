//! Remote endpoints: the `Remote` trait and its two transports.
//!
//! A remote is either an HTTP server or another Shotline store file opened
//! directly (peer-to-peer sync). The transport is selected once at call
//! entry by inspecting the spec string; every call site after that goes
//! through the trait.

use std::io::Read;
use std::path::Path;

use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::storage::sqlite as store;
use crate::storage::SqliteStorage;
use crate::sync::codec::{self, Chunk};
use crate::sync::dataset::{self, ProjectData};
use crate::sync::merge::{self, MergeMode};
use crate::sync::types::{ChunkInfo, RemoteMeta, SyncError, SyncResult};

/// Client-identifying header carried on every request.
const CLIENT_HEADER: &str = "X-Shotline-Client";
/// Session/user identity header carried on write paths.
const USER_HEADER: &str = "X-Shotline-User";

const CLIENT_ID: &str = concat!("shotline/", env!("CARGO_PKG_VERSION"));

/// A sync endpoint.
///
/// Implementations must be safe to call serially from a single thread; no
/// internal retry, no internal parallelism.
pub trait Remote {
    /// True for file-backed peers; drives per-chunk vs. streamed transfer.
    fn is_file(&self) -> bool {
        false
    }

    /// Fetch the remote project's metadata (sync token, preview reference).
    ///
    /// # Errors
    ///
    /// Transport or protocol failure.
    fn project_meta(&mut self) -> SyncResult<RemoteMeta>;

    /// Fetch the full remote dataset.
    ///
    /// # Errors
    ///
    /// Transport, protocol, or decode failure.
    fn fetch_dataset(&mut self) -> SyncResult<ProjectData>;

    /// Push a dataset. The receiving side applies it strictly.
    ///
    /// # Errors
    ///
    /// Transport or protocol failure; consistency failure on file peers.
    fn push_dataset(&mut self, data: &ProjectData) -> SyncResult<()>;

    /// Compressed-size metadata for the given hashes.
    ///
    /// # Errors
    ///
    /// Transport or protocol failure.
    fn chunk_infos(&mut self, hashes: &[String]) -> SyncResult<Vec<ChunkInfo>>;

    /// Subset of `hashes` the remote does not have.
    ///
    /// # Errors
    ///
    /// Transport or protocol failure.
    fn missing_chunks(&mut self, hashes: &[String]) -> SyncResult<Vec<String>>;

    /// Whole-content TLV download of the requested chunks.
    ///
    /// # Errors
    ///
    /// Transport or protocol failure.
    fn fetch_chunks(&mut self, hashes: &[String]) -> SyncResult<Vec<u8>>;

    /// Streamed TLV download, decoded incrementally by the caller.
    ///
    /// # Errors
    ///
    /// Transport or protocol failure.
    fn stream_chunks(&mut self, hashes: &[String]) -> SyncResult<Box<dyn Read>>;

    /// Fetch a single chunk.
    ///
    /// # Errors
    ///
    /// Transport failure, or a truncated/absent record.
    fn fetch_chunk(&mut self, hash: &str) -> SyncResult<Chunk> {
        let tlv = self.fetch_chunks(std::slice::from_ref(&hash.to_string()))?;
        let (decoded_hash, payload, _) = codec::decode_chunk(&tlv)?;
        Ok(Chunk::new(decoded_hash, payload))
    }

    /// Upload TLV-encoded chunks.
    ///
    /// # Errors
    ///
    /// Transport or protocol failure.
    fn push_chunks(&mut self, tlv: &[u8]) -> SyncResult<()>;

    /// Subset of preview ids the remote does not have.
    ///
    /// # Errors
    ///
    /// Transport or protocol failure.
    fn missing_previews(&mut self, ids: &[String]) -> SyncResult<Vec<String>>;

    /// Download one preview image.
    ///
    /// # Errors
    ///
    /// Transport or protocol failure.
    fn fetch_preview(&mut self, id: &str) -> SyncResult<Vec<u8>>;

    /// Upload one preview image.
    ///
    /// # Errors
    ///
    /// Transport or protocol failure.
    fn push_preview(&mut self, id: &str, data: &[u8]) -> SyncResult<()>;
}

/// Open a remote from its spec string.
///
/// A spec that parses as an http(s) URL becomes an [`HttpRemote`]; an
/// existing file path becomes a [`FileRemote`]; anything else is rejected.
///
/// # Errors
///
/// Returns [`SyncError::InvalidRemote`] for an unrecognizable spec.
pub fn open_remote(spec: &str, user_id: Option<&str>) -> SyncResult<Box<dyn Remote>> {
    if let Ok(url) = Url::parse(spec) {
        if matches!(url.scheme(), "http" | "https") {
            return Ok(Box::new(HttpRemote::new(url, user_id)));
        }
    }

    if Path::new(spec).is_file() {
        return Ok(Box::new(FileRemote::open(Path::new(spec))?));
    }

    Err(SyncError::InvalidRemote(spec.to_string()))
}

// ==================
// HTTP Transport
// ==================

/// HTTP sync endpoint.
pub struct HttpRemote {
    http: Client,
    base: Url,
    user_id: Option<String>,
}

impl HttpRemote {
    #[must_use]
    pub fn new(base: Url, user_id: Option<&str>) -> Self {
        Self {
            http: Client::new(),
            base,
            user_id: user_id.map(String::from),
        }
    }

    fn url(&self, path: &str) -> SyncResult<Url> {
        self.base
            .join(path)
            .map_err(|e| SyncError::InvalidRemote(e.to_string()))
    }

    /// Map a response per the shared failure policy: 400 is an application
    /// error whose body is the message, any other non-200 is unknown.
    fn check(response: Response) -> SyncResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 400 {
            let message = response.text().unwrap_or_default();
            return Err(SyncError::Remote { message });
        }
        Err(SyncError::UnexpectedStatus {
            status: status.as_u16(),
        })
    }

    fn get_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> SyncResult<T> {
        let url = self.url(path)?;
        let response = self
            .http
            .get(url)
            .header(CLIENT_HEADER, CLIENT_ID)
            .json(body)
            .send()?;
        let response = Self::check(response)?;
        Ok(response.json()?)
    }

    fn get_bytes<B: Serialize>(&self, path: &str, body: &B) -> SyncResult<Vec<u8>> {
        let url = self.url(path)?;
        let response = self
            .http
            .get(url)
            .header(CLIENT_HEADER, CLIENT_ID)
            .json(body)
            .send()?;
        let response = Self::check(response)?;
        Ok(response.bytes()?.to_vec())
    }

    fn post_bytes(&self, path: &str, body: Vec<u8>) -> SyncResult<()> {
        let url = self.url(path)?;
        let mut request = self
            .http
            .post(url)
            .header(CLIENT_HEADER, CLIENT_ID)
            .body(body);
        if let Some(user) = &self.user_id {
            request = request.header(USER_HEADER, user);
        }
        Self::check(request.send()?)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ChunkListBody<'a> {
    chunks: &'a [String],
}

impl Remote for HttpRemote {
    fn project_meta(&mut self) -> SyncResult<RemoteMeta> {
        self.get_json("meta", &serde_json::json!({ "user": self.user_id }))
    }

    fn fetch_dataset(&mut self) -> SyncResult<ProjectData> {
        let blob = self.get_bytes("data", &serde_json::json!({ "user": self.user_id }))?;
        let json = codec::decompress(&blob)?;
        Ok(serde_json::from_slice(&json)?)
    }

    fn push_dataset(&mut self, data: &ProjectData) -> SyncResult<()> {
        let json = serde_json::to_vec(data)?;
        let blob = codec::compress(&json)?;
        self.post_bytes("data", blob)
    }

    fn chunk_infos(&mut self, hashes: &[String]) -> SyncResult<Vec<ChunkInfo>> {
        self.get_json("chunks-info", &hashes)
    }

    fn missing_chunks(&mut self, hashes: &[String]) -> SyncResult<Vec<String>> {
        self.get_json("chunks-missing", &hashes)
    }

    fn fetch_chunks(&mut self, hashes: &[String]) -> SyncResult<Vec<u8>> {
        self.get_bytes("chunks", &ChunkListBody { chunks: hashes })
    }

    fn stream_chunks(&mut self, hashes: &[String]) -> SyncResult<Box<dyn Read>> {
        let url = self.url("stream-chunks")?;
        let response = self
            .http
            .get(url)
            .header(CLIENT_HEADER, CLIENT_ID)
            .json(&ChunkListBody { chunks: hashes })
            .send()?;
        let response = Self::check(response)?;
        Ok(Box::new(response))
    }

    fn push_chunks(&mut self, tlv: &[u8]) -> SyncResult<()> {
        self.post_bytes("chunks", tlv.to_vec())
    }

    fn missing_previews(&mut self, ids: &[String]) -> SyncResult<Vec<String>> {
        self.get_json("previews-exist", &ids)
    }

    fn fetch_preview(&mut self, id: &str) -> SyncResult<Vec<u8>> {
        self.get_bytes(&format!("previews/{id}"), &serde_json::json!({}))
    }

    fn push_preview(&mut self, id: &str, data: &[u8]) -> SyncResult<()> {
        self.post_bytes(&format!("previews/{id}"), data.to_vec())
    }
}

// ==================
// File Transport
// ==================

/// A peer Shotline store opened directly from disk.
pub struct FileRemote {
    storage: SqliteStorage,
}

impl FileRemote {
    /// Open the peer store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened as a store.
    pub fn open(path: &Path) -> SyncResult<Self> {
        let storage = SqliteStorage::open(path)?;
        Ok(Self { storage })
    }

    /// Wrap an already-open store (used by tests).
    #[must_use]
    pub fn from_storage(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

impl Remote for FileRemote {
    fn is_file(&self) -> bool {
        true
    }

    fn project_meta(&mut self) -> SyncResult<RemoteMeta> {
        // File peers have no server minting tokens; lazily assign one so the
        // fast path works across repeated peer pulls.
        let token = match store::sync_token(self.storage.conn())? {
            Some(token) if !token.is_empty() => token,
            _ => {
                let token = uuid::Uuid::new_v4().to_string();
                let now = chrono::Utc::now().timestamp_millis();
                store::set_sync_token(self.storage.conn(), &token, now)?;
                token
            }
        };
        Ok(RemoteMeta {
            sync_token: token,
            project_preview_id: store::project_preview_id(self.storage.conn())?,
        })
    }

    fn fetch_dataset(&mut self) -> SyncResult<ProjectData> {
        dataset::load_full(self.storage.conn())
    }

    fn push_dataset(&mut self, data: &ProjectData) -> SyncResult<()> {
        self.storage.mutate("peer_push_dataset", |tx| {
            merge::apply_dataset(tx, data, MergeMode::Merge { strict: true })
                .map_err(crate::error::Error::from)?;
            // The peer's state changed: rotate its token so cached fast
            // paths against it are invalidated.
            let token = uuid::Uuid::new_v4().to_string();
            let now = chrono::Utc::now().timestamp_millis();
            store::set_sync_token(tx, &token, now)?;
            Ok(())
        })?;
        Ok(())
    }

    fn chunk_infos(&mut self, hashes: &[String]) -> SyncResult<Vec<ChunkInfo>> {
        let conn = self.storage.conn();
        let mut infos = Vec::new();
        for hash in hashes {
            if let Some(size) = store::chunk_size(conn, hash)? {
                infos.push(ChunkInfo {
                    hash: hash.clone(),
                    size: u64::try_from(size).unwrap_or(0),
                });
            }
        }
        Ok(infos)
    }

    fn missing_chunks(&mut self, hashes: &[String]) -> SyncResult<Vec<String>> {
        Ok(store::missing_chunk_hashes(self.storage.conn(), hashes)?)
    }

    fn fetch_chunks(&mut self, hashes: &[String]) -> SyncResult<Vec<u8>> {
        let conn = self.storage.conn();
        let mut out = Vec::new();
        for hash in hashes {
            let payload = store::get_chunk_payload(conn, hash)?
                .ok_or(SyncError::MissingChunks { count: 1 })?;
            out.extend_from_slice(&codec::encode_chunk(&Chunk::new(hash.clone(), payload))?);
        }
        Ok(out)
    }

    fn stream_chunks(&mut self, hashes: &[String]) -> SyncResult<Box<dyn Read>> {
        let tlv = self.fetch_chunks(hashes)?;
        Ok(Box::new(std::io::Cursor::new(tlv)))
    }

    fn fetch_chunk(&mut self, hash: &str) -> SyncResult<Chunk> {
        let payload = store::get_chunk_payload(self.storage.conn(), hash)?
            .ok_or(SyncError::MissingChunks { count: 1 })?;
        Ok(Chunk::new(hash.to_string(), payload))
    }

    fn push_chunks(&mut self, tlv: &[u8]) -> SyncResult<()> {
        // Row-by-row inside one transaction on the peer store.
        let tlv = tlv.to_vec();
        self.storage.mutate("peer_push_chunks", |tx| {
            let mut offset = 0;
            while offset < tlv.len() {
                let (hash, payload, consumed) =
                    codec::decode_chunk(&tlv[offset..]).map_err(crate::error::Error::from)?;
                offset += consumed;
                match codec::verify_chunk(&hash, &payload) {
                    Ok(_) => store::insert_chunk(tx, &hash, &payload)?,
                    Err(_) => tracing::warn!(hash, "corrupt chunk pushed to peer, skipping"),
                }
            }
            Ok(())
        })?;
        Ok(())
    }

    fn missing_previews(&mut self, ids: &[String]) -> SyncResult<Vec<String>> {
        Ok(store::missing_preview_ids(self.storage.conn(), ids)?)
    }

    fn fetch_preview(&mut self, id: &str) -> SyncResult<Vec<u8>> {
        store::get_preview(self.storage.conn(), id)?
            .ok_or(SyncError::MissingPreviews { count: 1 })
    }

    fn push_preview(&mut self, id: &str, data: &[u8]) -> SyncResult<()> {
        Ok(store::insert_preview(self.storage.conn(), id, data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_remote_rejects_garbage() {
        let err = open_remote("definitely/not/a/thing", None).err().unwrap();
        assert!(matches!(err, SyncError::InvalidRemote(_)));
    }

    #[test]
    fn test_open_remote_selects_http() {
        let remote = open_remote("https://tracker.example.com/api/", Some("u1")).unwrap();
        assert!(!remote.is_file());
    }

    #[test]
    fn test_open_remote_selects_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("peer.db");
        // Seed a valid peer store on disk.
        SqliteStorage::open(&path).unwrap();

        let remote = open_remote(path.to_str().unwrap(), None).unwrap();
        assert!(remote.is_file());
    }

    #[test]
    fn test_file_remote_chunk_round_trip() {
        let mut remote = FileRemote::from_storage(SqliteStorage::open_memory().unwrap());

        let chunk = Chunk::from_content(b"peer payload").unwrap();
        let tlv = codec::encode_chunk(&chunk).unwrap();
        remote.push_chunks(&tlv).unwrap();

        assert!(remote.missing_chunks(&[chunk.hash.clone()]).unwrap().is_empty());
        let fetched = remote.fetch_chunk(&chunk.hash).unwrap();
        assert_eq!(fetched.payload, chunk.payload);

        let infos = remote.chunk_infos(&[chunk.hash.clone()]).unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].size as usize, chunk.size);
    }

    #[test]
    fn test_file_remote_skips_corrupt_pushed_chunk() {
        let mut remote = FileRemote::from_storage(SqliteStorage::open_memory().unwrap());

        let good = Chunk::from_content(b"good").unwrap();
        let bad = Chunk::new(
            Chunk::from_content(b"claimed").unwrap().hash,
            Chunk::from_content(b"actual").unwrap().payload,
        );
        let tlv = codec::encode_chunks(&[good.clone(), bad.clone()]).unwrap();
        remote.push_chunks(&tlv).unwrap();

        assert!(remote.missing_chunks(&[good.hash.clone()]).unwrap().is_empty());
        assert_eq!(
            remote.missing_chunks(&[bad.hash.clone()]).unwrap(),
            vec![bad.hash]
        );
    }
}
