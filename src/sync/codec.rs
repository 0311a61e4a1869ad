//! Content hashing and the TLV chunk wire codec.
//!
//! A chunk travels as `tag || length || value`:
//! - `tag` — 32 bytes, the SHA-256 of the *decompressed* payload
//! - `length` — 4-byte big-endian length of `value`, capped at 16 MiB - 1
//! - `value` — the zstd-compressed payload
//!
//! The tag doubles as the chunk's identity in the content-addressed store,
//! so decoding can verify integrity without any side channel.

use std::io::Read;

use sha2::{Digest, Sha256};

use crate::sync::types::{SyncError, SyncResult};

/// Tag length in bytes (SHA-256 digest).
pub const TAG_LEN: usize = 32;

/// Length-field width in bytes.
pub const LEN_FIELD: usize = 4;

/// Fixed header size preceding every value.
pub const HEADER_LEN: usize = TAG_LEN + LEN_FIELD;

/// Maximum value length. The field is serialized as 4 bytes but values are
/// capped at the 24-bit ceiling so every peer agrees on the limit.
pub const MAX_VALUE_LEN: usize = 16_777_215;

/// An immutable, content-addressed unit of compressed binary payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Hex SHA-256 digest of the decompressed payload.
    pub hash: String,
    /// zstd-compressed payload bytes.
    pub payload: Vec<u8>,
    /// Compressed size in bytes; always `payload.len()`.
    pub size: usize,
}

impl Chunk {
    /// Wrap an already-compressed payload under its known digest.
    #[must_use]
    pub fn new(hash: String, payload: Vec<u8>) -> Self {
        let size = payload.len();
        Self {
            hash,
            payload,
            size,
        }
    }

    /// Build a chunk from raw content: compress and digest.
    ///
    /// # Errors
    ///
    /// Returns an error if compression fails.
    pub fn from_content(content: &[u8]) -> SyncResult<Self> {
        let hash = content_digest(content);
        let payload = compress(content)?;
        Ok(Self::new(hash, payload))
    }
}

/// SHA-256 over decompressed bytes; the canonical identity of a chunk.
#[must_use]
pub fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Compress raw content with zstd at the default level.
///
/// # Errors
///
/// Returns an error if the encoder fails.
pub fn compress(content: &[u8]) -> SyncResult<Vec<u8>> {
    Ok(zstd::stream::encode_all(
        content,
        zstd::DEFAULT_COMPRESSION_LEVEL,
    )?)
}

/// Decompress a zstd payload.
///
/// # Errors
///
/// Returns an error if the payload is not valid zstd data.
pub fn decompress(payload: &[u8]) -> SyncResult<Vec<u8>> {
    Ok(zstd::stream::decode_all(payload)?)
}

/// Decompress a payload and verify it hashes to `hash`.
///
/// Returns the decompressed content on success.
///
/// # Errors
///
/// Returns [`SyncError::CorruptChunk`] on digest mismatch, or a decompression
/// error (also treated as corruption by callers that collect failures).
pub fn verify_chunk(hash: &str, payload: &[u8]) -> SyncResult<Vec<u8>> {
    let content = decompress(payload).map_err(|_| SyncError::CorruptChunk {
        hash: hash.to_string(),
    })?;
    if content_digest(&content) == hash {
        Ok(content)
    } else {
        Err(SyncError::CorruptChunk {
            hash: hash.to_string(),
        })
    }
}

/// Decode a hex hash into its 32 raw tag bytes.
fn hash_to_tag(hash: &str) -> SyncResult<[u8; TAG_LEN]> {
    let bytes = hex::decode(hash).map_err(|_| SyncError::InvalidChunkHash {
        hash: hash.to_string(),
    })?;
    bytes
        .try_into()
        .map_err(|_| SyncError::InvalidChunkHash {
            hash: hash.to_string(),
        })
}

/// Encode one chunk as a TLV record.
///
/// # Errors
///
/// Returns an error if the hash is not a 32-byte hex digest or the payload
/// exceeds [`MAX_VALUE_LEN`].
pub fn encode_chunk(chunk: &Chunk) -> SyncResult<Vec<u8>> {
    let tag = hash_to_tag(&chunk.hash)?;
    if chunk.payload.len() > MAX_VALUE_LEN {
        return Err(SyncError::ChunkTooLarge {
            size: chunk.payload.len(),
        });
    }

    let mut out = Vec::with_capacity(HEADER_LEN + chunk.payload.len());
    out.extend_from_slice(&tag);
    out.extend_from_slice(&u32::try_from(chunk.payload.len()).unwrap_or(0).to_be_bytes());
    out.extend_from_slice(&chunk.payload);
    Ok(out)
}

/// Encode a sequence of chunks as concatenated TLV records, in input order.
///
/// # Errors
///
/// Returns the first per-chunk encoding error.
pub fn encode_chunks(chunks: &[Chunk]) -> SyncResult<Vec<u8>> {
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend_from_slice(&encode_chunk(chunk)?);
    }
    Ok(out)
}

/// Decode one TLV record from the front of a buffer.
///
/// Returns `(hash, compressed_value, bytes_consumed)`.
///
/// # Errors
///
/// Returns [`SyncError::Truncated`] if fewer than [`HEADER_LEN`] bytes
/// remain or the declared length exceeds the remaining bytes.
pub fn decode_chunk(buf: &[u8]) -> SyncResult<(String, Vec<u8>, usize)> {
    if buf.len() < HEADER_LEN {
        return Err(SyncError::Truncated {
            needed: HEADER_LEN,
            remaining: buf.len(),
        });
    }

    let hash = hex::encode(&buf[..TAG_LEN]);
    let len = u32::from_be_bytes([
        buf[TAG_LEN],
        buf[TAG_LEN + 1],
        buf[TAG_LEN + 2],
        buf[TAG_LEN + 3],
    ]) as usize;

    let total = HEADER_LEN + len;
    if buf.len() < total {
        return Err(SyncError::Truncated {
            needed: total,
            remaining: buf.len(),
        });
    }

    Ok((hash, buf[HEADER_LEN..total].to_vec(), total))
}

/// Streaming TLV decoder over any reader.
///
/// Yields `(hash, compressed_value)` pairs until end-of-input. A partial
/// trailing record (incomplete tag, length, or value) is an error, never
/// silently dropped.
pub struct ChunkReader<R: Read> {
    reader: R,
    done: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    fn read_record(&mut self) -> SyncResult<Option<(String, Vec<u8>)>> {
        let mut header = [0u8; HEADER_LEN];
        let mut filled = 0;

        // Fill the header by hand so a clean EOF at a record boundary can be
        // told apart from a mid-header truncation.
        while filled < HEADER_LEN {
            let n = self.reader.read(&mut header[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(SyncError::Truncated {
                    needed: HEADER_LEN,
                    remaining: filled,
                });
            }
            filled += n;
        }

        let hash = hex::encode(&header[..TAG_LEN]);
        let len = u32::from_be_bytes([
            header[TAG_LEN],
            header[TAG_LEN + 1],
            header[TAG_LEN + 2],
            header[TAG_LEN + 3],
        ]) as usize;

        let mut value = vec![0u8; len];
        self.reader
            .read_exact(&mut value)
            .map_err(|_| SyncError::Truncated {
                needed: len,
                remaining: 0,
            })?;

        Ok(Some((hash, value)))
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = SyncResult<(String, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
