//! Command implementations.

pub mod clone;
pub mod completions;
pub mod init;
pub mod pull;
pub mod push;
pub mod status;
pub mod version;

use std::io::Write;
use std::path::PathBuf;

use crate::config::require_db_path;
use crate::error::{Error, Result};
use crate::storage::sqlite as store;
use crate::storage::SqliteStorage;
use crate::sync::TransferProgress;

/// Open the project store, honoring a `--db` override.
pub(crate) fn open_store(db_override: Option<&PathBuf>) -> Result<SqliteStorage> {
    let path = require_db_path(db_override.map(PathBuf::as_path))?;
    SqliteStorage::open(&path)
}

/// Resolve the remote spec: explicit flag first, configured server second.
pub(crate) fn resolve_remote(
    storage: &SqliteStorage,
    flag: Option<&str>,
) -> Result<String> {
    if let Some(spec) = flag {
        return Ok(spec.to_string());
    }
    store::server_url(storage.conn())?.ok_or_else(|| {
        Error::Config("no remote configured; pass --remote or set one via `shotline init`".into())
    })
}

/// Open the remote, mapping an unrecognizable spec to a not-found error
/// with a usable hint.
pub(crate) fn connect_remote(
    spec: &str,
    user: Option<&str>,
) -> Result<Box<dyn crate::sync::Remote>> {
    crate::sync::open_remote(spec, user).map_err(|e| match e {
        crate::sync::SyncError::InvalidRemote(_) => Error::RemoteNotFound {
            spec: spec.to_string(),
        },
        other => other.into(),
    })
}

/// Progress printer for transfer loops.
///
/// Writes a single rewriting line to stderr; silent in quiet mode.
pub(crate) fn progress_printer(quiet: bool) -> impl FnMut(&TransferProgress) {
    move |p: &TransferProgress| {
        if quiet {
            return;
        }
        let percent = if p.bytes_total == 0 {
            100
        } else {
            p.bytes_done * 100 / p.bytes_total
        };
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\r{} {percent}% ({})", p.message, p.detail);
        let _ = stderr.flush();
    }
}

/// End a progress line, if one was drawn.
pub(crate) fn finish_progress(quiet: bool) {
    if !quiet {
        eprintln!();
    }
}
