//! `shotline clone` - copy a remote project into a fresh local store.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::commands::{connect_remote, finish_progress, progress_printer};
use crate::config::init_db_path;
use crate::error::{Error, Result};
use crate::storage::sqlite as store;
use crate::storage::SqliteStorage;
use crate::sync::{CancelToken, SyncEngine, SyncOptions};

pub fn execute(
    source: &str,
    dest: Option<&Path>,
    user: Option<&str>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let root: PathBuf = dest.map_or(cwd, Path::to_path_buf);
    let db_path = init_db_path(&root);

    if db_path.exists() {
        return Err(Error::AlreadyInitialized { path: db_path });
    }

    // Resolve the remote before touching disk so a bad source leaves no
    // half-created store behind.
    let mut remote = connect_remote(source, user)?;

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut storage = SqliteStorage::open(&db_path)?;
    let now = chrono::Utc::now().timestamp_millis();
    store::set_server_url(storage.conn(), source)?;
    if let Some(id) = user {
        store::set_user_id(storage.conn(), id)?;
    }
    store::set_working_dir(storage.conn(), &root.display().to_string(), now)?;

    let mut progress = progress_printer(quiet);
    let report = SyncEngine::new(&mut storage).clone_from(
        remote.as_mut(),
        &SyncOptions::default(),
        &mut progress,
        &CancelToken::new(),
    )?;
    finish_progress(quiet);

    if json {
        let output = serde_json::json!({
            "success": true,
            "source": source,
            "db": db_path.display().to_string(),
            "report": report,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else if !quiet {
        println!("Cloned {source} into {}", db_path.display());
        println!("  Records: {}", report.merge.created);
        println!(
            "  Chunks:  {} ({} bytes)",
            report.chunks.transferred, report.chunks.bytes
        );
    }

    Ok(())
}
