//! `shotline init` - create a project store in the current directory.

use std::fs;
use std::path::PathBuf;

use crate::config::init_db_path;
use crate::error::{Error, Result};
use crate::storage::sqlite as store;
use crate::storage::SqliteStorage;

pub fn execute(
    remote: Option<&str>,
    user: Option<&str>,
    force: bool,
    db_override: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let db_path = db_override
        .cloned()
        .unwrap_or_else(|| init_db_path(&cwd));

    if db_path.exists() {
        if force {
            fs::remove_file(&db_path)?;
        } else {
            return Err(Error::AlreadyInitialized { path: db_path });
        }
    }
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let storage = SqliteStorage::open(&db_path)?;
    let now = chrono::Utc::now().timestamp_millis();
    if let Some(url) = remote {
        store::set_server_url(storage.conn(), url)?;
    }
    if let Some(id) = user {
        store::set_user_id(storage.conn(), id)?;
    }
    store::set_working_dir(storage.conn(), &cwd.display().to_string(), now)?;

    if json {
        let output = serde_json::json!({
            "success": true,
            "db": db_path.display().to_string(),
            "remote": remote,
            "user": user,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized project store at {}", db_path.display());
        if let Some(url) = remote {
            println!("  Remote: {url}");
        }
    }

    Ok(())
}
