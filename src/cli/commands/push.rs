//! `shotline push` - send local changes to the remote.

use std::path::PathBuf;

use crate::cli::commands::{
    connect_remote, finish_progress, open_store, progress_printer, resolve_remote,
};
use crate::error::Result;
use crate::storage::sqlite as store;
use crate::sync::{CancelToken, SyncEngine};

pub fn execute(
    remote_flag: Option<&str>,
    db: Option<&PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let mut storage = open_store(db)?;
    let spec = resolve_remote(&storage, remote_flag)?;
    let user = store::user_id(storage.conn())?;

    let mut remote = connect_remote(&spec, user.as_deref())?;
    let mut progress = progress_printer(quiet);
    let report = SyncEngine::new(&mut storage).push(
        remote.as_mut(),
        &mut progress,
        &CancelToken::new(),
    )?;
    finish_progress(quiet);

    if json {
        let output = serde_json::json!({
            "success": true,
            "remote": spec,
            "report": report,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    if report.pushed {
        println!("Pushed to {spec}");
        println!("  Records:    {}", report.records);
        if report.tombstones > 0 {
            println!("  Tombstones: {}", report.tombstones);
        }
        if report.chunks.transferred > 0 {
            println!(
                "  Chunks:     {} ({} bytes, {}% deduplicated)",
                report.chunks.transferred,
                report.chunks.bytes,
                report.chunks.saved_percent()
            );
        }
        if report.previews > 0 {
            println!("  Previews:   {}", report.previews);
        }
    } else {
        println!("Nothing to push.");
    }
    Ok(())
}
