//! `shotline pull` - reconcile the local store with the remote.

use std::path::PathBuf;

use crate::cli::SyncArgs;
use crate::cli::commands::{
    connect_remote, finish_progress, open_store, progress_printer, resolve_remote,
};
use crate::error::Result;
use crate::storage::sqlite as store;
use crate::sync::{CancelToken, PullReport, SyncEngine, SyncOptions};

pub fn execute(args: &SyncArgs, db: Option<&PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let mut storage = open_store(db)?;
    let spec = resolve_remote(&storage, args.remote.as_deref())?;
    let user = store::user_id(storage.conn())?;

    let mut remote = connect_remote(&spec, user.as_deref())?;
    let opts = SyncOptions {
        force: args.force,
        pull_dependencies: args.deps,
        pull_everything: args.everything,
    };

    let mut progress = progress_printer(quiet);
    let report = SyncEngine::new(&mut storage).pull(
        remote.as_mut(),
        &opts,
        &mut progress,
        &CancelToken::new(),
    )?;
    finish_progress(quiet);

    print_report(&spec, &report, json, quiet)?;
    Ok(())
}

fn print_report(spec: &str, report: &PullReport, json: bool, quiet: bool) -> Result<()> {
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

    if report.up_to_date {
        println!("Already up to date with {spec}");
    } else {
        println!("Pulled from {spec}");
        println!("  Created:  {}", report.merge.created);
        println!("  Updated:  {}", report.merge.updated);
        println!("  Deleted:  {}", report.merge.deleted);
    }
    if report.previews > 0 {
        println!("  Previews: {}", report.previews);
    }
    if report.chunks.transferred > 0 {
        println!(
            "  Chunks:   {} ({} bytes, {}% deduplicated)",
            report.chunks.transferred,
            report.chunks.bytes,
            report.chunks.saved_percent()
        );
    }
    Ok(())
}
