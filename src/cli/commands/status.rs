//! `shotline status` - show local sync state.

use std::path::PathBuf;

use colored::Colorize;

use crate::cli::commands::open_store;
use crate::error::Result;
use crate::sync::SyncEngine;

pub fn execute(db: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_store(db)?;
    let report = SyncEngine::new(&mut storage).status()?;

    if json {
        let output = serde_json::json!({
            "success": true,
            "status": report,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if report.is_clean() {
        println!("{}", "Everything synced.".green());
    } else {
        println!("{}", "Pending changes:".yellow());
        for (table, count) in &report.unsynced {
            println!("  {table:<20} {count}");
        }
        if report.pending_deletions > 0 {
            println!("  {:<20} {}", "deletions", report.pending_deletions);
        }
    }

    match &report.sync_token {
        Some(token) => println!("Sync token: {token}"),
        None => println!("Sync token: {} (never pulled)", "none".dimmed()),
    }

    Ok(())
}
