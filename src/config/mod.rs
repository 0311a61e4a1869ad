//! Configuration management.
//!
//! This module provides functions for discovering Shotline project
//! directories and resolving the project database path.
//!
//! # Architecture
//!
//! Shotline uses a **per-project database**: each working copy carries a
//! `.shotline/` directory holding `project.db` (structured records, chunk
//! store, previews, config row). Remote endpoint and user identity live in
//! the database's config table, not in dotfiles, so a store file is
//! self-contained and can be opened directly as a peer remote.

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};

/// Directory name carrying the project store.
pub const PROJECT_DIR: &str = ".shotline";

/// Database file name inside the project directory.
pub const DB_FILE: &str = "project.db";

/// Discover the project `.shotline/` directory.
///
/// Resolution strategy:
/// 1. Check the **git root** first — if the git root has `.shotline/`, use
///    it. This prevents subdirectory stores from shadowing the real project
///    root.
/// 2. Fall back to walking up from CWD (for non-git projects).
#[must_use]
pub fn discover_project_dir() -> Option<PathBuf> {
    if let Some(git_root) = git_toplevel() {
        let candidate = git_root.join(PROJECT_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        loop {
            let candidate = dir.join(PROJECT_DIR);
            if candidate.is_dir() {
                return Some(candidate);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
    }
    None
}

/// Get the git repository root directory.
fn git_toplevel() -> Option<PathBuf> {
    std::process::Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| PathBuf::from(String::from_utf8_lossy(&o.stdout).trim().to_string()))
}

/// Resolve the database path, honoring an explicit override.
///
/// Without an override, the discovered project directory is used.
#[must_use]
pub fn resolve_db_path(db_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = db_override {
        return Some(path.to_path_buf());
    }
    discover_project_dir().map(|dir| dir.join(DB_FILE))
}

/// Database path for initializing a new project in `root`.
#[must_use]
pub fn init_db_path(root: &Path) -> PathBuf {
    root.join(PROJECT_DIR).join(DB_FILE)
}

/// Resolve the database path or fail with `NotInitialized`.
///
/// # Errors
///
/// Returns [`Error::NotInitialized`] when no project directory exists and
/// no override was given.
pub fn require_db_path(db_override: Option<&Path>) -> Result<PathBuf> {
    let path = resolve_db_path(db_override).ok_or(Error::NotInitialized)?;
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::NotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_db_path_honors_override() {
        let explicit = PathBuf::from("/tmp/custom.db");
        assert_eq!(
            resolve_db_path(Some(&explicit)),
            Some(PathBuf::from("/tmp/custom.db"))
        );
    }

    #[test]
    fn test_init_db_path_shape() {
        let path = init_db_path(Path::new("/work/show"));
        assert_eq!(path, PathBuf::from("/work/show/.shotline/project.db"));
    }

    #[test]
    fn test_require_db_path_missing_is_not_initialized() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("absent.db");
        let err = require_db_path(Some(&missing)).unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
    }
}
