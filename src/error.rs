//! Error types for Shotline CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Shotline operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string; shells on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    RemoteNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidRemote,

    // Consistency (exit 5)
    MissingChunks,
    MissingPreviews,
    UnresolvedParent,
    CycleDetected,

    // Sync (exit 6)
    SyncError,
    Cancelled,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::RemoteNotFound => "REMOTE_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidRemote => "INVALID_REMOTE",
            Self::MissingChunks => "MISSING_CHUNKS",
            Self::MissingPreviews => "MISSING_PREVIEWS",
            Self::UnresolvedParent => "UNRESOLVED_PARENT",
            Self::CycleDetected => "CYCLE_DETECTED",
            Self::SyncError => "SYNC_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::RemoteNotFound => 3,
            Self::InvalidArgument | Self::InvalidRemote => 4,
            Self::MissingChunks
            | Self::MissingPreviews
            | Self::UnresolvedParent
            | Self::CycleDetected => 5,
            Self::SyncError | Self::Cancelled => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether a caller should retry after correcting input or state.
    ///
    /// True for validation errors, for consistency errors that a prior
    /// push/pull repairs, and for cancelled calls (every sync operation is
    /// idempotent and safe to re-run). False for not-found, I/O, or
    /// internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument
                | Self::InvalidRemote
                | Self::MissingChunks
                | Self::MissingPreviews
                | Self::Cancelled
                | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Shotline CLI operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `shotline init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Remote not found: {spec}")]
    RemoteNotFound { spec: String },

    /// A UNIQUE constraint rejected the write.
    ///
    /// Surfaced as its own kind so merge paths can treat a re-applied
    /// dependency link as a benign skip instead of string-matching SQLite
    /// messages.
    #[error("Duplicate record: {id}")]
    Duplicate { id: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Sync(#[from] crate::sync::SyncError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        use crate::sync::SyncError;
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::RemoteNotFound { .. } => ErrorCode::RemoteNotFound,
            Self::Duplicate { .. } | Self::Database(_) => ErrorCode::DatabaseError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Sync(e) => match e {
                SyncError::MissingChunks { .. } => ErrorCode::MissingChunks,
                SyncError::MissingPreviews { .. } => ErrorCode::MissingPreviews,
                SyncError::UnresolvedParent { .. } => ErrorCode::UnresolvedParent,
                SyncError::EntityCycle { .. } => ErrorCode::CycleDetected,
                SyncError::Cancelled => ErrorCode::Cancelled,
                SyncError::InvalidRemote(_) => ErrorCode::InvalidRemote,
                _ => ErrorCode::SyncError,
            },
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint for humans and scripts.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        use crate::sync::SyncError;
        match self {
            Self::NotInitialized => {
                Some("Run `shotline init` to create the project database".to_string())
            }

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::RemoteNotFound { spec } => Some(format!(
                "'{spec}' is neither a server URL nor an existing store file. \
                 Pass an http(s) URL or the path to a peer project file."
            )),

            Self::Sync(SyncError::MissingChunks { count }) => Some(format!(
                "{count} referenced chunk(s) are not present locally. \
                 Run `shotline pull` to fetch binary data before pushing."
            )),

            Self::Sync(SyncError::MissingPreviews { count }) => Some(format!(
                "{count} referenced preview(s) are not present locally. \
                 Run `shotline pull` to fetch them before pushing."
            )),

            Self::Sync(SyncError::Cancelled) => Some(
                "The sync was interrupted. Re-running the same command resumes \
                 where it left off."
                    .to_string(),
            ),

            _ => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
