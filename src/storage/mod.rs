//! SQLite storage layer for Shotline.
//!
//! This module provides the persistence layer using SQLite with:
//! - Transaction discipline for atomic writes (IMMEDIATE transactions)
//! - `is_synced`/`synced_at` columns for changed-row tracking
//! - A content-addressed chunk table and preview storage
//! - A trash table feeding the tombstone list on push
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Storage implementation and record accessors

pub mod schema;
pub mod sqlite;

pub use schema::{apply_schema, clear_structured_tables, STRUCTURED_TABLES};
pub use sqlite::SqliteStorage;
