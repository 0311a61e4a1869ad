//! Shotline CLI - production tracking and asset pipeline sync client
//!
//! This crate provides the core functionality for the `shotline` tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Syncable record types (tasks, entities, checkpoints, ...)
//! - [`storage`] - SQLite project store (records, chunks, previews, config)
//! - [`sync`] - Chunk store, wire codec, differ, merge writer, orchestrator
//! - [`config`] - Project discovery and database path resolution
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
