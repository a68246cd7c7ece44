//! chronicle - Personal Task Tracker Library
//!
//! This library provides the core functionality for the chronicle CLI,
//! a task tracker whose split/merge lineage is reconstructed from an
//! append-only history event log.
//!
//! # Core Concepts
//!
//! - **Tasks**: mutable rows in a table document, soft-deleted, never removed
//! - **History Events**: immutable, append-only records of task changes;
//!   splits and merges are recorded from both participants' perspectives
//! - **Structural Edges**: split/merge relations derived from the log, never
//!   stored
//! - **Lineage Graph**: a positioned directed graph rebuilt from a snapshot
//!   under three traversal modes (direct, recursive, all)
//!
//! # Module Organization
//!
//! - `cli`: command-line interface using clap
//! - `config`: configuration loading from `.chronicle.toml`
//! - `error`: error types and result aliases
//! - `model`: task and history event data contracts
//! - `store`: data directory layout and file I/O
//! - `tasks`: task store, queries, and event-producing operations
//! - `relations`: structural edge extraction from history events
//! - `lineage`: direct relation resolution for a single task
//! - `graph`: lineage graph construction and layout
//! - `output`: shared CLI output formatting
//! - `lock`: file locking and atomic writes for concurrency safety

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod lineage;
pub mod lock;
pub mod model;
pub mod output;
pub mod relations;
pub mod store;
pub mod tasks;

pub use error::{Error, Result};
