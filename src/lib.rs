//! trak - Task tracking library
//!
//! This library provides the core functionality for the trak CLI tool:
//! a task store for coding-agent workflows, backed by line-record files.
//!
//! # Core Concepts
//!
//! - **Tasks**: Work items with status, type, category and free-form metadata
//! - **Line-record files**: One JSON task per line, rewritten atomically
//! - **Indices**: Parent/child maps and file-ordered id lists kept in memory
//! - **Blocking relations**: `blocked_by` edges with cycle detection
//! - **Archive**: Completed and deleted tasks move to a second file
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `codec`: Line-record file reading and atomic writing
//! - `config`: Configuration loading from `.trak.toml`
//! - `error`: Error types and result aliases
//! - `lock`: File locking and atomic operations for concurrency safety
//! - `output`: Shared JSON/human output formatting
//! - `resolver`: Blocking-dependency resolution and cycle detection
//! - `schema`: Structural validation of task records
//! - `store`: In-memory indexed task collection
//! - `task`: Task, relation and enum types

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod task;

pub use error::{Error, Result};
