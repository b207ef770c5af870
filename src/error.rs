//! Error types for trak
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown id, invalid record)
//! - 4: Operation failed (I/O, lock timeout)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the trak CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for trak operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task store not found: {0}")]
    StoreNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    NotFound(u64),

    #[error("Invalid record at {path}: expected {expected}, got {actual}")]
    SchemaInvalid {
        path: String,
        expected: String,
        actual: String,
    },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition timed out: {0}")]
    LockTimeout(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::StoreNotFound(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::NotFound(_)
            | Error::SchemaInvalid { .. } => exit_codes::USER_ERROR,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockTimeout(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error bodies, where the variant carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::SchemaInvalid {
                path,
                expected,
                actual,
            } => Some(serde_json::json!({
                "path": path,
                "expected": expected,
                "actual": actual,
            })),
            Error::NotFound(id) => Some(serde_json::json!({ "id": id })),
            _ => None,
        }
    }
}

/// Result type alias for trak operations
pub type Result<T> = std::result::Result<T, Error>;
