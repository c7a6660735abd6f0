//! Error types for daylist
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (blank title, bad date, bad selector, bad config)
//! - 3: Data error (a collection file is corrupt or holds a malformed record)
//! - 4: Operation failed (I/O, lock contention)

use std::path::{Path, PathBuf};
use serde::Serialize;
use thiserror::Error;

/// Exit codes for the daylist CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const DATA_ERROR: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for daylist operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Data errors (exit code 3)
    #[error("Malformed record #{index}{}: {reason}", location(path))]
    MalformedRecord {
        path: Option<PathBuf>,
        index: usize,
        reason: String,
    },

    #[error("Corrupt store {}: {reason}", path.display())]
    CorruptStore { path: PathBuf, reason: String },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidInput(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_)
            | Error::InvalidConfig(_) => exit_codes::USER_ERROR,

            Error::MalformedRecord { .. } | Error::CorruptStore { .. } => exit_codes::DATA_ERROR,

            Error::Io(_) | Error::Json(_) | Error::TomlParse(_) | Error::LockFailed(_) => {
                exit_codes::OPERATION_FAILED
            }
        }
    }

    /// Machine-readable category matching the exit code
    pub fn kind(&self) -> &'static str {
        match self.exit_code() {
            exit_codes::USER_ERROR => "user_error",
            exit_codes::DATA_ERROR => "data_error",
            _ => "operation_failed",
        }
    }

    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            path: None,
            index,
            reason: reason.into(),
        }
    }

    /// Attach the file a malformed record was read from.
    pub(crate) fn in_file(self, file: &Path) -> Self {
        match self {
            Error::MalformedRecord { index, reason, .. } => Error::MalformedRecord {
                path: Some(file.to_path_buf()),
                index,
                reason,
            },
            other => other,
        }
    }
}

fn location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" in {}", path.display()))
        .unwrap_or_default()
}

/// Result type alias for daylist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error body of the JSON output envelope
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub message: String,
    pub code: i32,
    pub kind: &'static str,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            message: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
        }
    }
}
