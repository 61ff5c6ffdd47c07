//! Error types for t0
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad config, unparsable todo line, bad identity)
//! - 4: Operation failed (file I/O, tracker request, serialization)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the t0 CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for t0 operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid todo.txt line {line}: {message}")]
    TodoParse { line: usize, message: String },

    // Operation failures (exit code 4)
    #[error("todo file {op} error at {path}: {source}")]
    TodoFile {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tracker} request failed: {message}")]
    Tracker {
        tracker: &'static str,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidIdentity(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TodoParse { .. } => exit_codes::USER_ERROR,

            Error::TodoFile { .. }
            | Error::Tracker { .. }
            | Error::Http(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured fields for JSON error output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::InvalidIdentity(value) => Some(serde_json::json!({ "value": value })),
            Error::InvalidConfig(message) | Error::InvalidArgument(message) => {
                Some(serde_json::json!({ "message": message }))
            }
            Error::TodoParse { line, message } => Some(serde_json::json!({
                "line": line,
                "message": message,
            })),
            Error::TodoFile { op, path, .. } => Some(serde_json::json!({
                "op": op,
                "path": path.to_string_lossy(),
            })),
            Error::Tracker { tracker, message } => Some(serde_json::json!({
                "tracker": tracker,
                "message": message,
            })),
            _ => None,
        }
    }
}

/// Result type alias for t0 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
