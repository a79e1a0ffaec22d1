//! Error types for inctrack
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown position, invalid config)
//! - 3: Blocked (the ledger file is held open by another process)
//! - 4: Operation failed (I/O error, unreadable ledger)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the inct CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for ledger operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Incident not found at position {0}")]
    IncidentNotFound(usize),

    #[error("Activity record not found at position {0}")]
    ActivityNotFound(usize),

    // Blocked (exit code 3)
    #[error(
        "Cannot save {}: the file is open or locked by another process. Close it and try again.",
        .0.display()
    )]
    LockedResource(PathBuf),

    // Operation failures (exit code 4)
    #[error("Ledger file {} is unreadable: {reason}", .path.display())]
    CorruptStore { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::IncidentNotFound(_)
            | Error::ActivityNotFound(_) => exit_codes::USER_ERROR,

            // Blocked by another holder of the file
            Error::LockedResource(_) => exit_codes::BLOCKED,

            // Operation failures
            Error::CorruptStore { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured fields for machine-readable output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::InvalidConfig(message) | Error::InvalidArgument(message) => {
                Some(serde_json::json!({ "message": message }))
            }
            Error::IncidentNotFound(position) | Error::ActivityNotFound(position) => {
                Some(serde_json::json!({ "position": position }))
            }
            Error::LockedResource(path) => Some(serde_json::json!({
                "path": path.display().to_string(),
            })),
            Error::CorruptStore { path, reason } => Some(serde_json::json!({
                "path": path.display().to_string(),
                "reason": reason,
            })),
            _ => None,
        }
    }
}

/// Result type alias for ledger operations
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
