//! Error types for the audit subsystem.

use thiserror::Error;

/// Main error type for audit operations.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Configuration-related errors (bad device options, bad settings file).
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// An audit device was enabled with an empty path.
    #[error("backend path must be specified")]
    EmptyMountPath,

    /// Enabling a device would create a mount path that is a prefix of an
    /// existing one, or the reverse.
    #[error("path already in use")]
    PathInUse,

    /// Disable targeted a path with no enabled device.
    #[error("no matching backend")]
    NoMatchingBackend,

    /// Persisting the audit table through the barrier failed; the in-memory
    /// table was left untouched.
    #[error("failed to update audit table")]
    UpdateTableFailed,

    /// Reading or decoding the persisted audit table failed.
    #[error("failed to setup audit table")]
    SetupTableFailed,

    /// Every registered device failed to log the event.
    #[error("no audit backend succeeded in logging the {0}")]
    AllSinksFailed(&'static str),

    /// Barrier read/write errors.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Device-level delivery errors (syslog connection, write failures).
    #[error("Sink error: {message}")]
    Sink { message: String },

    /// Internal errors (poisoned locks).
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
