//! Error types for the Mentra shell.

use serde::Serialize;
use thiserror::Error;

use crate::result::ResultStatus;

/// A shared error type for the whole shell core.
///
/// Variants follow the failure taxonomy the executor reports to the user,
/// plus the storage-level failures raised by repositories.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ShellError {
    /// Malformed command or missing required parts
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// App, contact, alias or thread absent
    #[error("{entity_type} not found: '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Capability not granted by the host
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation exceeded its time budget
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// Carrier reported a failure code
    #[error("{message}")]
    CarrierFailure { code: i32, message: String },

    /// More than one candidate matched a free-text target
    #[error("'{query}' matched {candidates} entries")]
    AmbiguousTarget { query: String, candidates: usize },

    /// Not a dialable phone number
    #[error("Invalid phone number: {0}")]
    InvalidNumber(String),

    /// Message body was blank
    #[error("Empty message")]
    EmptyMessage,

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShellError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an InvalidCommand error
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Timeout error
    pub fn timeout(operation: impl Into<String>, after_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after_ms,
        }
    }

    /// Creates a CarrierFailure error
    pub fn carrier_failure(code: i32, message: impl Into<String>) -> Self {
        Self::CarrierFailure {
            code,
            message: message.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if this error came from user input rather than the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCommand(_) | Self::InvalidNumber(_) | Self::EmptyMessage
        )
    }

    /// The result status this error is reported under.
    pub fn status(&self) -> ResultStatus {
        match self {
            Self::InvalidCommand(_) | Self::InvalidNumber(_) | Self::EmptyMessage => {
                ResultStatus::InvalidCommand
            }
            Self::NotFound { .. } => ResultStatus::NotFound,
            Self::AmbiguousTarget { .. } => ResultStatus::Partial,
            Self::PermissionDenied(_) => ResultStatus::RequiresPermission,
            _ => ResultStatus::Failure,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ShellError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ShellError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ShellError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ShellError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ShellError>`.
pub type Result<T> = std::result::Result<T, ShellError>;
