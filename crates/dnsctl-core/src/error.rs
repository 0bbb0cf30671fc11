//! Error types shared across the dnsctl crates.

use crate::record::ChangeSet;
use thiserror::Error;

/// Result type alias for dnsctl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dnsctl
#[derive(Error, Debug)]
pub enum Error {
    /// No configured zone is a suffix of the requested name
    #[error("no configured zone matches '{0}'")]
    UnknownZone(String),

    /// The backend does not know the zone it was asked about
    #[error("zone not found: {0}")]
    ZoneNotFound(String),

    /// Absent found nothing to delete
    #[error("no records matching {0}")]
    NotFound(String),

    /// The backend could not be reached at all
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A backend call failed, possibly part-way through. `partial` holds
    /// the changes that were applied before the failure so callers can
    /// still report them.
    #[error("backend error: {message}")]
    Backend {
        /// What went wrong
        message: String,
        /// Changes applied before the failure (may be empty)
        partial: ChangeSet,
    },

    /// Configuration errors (fatal at startup)
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing or invalid message signature
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Opcode, class, or record type the engine does not implement
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Record data that cannot be parsed or encoded
    #[error("invalid record data: {0}")]
    InvalidRecord(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a backend error with no partial changes
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend {
            message: msg.into(),
            partial: ChangeSet::default(),
        }
    }

    /// Create a backend error carrying the changes applied before the failure
    pub fn backend_partial(msg: impl Into<String>, partial: ChangeSet) -> Self {
        Self::Backend {
            message: msg.into(),
            partial,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create an invalid-record error
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    /// The changes a failed backend call applied before it stopped, if any
    pub fn partial_changes(&self) -> Option<&ChangeSet> {
        match self {
            Self::Backend { partial, .. } if !partial.is_empty() => Some(partial),
            _ => None,
        }
    }
}
