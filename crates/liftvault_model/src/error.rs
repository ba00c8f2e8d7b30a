//! Error types for local store operations.

use std::io;
use thiserror::Error;

use crate::entity::EntityKind;

/// Result type for local store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in local store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred while reading or writing the store file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store file could not be parsed or serialized.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store refused a write.
    #[error("write rejected for {kind}: {message}")]
    WriteRejected {
        /// Kind of entity being written.
        kind: EntityKind,
        /// Description of the rejection.
        message: String,
    },

    /// Persisting staged changes failed.
    #[error("save failed: {0}")]
    SaveFailed(String),
}

impl StoreError {
    /// Creates a write rejection error.
    pub fn write_rejected(kind: EntityKind, message: impl Into<String>) -> Self {
        Self::WriteRejected {
            kind,
            message: message.into(),
        }
    }
}
