//! Error types for backup operations.

use std::fmt;

use liftvault_codec::CodecError;
use liftvault_model::StoreError;
use thiserror::Error;
use uuid::Uuid;

use crate::engine::OperationKind;
use crate::gate::ConnectionClass;

/// Result type for backup operations.
pub type BackupResult<T> = Result<T, BackupError>;

/// A step of the restore pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    /// Fetching the snapshot's records.
    Fetch,
    /// Decoding records into scalar entities.
    Decode,
    /// Deleting local entities of the kinds being restored.
    Clear,
    /// Inserting scalar-only entities.
    InsertScalars,
    /// Resolving references and storing linked entities.
    AttachRelationships,
    /// Persisting the restored graph.
    Commit,
}

impl fmt::Display for RestorePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RestorePhase::Fetch => "fetch",
            RestorePhase::Decode => "decode",
            RestorePhase::Clear => "clear",
            RestorePhase::InsertScalars => "insert scalars",
            RestorePhase::AttachRelationships => "attach relationships",
            RestorePhase::Commit => "commit",
        })
    }
}

/// Errors that can occur during backup, restore or pruning.
#[derive(Error, Debug)]
pub enum BackupError {
    /// The connection does not permit network transfers.
    #[error("network blocked: connection is {class}")]
    NetworkBlocked {
        /// Connection class at the time of the check.
        class: ConnectionClass,
    },

    /// The remote store cannot be reached or the account is unusable.
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Some records were not written; the snapshot was not published.
    #[error("{} record(s) failed to write", failed_record_ids.len())]
    PartialWriteFailure {
        /// Ids of the records that were not written.
        failed_record_ids: Vec<Uuid>,
    },

    /// No metadata record exists for the snapshot.
    #[error("snapshot {snapshot_id} not found")]
    SnapshotNotFound {
        /// The requested snapshot.
        snapshot_id: Uuid,
    },

    /// A record that must be readable could not be decoded.
    #[error("failed to decode record {record_id}: {reason}")]
    DecodeFailed {
        /// The malformed record.
        record_id: Uuid,
        /// Why decoding failed.
        reason: CodecError,
    },

    /// Existing local entities could not be removed.
    #[error("failed to clear local store: {source}")]
    ClearFailed {
        /// Underlying store error.
        source: StoreError,
    },

    /// Restored entities could not be staged.
    #[error("restore failed during {phase}: {source}")]
    InsertFailed {
        /// Phase that failed.
        phase: RestorePhase,
        /// Underlying store error.
        source: StoreError,
    },

    /// The restored graph could not be saved.
    #[error("failed to commit restore: {source}")]
    CommitFailed {
        /// Underlying store error.
        source: StoreError,
    },

    /// The remote account is out of storage.
    #[error("remote quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Another operation of the same kind is already running.
    #[error("a {operation} is already in progress")]
    OperationInProgress {
        /// The operation that was refused.
        operation: OperationKind,
    },

    /// Local store error outside a restore.
    #[error("local store error: {0}")]
    LocalStore(#[from] StoreError),
}

impl BackupError {
    /// Returns the restore phase this error belongs to, if any.
    pub fn restore_phase(&self) -> Option<RestorePhase> {
        match self {
            BackupError::SnapshotNotFound { .. } => Some(RestorePhase::Fetch),
            BackupError::DecodeFailed { .. } => Some(RestorePhase::Decode),
            BackupError::ClearFailed { .. } => Some(RestorePhase::Clear),
            BackupError::InsertFailed { phase, .. } => Some(*phase),
            BackupError::CommitFailed { .. } => Some(RestorePhase::Commit),
            _ => None,
        }
    }

    /// Returns true if retrying the whole operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackupError::NetworkBlocked { .. }
                | BackupError::RemoteUnavailable(_)
                | BackupError::PartialWriteFailure { .. }
                | BackupError::OperationInProgress { .. }
        )
    }
}
