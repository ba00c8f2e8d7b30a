//! Remote record store abstraction.
//!
//! The engine only needs batched writes, tag queries and batched deletes.
//! Every operation is idempotent by [`RecordKey`]: writing a key twice
//! overwrites it and deleting a missing key succeeds.

mod directory;
mod memory;

pub use directory::DirectoryRemoteStore;
pub use memory::MemoryRemoteStore;

use std::time::Duration;

use async_trait::async_trait;
use liftvault_codec::{Record, RecordKey, RecordKind};
use thiserror::Error;
use uuid::Uuid;

/// Result type for remote store calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors reported by a remote store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The store asked the client to slow down.
    #[error("request throttled")]
    Throttled {
        /// How long the store asked the client to wait.
        retry_after: Option<Duration>,
    },

    /// The account is over its storage quota.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// A network-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The store refused the record or request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The store or account cannot be used at all.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// The request exceeded the store's batch limit.
    #[error("batch of {len} exceeds limit of {limit}")]
    BatchTooLarge {
        /// Records in the request.
        len: usize,
        /// The store's limit.
        limit: usize,
    },
}

impl RemoteError {
    /// Returns true if the same request may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::Timeout
                | RemoteError::Throttled { .. }
                | RemoteError::QuotaExceeded(_)
                | RemoteError::Network(_)
        )
    }

    /// Returns the wait the store asked for, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RemoteError::Throttled { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Selects records for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTag {
    /// Every record of one kind, across all snapshots.
    Kind(RecordKind),
    /// Every record of one snapshot.
    Snapshot(Uuid),
}

impl RecordTag {
    /// Returns true if the record matches this tag.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            RecordTag::Kind(kind) => record.kind == kind.as_str(),
            RecordTag::Snapshot(id) => record.snapshot_id == *id,
        }
    }
}

/// Per-record results of an accepted batch request.
///
/// Keys not listed in `failures` succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Records the store did not accept.
    pub failures: Vec<(RecordKey, RemoteError)>,
}

impl BatchOutcome {
    /// An outcome in which every record succeeded.
    pub fn success() -> Self {
        Self::default()
    }

    /// Returns true if no record failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A remote record store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Writes a batch of records, overwriting existing keys.
    ///
    /// An `Err` means the request as a whole failed and nothing can be
    /// assumed written.
    async fn write_batch(&self, records: &[Record]) -> RemoteResult<BatchOutcome>;

    /// Returns every record matching the tag.
    async fn query(&self, tag: &RecordTag) -> RemoteResult<Vec<Record>>;

    /// Deletes a batch of records. Missing keys are not failures.
    async fn delete_batch(&self, keys: &[RecordKey]) -> RemoteResult<BatchOutcome>;
}
