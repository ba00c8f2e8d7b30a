//! Snapshot listing and retrieval.

use std::sync::Arc;

use liftvault_codec::{Record, RecordKind, SnapshotMetadata};
use liftvault_model::EntityCounts;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::RetryConfig;
use crate::error::{BackupError, BackupResult};
use crate::remote::{RecordTag, RemoteError, RemoteStore};
use crate::retry::run_with_retry;

/// A listed snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    /// Snapshot id.
    pub snapshot_id: Uuid,
    /// Device that wrote the snapshot.
    pub device_name: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Entity counts recorded at backup time.
    pub counts: EntityCounts,
    /// Snapshot format version.
    pub format_version: i64,
    /// Version of the writing application.
    pub app_version: String,
}

impl From<SnapshotMetadata> for SnapshotSummary {
    fn from(meta: SnapshotMetadata) -> Self {
        Self {
            snapshot_id: meta.snapshot_id,
            device_name: meta.device_name,
            created_at: meta.created_at,
            counts: meta.counts,
            format_version: meta.format_version,
            app_version: meta.app_version,
        }
    }
}

/// Every record of one snapshot, with its parsed metadata.
#[derive(Debug, Clone)]
pub struct SnapshotContents {
    /// The snapshot's metadata.
    pub summary: SnapshotSummary,
    /// All of the snapshot's records, metadata included.
    pub records: Vec<Record>,
}

/// Reads snapshots from the remote store.
pub struct Catalog<R: RemoteStore + ?Sized> {
    remote: Arc<R>,
    retry: RetryConfig,
}

impl<R: RemoteStore + ?Sized> Catalog<R> {
    /// Creates a catalog over `remote`.
    pub fn new(remote: Arc<R>, retry: RetryConfig) -> Self {
        Self { remote, retry }
    }

    /// Lists complete snapshots, newest first.
    ///
    /// Only snapshots with a metadata record are listed. Unreadable metadata
    /// records are skipped with a warning.
    pub async fn list(&self) -> BackupResult<Vec<SnapshotSummary>> {
        let (remote, tag) = (&self.remote, &RecordTag::Kind(RecordKind::Metadata));
        let records = run_with_retry(&self.retry, move || remote.query(tag))
            .await
            .map_err(remote_error)?;

        let mut summaries: Vec<SnapshotSummary> = records
            .iter()
            .filter_map(|record| match SnapshotMetadata::from_record(record) {
                Ok(meta) => Some(meta.into()),
                Err(e) => {
                    warn!(
                        record_id = %record.id,
                        error = %e,
                        "skipping unreadable snapshot metadata"
                    );
                    None
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.snapshot_id.cmp(&b.snapshot_id))
        });
        debug!(count = summaries.len(), "listed snapshots");
        Ok(summaries)
    }

    /// Fetches every record of a snapshot.
    ///
    /// Fails with [`BackupError::SnapshotNotFound`] if the snapshot has no
    /// metadata record, and with [`BackupError::DecodeFailed`] if the
    /// metadata record is malformed or could not be read at all.
    pub async fn fetch_full(&self, snapshot_id: Uuid) -> BackupResult<SnapshotContents> {
        let (remote, tag) = (&self.remote, &RecordTag::Snapshot(snapshot_id));
        let records = run_with_retry(&self.retry, move || remote.query(tag))
            .await
            .map_err(remote_error)?;

        let meta_record = records
            .iter()
            .filter(|r| r.id == snapshot_id)
            .find(|r| r.is_metadata() || r.unreadable_error().is_some())
            .ok_or(BackupError::SnapshotNotFound { snapshot_id })?;
        let meta = SnapshotMetadata::from_record(meta_record).map_err(|reason| {
            BackupError::DecodeFailed {
                record_id: meta_record.id,
                reason,
            }
        })?;

        debug!(%snapshot_id, records = records.len(), "fetched snapshot");
        Ok(SnapshotContents {
            summary: meta.into(),
            records,
        })
    }
}

/// Maps a failed remote call to the engine's error type.
pub(crate) fn remote_error(e: RemoteError) -> BackupError {
    match e {
        RemoteError::QuotaExceeded(msg) => BackupError::QuotaExceeded(msg),
        other => BackupError::RemoteUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemoteStore;
    use liftvault_codec::{CodecError, FieldValue, RecordKey, SnapshotHeader};

    fn publish(remote: &MemoryRemoteStore, created_at: u64) -> Uuid {
        let header = SnapshotHeader::new(Uuid::new_v4(), created_at);
        let meta = SnapshotMetadata::new(&header, "phone", EntityCounts::default(), "1.0.0");
        remote.put(meta.to_record());
        remote.put(Record::new(Uuid::new_v4(), RecordKind::Workout, &header));
        header.snapshot_id
    }

    fn catalog(remote: &Arc<MemoryRemoteStore>) -> Catalog<MemoryRemoteStore> {
        Catalog::new(Arc::clone(remote), RetryConfig::immediate(3))
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let old = publish(&remote, 100);
        let new = publish(&remote, 300);
        let mid = publish(&remote, 200);

        let ids: Vec<_> = catalog(&remote)
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.snapshot_id)
            .collect();
        assert_eq!(ids, vec![new, mid, old]);
    }

    #[tokio::test]
    async fn list_empty_and_skips_malformed() {
        let remote = Arc::new(MemoryRemoteStore::new());
        assert!(catalog(&remote).list().await.unwrap().is_empty());

        let header = SnapshotHeader::new(Uuid::new_v4(), 5);
        remote.put(
            Record::new(header.snapshot_id, RecordKind::Metadata, &header)
                .with_field("timestamp", FieldValue::Text("yesterday".into())),
        );
        publish(&remote, 6);
        assert_eq!(catalog(&remote).list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fetch_full_requires_metadata() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let id = publish(&remote, 10);

        let contents = catalog(&remote).fetch_full(id).await.unwrap();
        assert_eq!(contents.summary.snapshot_id, id);
        assert_eq!(contents.records.len(), 2);

        // Data without metadata is an unfinished snapshot.
        let orphan = SnapshotHeader::new(Uuid::new_v4(), 11);
        remote.put(Record::new(Uuid::new_v4(), RecordKind::Workout, &orphan));
        assert!(matches!(
            catalog(&remote).fetch_full(orphan.snapshot_id).await,
            Err(BackupError::SnapshotNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn unreadable_metadata_is_a_decode_failure() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let id = publish(&remote, 10);
        remote.put(Record::unreadable(RecordKey::new(id, id), "truncated"));

        assert!(matches!(
            catalog(&remote).fetch_full(id).await,
            Err(BackupError::DecodeFailed {
                reason: CodecError::Unreadable { .. },
                ..
            })
        ));
        assert!(catalog(&remote).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_remote_is_reported() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.set_available(false);
        assert!(matches!(
            catalog(&remote).list().await,
            Err(BackupError::RemoteUnavailable(_))
        ));
    }
}
