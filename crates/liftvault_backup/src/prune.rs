//! Snapshot deletion.

use std::sync::Arc;

use liftvault_codec::Record;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RetryConfig;
use crate::remote::{RecordTag, RemoteStore};
use crate::retry::run_with_retry;
use crate::writer::BatchWriter;

/// Outcome of deleting snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Snapshots whose records are all gone.
    pub succeeded: Vec<Uuid>,
    /// Snapshots with at least one surviving record.
    pub failed: Vec<Uuid>,
}

impl PruneReport {
    /// Returns true if every requested snapshot was deleted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deletes every record of the given snapshots.
pub struct Pruner<R: RemoteStore + ?Sized> {
    remote: Arc<R>,
    writer: BatchWriter<R>,
    retry: RetryConfig,
}

impl<R: RemoteStore + ?Sized + 'static> Pruner<R> {
    /// Creates a pruner that deletes through `writer`.
    pub fn new(remote: Arc<R>, writer: BatchWriter<R>, retry: RetryConfig) -> Self {
        Self {
            remote,
            writer,
            retry,
        }
    }

    /// Deletes each snapshot in turn.
    ///
    /// Data records go first; the metadata record is deleted only after
    /// every data record is gone, so a partly deleted snapshot stays listed
    /// and can be pruned again. A snapshot with no records counts as deleted.
    pub async fn delete(&self, snapshot_ids: &[Uuid]) -> PruneReport {
        let mut report = PruneReport::default();
        for &snapshot_id in snapshot_ids {
            if self.delete_one(snapshot_id).await {
                report.succeeded.push(snapshot_id);
            } else {
                report.failed.push(snapshot_id);
            }
        }
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "prune finished"
        );
        report
    }

    async fn delete_one(&self, snapshot_id: Uuid) -> bool {
        let (remote, tag) = (&self.remote, &RecordTag::Snapshot(snapshot_id));
        let records = match run_with_retry(&self.retry, move || remote.query(tag)).await {
            Ok(records) => records,
            Err(e) => {
                warn!(%snapshot_id, error = %e, "could not list snapshot records");
                return false;
            }
        };

        let (metadata, data): (Vec<Record>, Vec<Record>) =
            records.into_iter().partition(Record::is_metadata);

        let result = self.writer.delete(data.iter().map(Record::key).collect()).await;
        if !result.is_complete() {
            warn!(%snapshot_id, failed = result.failed.len(), "snapshot data not fully deleted");
            return false;
        }

        let result = self
            .writer
            .delete(metadata.iter().map(Record::key).collect())
            .await;
        if !result.is_complete() {
            warn!(%snapshot_id, "snapshot metadata not deleted");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackupConfig;
    use crate::remote::MemoryRemoteStore;
    use liftvault_codec::{RecordKind, SnapshotHeader, SnapshotMetadata};
    use liftvault_model::EntityCounts;

    fn publish(remote: &MemoryRemoteStore, records: usize) -> Uuid {
        let header = SnapshotHeader::new(Uuid::new_v4(), 1);
        let metadata = SnapshotMetadata::new(&header, "phone", EntityCounts::default(), "1");
        remote.put(metadata.to_record());
        for _ in 0..records {
            remote.put(Record::new(Uuid::new_v4(), RecordKind::Workout, &header));
        }
        header.snapshot_id
    }

    fn pruner(remote: &Arc<MemoryRemoteStore>) -> Pruner<MemoryRemoteStore> {
        let config = BackupConfig::new("test")
            .with_max_batch_size(4)
            .with_retry(RetryConfig::immediate(2));
        Pruner::new(
            Arc::clone(remote),
            BatchWriter::new(Arc::clone(remote), &config),
            config.retry.clone(),
        )
    }

    #[tokio::test]
    async fn deletes_only_requested_snapshots() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let doomed = publish(&remote, 9);
        let kept = publish(&remote, 2);

        let report = pruner(&remote).delete(&[doomed]).await;
        assert_eq!(report.succeeded, vec![doomed]);
        assert!(remote.records_for(doomed).is_empty());
        assert_eq!(remote.records_for(kept).len(), 3);
    }

    #[tokio::test]
    async fn missing_snapshot_is_a_no_op_success() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let report = pruner(&remote).delete(&[Uuid::new_v4()]).await;
        assert!(report.is_complete());
        assert_eq!(report.succeeded.len(), 1);
    }

    #[tokio::test]
    async fn unavailable_remote_reports_failure() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let id = publish(&remote, 1);
        remote.set_available(false);

        let report = pruner(&remote).delete(&[id]).await;
        assert_eq!(report.failed, vec![id]);
        remote.set_available(true);
        assert_eq!(remote.records_for(id).len(), 2);
    }
}
