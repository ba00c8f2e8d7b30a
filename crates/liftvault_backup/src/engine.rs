//! The backup engine: the user-facing operation surface.

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use liftvault_codec::{
    decode, encode, DecodeFailure, RecordKey, SnapshotHeader, SnapshotMetadata,
};
use liftvault_model::{EntityGraph, LocalStore};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, SnapshotSummary};
use crate::config::BackupConfig;
use crate::error::{BackupError, BackupResult};
use crate::gate::{ConnectionClassifier, NetworkGate};
use crate::prune::{PruneReport, Pruner};
use crate::remote::{RemoteError, RemoteStore};
use crate::restore::{
    link, restore_into, serialize_failures, ReconstructionWarning, RestoreReport,
};
use crate::writer::{BatchWriter, FailureReason, WriteResult};

/// Operations that may not run twice at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Creating a snapshot.
    Backup,
    /// Restoring a snapshot.
    Restore,
    /// Deleting snapshots.
    Prune,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Backup => "backup",
            OperationKind::Restore => "restore",
            OperationKind::Prune => "prune",
        })
    }
}

/// Counters kept across engine operations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    /// Snapshots created.
    pub backups_created: u64,
    /// Restores committed.
    pub restores_completed: u64,
    /// Snapshots deleted.
    pub snapshots_pruned: u64,
    /// Records written to the remote store.
    pub records_written: u64,
    /// Records that failed to write.
    pub records_failed: u64,
    /// Time of the last successful backup, in milliseconds since the epoch.
    pub last_backup_at: Option<u64>,
    /// Message of the last failed operation.
    pub last_error: Option<String>,
}

/// A read-only view of what restoring a snapshot would produce.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotPreview {
    /// The snapshot's metadata.
    pub summary: SnapshotSummary,
    /// The graph a restore would write.
    pub graph: EntityGraph,
    /// Problems found while resolving references.
    pub warnings: Vec<ReconstructionWarning>,
    /// Records that would be skipped as malformed.
    #[serde(serialize_with = "serialize_failures")]
    pub malformed: Vec<DecodeFailure>,
    /// Records of kinds this build does not recognize.
    pub unknown_kinds: usize,
}

/// Clears an in-flight flag when dropped.
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Snapshot, restore and prune operations over a local and a remote store.
///
/// Every operation that touches the network checks the [`NetworkGate`]
/// first and fails with [`BackupError::NetworkBlocked`] before making any
/// remote call. Backups, restores and prunes are single-flight per kind.
pub struct BackupEngine<R: RemoteStore + ?Sized + 'static, L: LocalStore> {
    config: BackupConfig,
    remote: Arc<R>,
    local: Mutex<L>,
    gate: NetworkGate,
    backup_in_flight: AtomicBool,
    restore_in_flight: AtomicBool,
    prune_in_flight: AtomicBool,
    stats: RwLock<EngineStats>,
}

impl<R: RemoteStore + ?Sized + 'static, L: LocalStore> BackupEngine<R, L> {
    /// Creates a new engine.
    pub fn new(
        config: BackupConfig,
        remote: Arc<R>,
        local: L,
        classifier: Arc<dyn ConnectionClassifier>,
    ) -> Self {
        Self {
            config,
            remote,
            local: Mutex::new(local),
            gate: NetworkGate::new(classifier),
            backup_in_flight: AtomicBool::new(false),
            restore_in_flight: AtomicBool::new(false),
            prune_in_flight: AtomicBool::new(false),
            stats: RwLock::new(EngineStats::default()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Returns the remote store.
    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    /// Returns the network gate.
    pub fn gate(&self) -> &NetworkGate {
        &self.gate
    }

    /// Runs `f` with exclusive access to the local store.
    pub fn with_local<T>(&self, f: impl FnOnce(&mut L) -> T) -> T {
        f(&mut self.local.lock())
    }

    /// Gets the current stats.
    pub fn stats(&self) -> EngineStats {
        self.stats.read().clone()
    }

    fn begin(&self, operation: OperationKind) -> BackupResult<FlightGuard<'_>> {
        let flag = match operation {
            OperationKind::Backup => &self.backup_in_flight,
            OperationKind::Restore => &self.restore_in_flight,
            OperationKind::Prune => &self.prune_in_flight,
        };
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| BackupError::OperationInProgress { operation })?;
        Ok(FlightGuard { flag })
    }

    fn writer(&self, allow_metered: bool) -> BatchWriter<R> {
        BatchWriter::new(Arc::clone(&self.remote), &self.config)
            .with_gate(self.gate.clone(), allow_metered)
    }

    fn catalog(&self) -> Catalog<R> {
        Catalog::new(Arc::clone(&self.remote), self.config.retry.clone())
    }

    fn note_error<T>(&self, result: BackupResult<T>) -> BackupResult<T> {
        if let Err(e) = &result {
            warn!(error = %e, "operation failed");
            self.stats.write().last_error = Some(e.to_string());
        }
        result
    }

    /// Writes a new snapshot of the whole local store.
    ///
    /// Data records are written first; the metadata record that makes the
    /// snapshot visible is written only once all of them landed. If any
    /// record fails, the records already written are deleted on a best-effort
    /// basis and nothing is listed.
    pub async fn create_backup(&self, allow_metered: bool) -> BackupResult<SnapshotSummary> {
        let _flight = self.begin(OperationKind::Backup)?;
        let result = self.run_backup(allow_metered).await;
        self.note_error(result)
    }

    async fn run_backup(&self, allow_metered: bool) -> BackupResult<SnapshotSummary> {
        self.gate.check(allow_metered)?;

        let graph = {
            let store = self.local.lock();
            EntityGraph::from_store(&*store)?
        };
        let header = SnapshotHeader::new(Uuid::new_v4(), now_millis());
        let counts = graph.counts();
        let records = encode(&graph, &header);
        info!(
            snapshot_id = %header.snapshot_id,
            records = records.len(),
            "creating backup"
        );

        let writer = self.writer(allow_metered);
        let data = writer.write(records).await;
        self.count_writes(&data);
        if !data.is_complete() {
            let error = self.write_error(&data);
            self.abandon(&writer, &header, data.written).await;
            return Err(error);
        }

        let metadata = SnapshotMetadata::new(
            &header,
            self.config.device_name.as_str(),
            counts,
            self.config.app_version.as_str(),
        );
        let meta = writer.write(vec![metadata.to_record()]).await;
        self.count_writes(&meta);
        if !meta.is_complete() {
            let error = self.write_error(&meta);
            self.abandon(&writer, &header, data.written).await;
            return Err(error);
        }

        {
            let mut stats = self.stats.write();
            stats.backups_created += 1;
            stats.last_backup_at = Some(header.created_at);
            stats.last_error = None;
        }
        info!(snapshot_id = %header.snapshot_id, total = counts.total(), "backup complete");
        Ok(metadata.into())
    }

    fn count_writes(&self, result: &WriteResult) {
        let mut stats = self.stats.write();
        stats.records_written += result.written.len() as u64;
        stats.records_failed += result.failed.len() as u64;
    }

    /// Best-effort removal of the records an incomplete backup wrote.
    async fn abandon(
        &self,
        writer: &BatchWriter<R>,
        header: &SnapshotHeader,
        written: Vec<RecordKey>,
    ) {
        if written.is_empty() {
            return;
        }
        let cleanup = writer.delete(written).await;
        if cleanup.is_complete() {
            debug!(snapshot_id = %header.snapshot_id, "removed partial snapshot");
        } else {
            warn!(
                snapshot_id = %header.snapshot_id,
                remaining = cleanup.failed.len(),
                "partial snapshot left behind"
            );
        }
    }

    /// Maps an incomplete write to the error the caller sees.
    ///
    /// Blocked, unavailable and over-quota writes are reported as such only
    /// when every failed record shares that cause. Anything else keeps the
    /// failed record ids.
    fn write_error(&self, result: &WriteResult) -> BackupError {
        let partial = || BackupError::PartialWriteFailure {
            failed_record_ids: result.failed_ids(),
        };
        let Some(first) = result.failed.first().map(|f| &f.reason) else {
            return partial();
        };
        if !result.failed.iter().all(|f| same_cause(&f.reason, first)) {
            return partial();
        }
        match first {
            FailureReason::NetworkBlocked => BackupError::NetworkBlocked {
                class: self.gate.classify(),
            },
            FailureReason::Remote(RemoteError::Unavailable(msg)) => {
                BackupError::RemoteUnavailable(msg.clone())
            }
            FailureReason::Remote(RemoteError::QuotaExceeded(msg)) => {
                BackupError::QuotaExceeded(msg.clone())
            }
            _ => partial(),
        }
    }

    /// Lists complete snapshots, newest first.
    pub async fn list_backups(&self, allow_metered: bool) -> BackupResult<Vec<SnapshotSummary>> {
        let result = match self.gate.check(allow_metered) {
            Ok(()) => self.catalog().list().await,
            Err(e) => Err(e),
        };
        self.note_error(result)
    }

    /// Fetches a snapshot and reconstructs it without touching the local store.
    ///
    /// Uses the same fetch and link steps as [`restore_backup`](Self::restore_backup).
    pub async fn preview_backup(
        &self,
        snapshot_id: Uuid,
        allow_metered: bool,
    ) -> BackupResult<SnapshotPreview> {
        let result = self.run_preview(snapshot_id, allow_metered).await;
        self.note_error(result)
    }

    async fn run_preview(
        &self,
        snapshot_id: Uuid,
        allow_metered: bool,
    ) -> BackupResult<SnapshotPreview> {
        self.gate.check(allow_metered)?;
        let contents = self.catalog().fetch_full(snapshot_id).await?;
        let partial = decode(&contents.records);
        let linked = link(&partial);
        Ok(SnapshotPreview {
            summary: contents.summary,
            graph: linked.graph,
            warnings: linked.warnings,
            malformed: partial.failures,
            unknown_kinds: partial.unknown_kinds,
        })
    }

    /// Replaces local entities with the contents of a snapshot.
    ///
    /// The gate is checked once, before fetching. After the fetch the
    /// restore runs to completion or to a store failure, in which case every
    /// local change is rolled back.
    pub async fn restore_backup(
        &self,
        snapshot_id: Uuid,
        allow_metered: bool,
    ) -> BackupResult<RestoreReport> {
        let _flight = self.begin(OperationKind::Restore)?;
        let result = self.run_restore(snapshot_id, allow_metered).await;
        self.note_error(result)
    }

    async fn run_restore(
        &self,
        snapshot_id: Uuid,
        allow_metered: bool,
    ) -> BackupResult<RestoreReport> {
        self.gate.check(allow_metered)?;
        let contents = self.catalog().fetch_full(snapshot_id).await?;
        info!(%snapshot_id, records = contents.records.len(), "restoring snapshot");

        let report = {
            let mut store = self.local.lock();
            restore_into(&mut *store, &contents)?
        };

        let mut stats = self.stats.write();
        stats.restores_completed += 1;
        stats.last_error = None;
        Ok(report)
    }

    /// Deletes snapshots, reporting which could not be fully removed.
    pub async fn delete_backups(
        &self,
        snapshot_ids: &[Uuid],
        allow_metered: bool,
    ) -> BackupResult<PruneReport> {
        let _flight = self.begin(OperationKind::Prune)?;
        if let Err(e) = self.gate.check(allow_metered) {
            return self.note_error(Err(e));
        }

        let pruner = Pruner::new(
            Arc::clone(&self.remote),
            self.writer(allow_metered),
            self.config.retry.clone(),
        );
        let report = pruner.delete(snapshot_ids).await;
        self.stats.write().snapshots_pruned += report.succeeded.len() as u64;
        Ok(report)
    }
}

fn same_cause(a: &FailureReason, b: &FailureReason) -> bool {
    match (a, b) {
        (FailureReason::Remote(x), FailureReason::Remote(y)) => {
            mem::discriminant(x) == mem::discriminant(y)
        }
        _ => mem::discriminant(a) == mem::discriminant(b),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
