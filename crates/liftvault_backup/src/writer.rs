//! Chunked, retried, bounded-parallel record writes and deletes.
//!
//! Records are split into chunks no larger than the configured count and
//! byte budgets. Chunks are submitted concurrently up to
//! `max_parallel_chunks`; a single collector merges their results. Writes
//! are not atomic across chunks: callers learn exactly which records failed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use liftvault_codec::{Record, RecordKey};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{BackupConfig, RetryConfig};
use crate::gate::NetworkGate;
use crate::remote::{BatchOutcome, RemoteError, RemoteResult, RemoteStore};
use crate::retry::backoff;

/// Why a record was not written or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The remote store reported an error.
    Remote(RemoteError),
    /// The connection stopped being safe before the record's chunk started.
    NetworkBlocked,
    /// The record could not be encoded for size estimation.
    Encoding(String),
    /// The chunk's task ended without reporting a result.
    TaskAborted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Remote(e) => write!(f, "{e}"),
            FailureReason::NetworkBlocked => f.write_str("network blocked"),
            FailureReason::Encoding(msg) => write!(f, "encoding failed: {msg}"),
            FailureReason::TaskAborted => f.write_str("task aborted"),
        }
    }
}

/// A record that did not make it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// The record's remote key.
    pub key: RecordKey,
    /// Why it failed.
    pub reason: FailureReason,
}

/// Outcome of a batched write or delete.
#[derive(Debug, Clone, Default)]
pub struct WriteResult {
    /// Keys that were written (or deleted).
    pub written: Vec<RecordKey>,
    /// Keys that were not, with reasons.
    pub failed: Vec<RecordFailure>,
    /// Number of chunks planned.
    pub chunks: usize,
    /// Number of chunks with at least one failed record.
    pub failed_chunks: usize,
}

impl WriteResult {
    /// Returns true if every record succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the record ids that failed, in key order.
    pub fn failed_ids(&self) -> Vec<Uuid> {
        self.failed.iter().map(|f| f.key.record_id).collect()
    }

    fn fail_all(&mut self, keys: impl IntoIterator<Item = RecordKey>, reason: &FailureReason) {
        let before = self.failed.len();
        self.failed.extend(keys.into_iter().map(|key| RecordFailure {
            key,
            reason: reason.clone(),
        }));
        if self.failed.len() > before {
            self.failed_chunks += 1;
        }
    }

    fn merge(&mut self, chunk: ChunkResult) {
        if !chunk.failed.is_empty() {
            self.failed_chunks += 1;
        }
        self.written.extend(chunk.written);
        self.failed.extend(chunk.failed);
    }

    fn sort(&mut self) {
        self.written.sort();
        self.failed.sort_by_key(|f| f.key);
    }
}

/// One remote request worth of work.
#[derive(Debug, Clone)]
enum Chunk {
    Write(Vec<Record>),
    Delete(Vec<RecordKey>),
}

impl Chunk {
    fn keys(&self) -> Vec<RecordKey> {
        match self {
            Chunk::Write(records) => records.iter().map(Record::key).collect(),
            Chunk::Delete(keys) => keys.clone(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Chunk::Write(records) => records.len(),
            Chunk::Delete(keys) => keys.len(),
        }
    }

    fn retain(&mut self, keep: &BTreeSet<RecordKey>) {
        match self {
            Chunk::Write(records) => records.retain(|r| keep.contains(&r.key())),
            Chunk::Delete(keys) => keys.retain(|k| keep.contains(k)),
        }
    }

    async fn submit<R: RemoteStore + ?Sized>(&self, remote: &R) -> RemoteResult<BatchOutcome> {
        match self {
            Chunk::Write(records) => remote.write_batch(records).await,
            Chunk::Delete(keys) => remote.delete_batch(keys).await,
        }
    }
}

#[derive(Debug, Default)]
struct ChunkResult {
    written: Vec<RecordKey>,
    failed: Vec<RecordFailure>,
}

/// Submits one chunk, retrying transient failures.
///
/// A failed request is retried whole. Inside an accepted request only the
/// records that failed transiently are resubmitted.
async fn run_chunk<R: RemoteStore + ?Sized>(
    remote: &R,
    retry: &RetryConfig,
    mut chunk: Chunk,
) -> ChunkResult {
    let mut result = ChunkResult::default();
    let mut attempt: u32 = 0;

    loop {
        let has_attempts_left = attempt + 1 < retry.max_attempts;
        match chunk.submit(remote).await {
            Err(e) if e.is_retryable() && has_attempts_left => {
                attempt += 1;
                debug!(attempt, records = chunk.len(), error = %e, "retrying chunk");
                sleep(backoff(retry, attempt, Some(&e))).await;
            }
            Err(e) => {
                warn!(records = chunk.len(), error = %e, "chunk failed");
                let reason = FailureReason::Remote(e);
                result
                    .failed
                    .extend(chunk.keys().into_iter().map(|key| RecordFailure {
                        key,
                        reason: reason.clone(),
                    }));
                return result;
            }
            Ok(outcome) => {
                let failures: BTreeMap<RecordKey, RemoteError> =
                    outcome.failures.into_iter().collect();
                let mut resubmit = BTreeSet::new();
                let mut hint: Option<RemoteError> = None;

                for key in chunk.keys() {
                    match failures.get(&key) {
                        None => result.written.push(key),
                        Some(e) if e.is_retryable() && has_attempts_left => {
                            resubmit.insert(key);
                            if e.retry_after() > hint.as_ref().and_then(RemoteError::retry_after) {
                                hint = Some(e.clone());
                            }
                        }
                        Some(e) => result.failed.push(RecordFailure {
                            key,
                            reason: FailureReason::Remote(e.clone()),
                        }),
                    }
                }

                if resubmit.is_empty() {
                    return result;
                }
                attempt += 1;
                debug!(attempt, records = resubmit.len(), "resubmitting failed records");
                chunk.retain(&resubmit);
                sleep(backoff(retry, attempt, hint.as_ref())).await;
            }
        }
    }
}

async fn sleep(wait: std::time::Duration) {
    if !wait.is_zero() {
        tokio::time::sleep(wait).await;
    }
}

/// Splits records into chunks bounded by count and estimated bytes.
///
/// A record larger than the byte budget travels alone. Records whose size
/// cannot be estimated are returned as failures.
fn chunk_records(
    records: Vec<Record>,
    max_size: usize,
    max_bytes: usize,
) -> (Vec<Vec<Record>>, Vec<RecordFailure>) {
    let mut chunks = Vec::new();
    let mut failures = Vec::new();
    let mut current = Vec::new();
    let mut current_bytes = 0usize;

    for record in records {
        let len = match record.encoded_len() {
            Ok(len) => len,
            Err(e) => {
                failures.push(RecordFailure {
                    key: record.key(),
                    reason: FailureReason::Encoding(e.to_string()),
                });
                continue;
            }
        };

        let over_count = current.len() >= max_size;
        let over_bytes = !current.is_empty() && current_bytes + len > max_bytes;
        if over_count || over_bytes {
            chunks.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
        current_bytes += len;
        current.push(record);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    (chunks, failures)
}

/// Writes and deletes records in bounded, concurrent chunks.
pub struct BatchWriter<R: RemoteStore + ?Sized> {
    remote: Arc<R>,
    max_batch_size: usize,
    max_batch_bytes: usize,
    max_parallel_chunks: usize,
    retry: RetryConfig,
    gate: Option<(NetworkGate, bool)>,
}

impl<R: RemoteStore + ?Sized + 'static> BatchWriter<R> {
    /// Creates a writer using the limits in `config`.
    pub fn new(remote: Arc<R>, config: &BackupConfig) -> Self {
        Self {
            remote,
            max_batch_size: config.max_batch_size.max(1),
            max_batch_bytes: config.max_batch_bytes.max(1),
            max_parallel_chunks: config.max_parallel_chunks.max(1),
            retry: config.retry.clone(),
            gate: None,
        }
    }

    /// Re-checks `gate` before every chunk.
    ///
    /// Once the gate refuses, no further chunk starts and the remaining
    /// records fail with [`FailureReason::NetworkBlocked`].
    pub fn with_gate(mut self, gate: NetworkGate, allow_metered: bool) -> Self {
        self.gate = Some((gate, allow_metered));
        self
    }

    /// Writes records, overwriting existing keys.
    pub async fn write(&self, records: Vec<Record>) -> WriteResult {
        let total = records.len();
        let (chunks, encoding_failures) =
            chunk_records(records, self.max_batch_size, self.max_batch_bytes);
        debug!(records = total, chunks = chunks.len(), "writing records");

        let mut result = WriteResult::default();
        if !encoding_failures.is_empty() {
            result.failed.extend(encoding_failures);
            result.failed_chunks += 1;
        }
        self.run(chunks.into_iter().map(Chunk::Write).collect(), result)
            .await
    }

    /// Deletes records by key. Missing keys count as deleted.
    pub async fn delete(&self, keys: Vec<RecordKey>) -> WriteResult {
        let chunks: Vec<Chunk> = keys
            .chunks(self.max_batch_size)
            .map(|c| Chunk::Delete(c.to_vec()))
            .collect();
        debug!(records = keys.len(), chunks = chunks.len(), "deleting records");
        self.run(chunks, WriteResult::default()).await
    }

    fn gate_permits(&self) -> bool {
        match &self.gate {
            Some((gate, allow_metered)) => gate.permits(*allow_metered),
            None => true,
        }
    }

    async fn run(&self, chunks: Vec<Chunk>, mut result: WriteResult) -> WriteResult {
        result.chunks += chunks.len();
        let semaphore = Arc::new(Semaphore::new(self.max_parallel_chunks));
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<usize, Vec<RecordKey>> = HashMap::new();
        let mut blocked = false;

        for (index, chunk) in chunks.into_iter().enumerate() {
            if blocked {
                result.fail_all(chunk.keys(), &FailureReason::NetworkBlocked);
                continue;
            }

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                result.fail_all(chunk.keys(), &FailureReason::TaskAborted);
                continue;
            };

            if !self.gate_permits() {
                warn!(chunk = index, "connection no longer permitted; stopping");
                blocked = true;
                result.fail_all(chunk.keys(), &FailureReason::NetworkBlocked);
                continue;
            }

            in_flight.insert(index, chunk.keys());
            let remote = Arc::clone(&self.remote);
            let retry = self.retry.clone();
            tasks.spawn(async move {
                let _permit = permit;
                (index, run_chunk(&*remote, &retry, chunk).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, chunk)) => {
                    in_flight.remove(&index);
                    result.merge(chunk);
                }
                Err(e) => warn!(error = %e, "chunk task did not complete"),
            }
        }

        for keys in in_flight.into_values() {
            result.fail_all(keys, &FailureReason::TaskAborted);
        }

        result.sort();
        if !result.is_complete() {
            warn!(
                failed = result.failed.len(),
                written = result.written.len(),
                "batched operation incomplete"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{ConnectionClass, StaticClassifier};
    use crate::remote::MemoryRemoteStore;
    use liftvault_codec::{RecordKind, SnapshotHeader};

    fn records(n: usize) -> (SnapshotHeader, Vec<Record>) {
        let header = SnapshotHeader::new(Uuid::new_v4(), 1);
        let records = (0..n)
            .map(|i| {
                Record::new(Uuid::new_v4(), RecordKind::Exercise, &header)
                    .with_field("name", format!("exercise {i}"))
            })
            .collect();
        (header, records)
    }

    fn config(batch: usize, parallel: usize) -> BackupConfig {
        BackupConfig::new("test")
            .with_max_batch_size(batch)
            .with_max_parallel_chunks(parallel)
            .with_retry(RetryConfig::immediate(3))
    }

    #[test]
    fn chunks_respect_count() {
        let (_, records) = records(900);
        let (chunks, failures) = chunk_records(records, 400, usize::MAX);
        let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![400, 400, 100]);
        assert!(failures.is_empty());
    }

    #[test]
    fn chunks_respect_bytes() {
        let (_, records) = records(10);
        let one = records[0].encoded_len().unwrap();
        let (chunks, _) = chunk_records(records, 400, one * 3 + 2);
        assert!(chunks.len() >= 4);
        assert!(chunks.iter().all(|c| c.len() <= 3));
    }

    #[test]
    fn oversized_record_travels_alone() {
        let (_, records) = records(3);
        let (chunks, _) = chunk_records(records, 400, 1);
        assert_eq!(chunks.len(), 3);
    }

    #[tokio::test]
    async fn writes_everything_across_chunks() {
        let remote = Arc::new(MemoryRemoteStore::new().with_max_batch_size(400));
        let writer = BatchWriter::new(Arc::clone(&remote), &config(400, 4));
        let (header, records) = records(1000);

        let result = writer.write(records).await;
        assert!(result.is_complete());
        assert_eq!(result.written.len(), 1000);
        assert_eq!(result.chunks, 3);
        assert_eq!(remote.records_for(header.snapshot_id).len(), 1000);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_record_without_retry() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.set_available(false);
        let writer = BatchWriter::new(Arc::clone(&remote), &config(10, 1));
        let (_, records) = records(25);

        let result = writer.write(records).await;
        assert_eq!(result.failed.len(), 25);
        assert_eq!(result.failed_chunks, 3);
        assert_eq!(remote.write_calls(), 3);
        assert!(matches!(
            result.failed[0].reason,
            FailureReason::Remote(RemoteError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn closed_gate_starts_no_chunk() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let classifier = Arc::new(StaticClassifier::new(ConnectionClass::Metered));
        let writer = BatchWriter::new(Arc::clone(&remote), &config(10, 2))
            .with_gate(NetworkGate::new(classifier), false);
        let (_, records) = records(30);

        let result = writer.write(records).await;
        assert_eq!(result.failed.len(), 30);
        assert!(result
            .failed
            .iter()
            .all(|f| f.reason == FailureReason::NetworkBlocked));
        assert_eq!(remote.total_calls(), 0);
    }

    #[tokio::test]
    async fn delete_removes_keys_in_chunks() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let writer = BatchWriter::new(Arc::clone(&remote), &config(4, 2));
        let (header, records) = records(10);
        let keys: Vec<_> = records.iter().map(Record::key).collect();

        writer.write(records).await;
        let result = writer.delete(keys).await;
        assert!(result.is_complete());
        assert_eq!(result.chunks, 3);
        assert!(remote.records_for(header.snapshot_id).is_empty());
    }
}
