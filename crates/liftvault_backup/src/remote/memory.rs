//! In-memory remote store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use liftvault_codec::{Record, RecordKey};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{BatchOutcome, RecordTag, RemoteError, RemoteResult, RemoteStore};

/// A remote store held in memory.
///
/// Used by tests and as the base of fault-injecting wrappers.
#[derive(Debug)]
pub struct MemoryRemoteStore {
    records: RwLock<BTreeMap<RecordKey, Record>>,
    max_batch_size: Option<usize>,
    available: AtomicBool,
    writes: AtomicUsize,
    queries: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryRemoteStore {
    /// Creates an empty store with no batch limit.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            max_batch_size: None,
            available: AtomicBool::new(true),
            writes: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    /// Rejects batches larger than `limit`.
    pub fn with_max_batch_size(mut self, limit: usize) -> Self {
        self.max_batch_size = Some(limit);
        self
    }

    /// Makes every call fail with [`RemoteError::Unavailable`] while false.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns true if the key is stored.
    pub fn contains(&self, key: &RecordKey) -> bool {
        self.records.read().contains_key(key)
    }

    /// Returns every record of one snapshot.
    pub fn records_for(&self, snapshot_id: Uuid) -> Vec<Record> {
        self.records
            .read()
            .values()
            .filter(|r| r.snapshot_id == snapshot_id)
            .cloned()
            .collect()
    }

    /// Inserts a record directly, bypassing call counting.
    pub fn put(&self, record: Record) {
        self.records.write().insert(record.key(), record);
    }

    /// Number of `write_batch` calls made.
    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `query` calls made.
    pub fn query_calls(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of `delete_batch` calls made.
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Number of calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.write_calls() + self.query_calls() + self.delete_calls()
    }

    fn ensure_available(&self) -> RemoteResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Unavailable("account not available".into()))
        }
    }

    fn ensure_batch_size(&self, len: usize) -> RemoteResult<()> {
        match self.max_batch_size {
            Some(limit) if len > limit => Err(RemoteError::BatchTooLarge { len, limit }),
            _ => Ok(()),
        }
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn write_batch(&self, records: &[Record]) -> RemoteResult<BatchOutcome> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        self.ensure_batch_size(records.len())?;

        let mut stored = self.records.write();
        for record in records {
            stored.insert(record.key(), record.clone());
        }
        Ok(BatchOutcome::success())
    }

    async fn query(&self, tag: &RecordTag) -> RemoteResult<Vec<Record>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        Ok(self
            .records
            .read()
            .values()
            .filter(|r| tag.matches(r))
            .cloned()
            .collect())
    }

    async fn delete_batch(&self, keys: &[RecordKey]) -> RemoteResult<BatchOutcome> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        self.ensure_batch_size(keys.len())?;

        let mut stored = self.records.write();
        for key in keys {
            stored.remove(key);
        }
        Ok(BatchOutcome::success())
    }
}
