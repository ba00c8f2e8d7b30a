//! Fault injection for the remote store and the connection classifier.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use liftvault_backup::{
    BatchOutcome, ConnectionClass, ConnectionClassifier, MemoryRemoteStore, RecordTag,
    RemoteError, RemoteResult, RemoteStore,
};
use liftvault_codec::{Record, RecordKey};
use parking_lot::Mutex;
use uuid::Uuid;

/// A [`MemoryRemoteStore`] wrapper that fails chosen writes.
///
/// Write calls are numbered from 1 in the order they arrive. Queries and
/// deletes pass straight through.
#[derive(Debug, Default)]
pub struct FlakyRemoteStore {
    inner: MemoryRemoteStore,
    fail_every_nth: Option<usize>,
    transient_failures: AtomicUsize,
    reject: BTreeSet<Uuid>,
    fail_once: Mutex<BTreeSet<Uuid>>,
    writes: AtomicUsize,
}

impl FlakyRemoteStore {
    /// Creates a store that never fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every `n`th write call permanently with [`RemoteError::Rejected`].
    pub fn fail_every_nth_write(mut self, n: usize) -> Self {
        self.fail_every_nth = Some(n.max(1));
        self
    }

    /// Fails the first `k` write calls with [`RemoteError::Timeout`].
    pub fn transient_failures(self, k: usize) -> Self {
        self.transient_failures.store(k, Ordering::SeqCst);
        self
    }

    /// Rejects the given record ids inside otherwise accepted batches.
    pub fn reject_records(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.reject.extend(ids);
        self
    }

    /// Fails the given record ids with a timeout the first time each is sent.
    pub fn fail_records_once(self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.fail_once.lock().extend(ids);
        self
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &MemoryRemoteStore {
        &self.inner
    }

    /// Number of `write_batch` calls received, including failed ones.
    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of calls of any kind received.
    pub fn total_calls(&self) -> usize {
        self.write_calls() + self.inner.query_calls() + self.inner.delete_calls()
    }

    fn take_transient(&self) -> bool {
        self.transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |k| k.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RemoteStore for FlakyRemoteStore {
    async fn write_batch(&self, records: &[Record]) -> RemoteResult<BatchOutcome> {
        let call = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.take_transient() {
            return Err(RemoteError::Timeout);
        }
        if self.fail_every_nth.is_some_and(|n| call % n == 0) {
            return Err(RemoteError::Rejected(format!("injected failure on write {call}")));
        }

        let mut outcome = BatchOutcome::success();
        let mut accepted = Vec::with_capacity(records.len());
        {
            let mut fail_once = self.fail_once.lock();
            for record in records {
                if self.reject.contains(&record.id) {
                    outcome
                        .failures
                        .push((record.key(), RemoteError::Rejected("injected".into())));
                } else if fail_once.remove(&record.id) {
                    outcome.failures.push((record.key(), RemoteError::Timeout));
                } else {
                    accepted.push(record.clone());
                }
            }
        }

        let inner = self.inner.write_batch(&accepted).await?;
        outcome.failures.extend(inner.failures);
        Ok(outcome)
    }

    async fn query(&self, tag: &RecordTag) -> RemoteResult<Vec<Record>> {
        self.inner.query(tag).await
    }

    async fn delete_batch(&self, keys: &[RecordKey]) -> RemoteResult<BatchOutcome> {
        self.inner.delete_batch(keys).await
    }
}

/// A classifier that reports one class for a fixed number of calls and
/// another class from then on.
///
/// Models a connection that drops or turns metered partway through an
/// operation.
#[derive(Debug)]
pub struct SwitchingClassifier {
    before: ConnectionClass,
    after: ConnectionClass,
    remaining: AtomicUsize,
}

impl SwitchingClassifier {
    /// Reports `before` for the first `calls` calls, then `after`.
    pub fn after_calls(calls: usize, before: ConnectionClass, after: ConnectionClass) -> Self {
        Self {
            before,
            after,
            remaining: AtomicUsize::new(calls),
        }
    }
}

impl ConnectionClassifier for SwitchingClassifier {
    fn classify(&self) -> ConnectionClass {
        let early = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |k| k.checked_sub(1))
            .is_ok();
        if early {
            self.before
        } else {
            self.after
        }
    }
}
