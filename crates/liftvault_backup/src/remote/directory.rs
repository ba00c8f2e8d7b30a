//! Remote store backed by a directory tree.
//!
//! Layout: `<root>/<snapshot id>/<record id>.json`. A snapshot's metadata
//! record shares the snapshot id, so listing snapshots reads one file per
//! directory.
//!
//! Files that no longer parse are returned as unreadable placeholders so
//! callers can report them. Records holding NaN or infinite floats are
//! rejected on write, since JSON cannot carry them.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use liftvault_codec::{Record, RecordKey, RecordKind};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

use super::{BatchOutcome, RecordTag, RemoteError, RemoteResult, RemoteStore};

/// A remote store that keeps one JSON file per record.
///
/// Stands in for a cloud record store on a mounted or synced folder.
#[derive(Debug, Clone)]
pub struct DirectoryRemoteStore {
    root: PathBuf,
}

impl DirectoryRemoteStore {
    /// Opens a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot_dir(&self, snapshot_id: Uuid) -> PathBuf {
        self.root.join(snapshot_id.to_string())
    }

    fn record_path(&self, key: &RecordKey) -> PathBuf {
        self.snapshot_dir(key.snapshot_id)
            .join(format!("{}.json", key.record_id))
    }

    async fn write_one(&self, record: &Record) -> RemoteResult<()> {
        if let Some(field) = record.non_finite_field() {
            return Err(RemoteError::Rejected(format!(
                "field `{field}` is not a finite number"
            )));
        }
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| RemoteError::Rejected(e.to_string()))?;
        let path = self.record_path(&record.key());
        let tmp = path.with_extension("json.tmp");

        fs::create_dir_all(self.snapshot_dir(record.snapshot_id))
            .await
            .map_err(io_error)?;
        fs::write(&tmp, bytes).await.map_err(io_error)?;
        fs::rename(&tmp, &path).await.map_err(io_error)
    }

    async fn delete_one(&self, key: &RecordKey) -> RemoteResult<()> {
        match fs::remove_file(self.record_path(key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_error(e)),
        }

        // Drop the snapshot directory once it is empty.
        let dir = self.snapshot_dir(key.snapshot_id);
        if let Ok(mut entries) = fs::read_dir(&dir).await {
            if matches!(entries.next_entry().await, Ok(None)) {
                let _ = fs::remove_dir(&dir).await;
            }
        }
        Ok(())
    }

    /// Reads one record file. A file that exists but does not parse comes
    /// back as an unreadable placeholder under the key its path encodes.
    async fn read_record(key: RecordKey, path: &Path) -> RemoteResult<Option<Record>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(e)),
        };
        match serde_json::from_slice::<Record>(&bytes) {
            Ok(record) if record.key() == key => Ok(Some(record)),
            Ok(record) => {
                warn!(path = %path.display(), found = %record.key(), "record file key mismatch");
                Ok(Some(Record::unreadable(
                    key,
                    format!("file holds record {}", record.key()),
                )))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable record file");
                Ok(Some(Record::unreadable(key, e.to_string())))
            }
        }
    }

    async fn snapshot_ids(&self) -> RemoteResult<Vec<Uuid>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| Uuid::parse_str(name).ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn snapshot_records(&self, snapshot_id: Uuid) -> RemoteResult<Vec<Record>> {
        let mut entries = match fs::read_dir(self.snapshot_dir(snapshot_id)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(e)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(record_id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| Uuid::parse_str(stem).ok())
            else {
                continue;
            };
            let key = RecordKey::new(snapshot_id, record_id);
            if let Some(record) = Self::read_record(key, &path).await? {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}

fn io_error(e: io::Error) -> RemoteError {
    RemoteError::Unavailable(e.to_string())
}

#[async_trait]
impl RemoteStore for DirectoryRemoteStore {
    async fn write_batch(&self, records: &[Record]) -> RemoteResult<BatchOutcome> {
        let mut outcome = BatchOutcome::success();
        for record in records {
            if let Err(e) = self.write_one(record).await {
                outcome.failures.push((record.key(), e));
            }
        }
        Ok(outcome)
    }

    async fn query(&self, tag: &RecordTag) -> RemoteResult<Vec<Record>> {
        match tag {
            RecordTag::Snapshot(id) => self.snapshot_records(*id).await,
            RecordTag::Kind(RecordKind::Metadata) => {
                let mut found = Vec::new();
                for id in self.snapshot_ids().await? {
                    let key = RecordKey::new(id, id);
                    let path = self.record_path(&key);
                    if let Some(record) = Self::read_record(key, &path).await? {
                        if tag.matches(&record) || record.unreadable_error().is_some() {
                            found.push(record);
                        }
                    }
                }
                Ok(found)
            }
            RecordTag::Kind(_) => {
                let mut found = Vec::new();
                for id in self.snapshot_ids().await? {
                    found.extend(
                        self.snapshot_records(id)
                            .await?
                            .into_iter()
                            .filter(|r| tag.matches(r)),
                    );
                }
                Ok(found)
            }
        }
    }

    async fn delete_batch(&self, keys: &[RecordKey]) -> RemoteResult<BatchOutcome> {
        let mut outcome = BatchOutcome::success();
        for key in keys {
            if let Err(e) = self.delete_one(key).await {
                outcome.failures.push((*key, e));
            }
        }
        Ok(outcome)
    }
}
