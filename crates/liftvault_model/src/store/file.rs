//! JSON file-backed local store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use super::{LocalStore, Staged, Tables};
use crate::entity::Entity;
use crate::error::StoreResult;

/// A [`LocalStore`] persisted as a single JSON document.
///
/// `save` writes to a sibling temporary file and renames it over the
/// original, so the file on disk always holds either the previous or the new
/// committed state.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    staged: Staged,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let committed = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice::<Tables>(&bytes)?
        } else {
            Tables::default()
        };
        debug!(path = %path.display(), "opened local store");
        Ok(Self {
            path,
            staged: Staged::from_committed(committed),
        })
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LocalStore for JsonFileStore {
    fn fetch_all<E: Entity>(&self) -> StoreResult<Vec<E>> {
        Ok(self.staged.fetch_all())
    }

    fn insert<E: Entity>(&mut self, entity: E) -> StoreResult<()> {
        self.staged.insert(entity);
        Ok(())
    }

    fn delete<E: Entity>(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(self.staged.delete::<E>(id))
    }

    fn save(&mut self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = serde_json::to_vec_pretty(&self.staged.working)?;
        let temp = self.temp_path();
        let mut file = fs::File::create(&temp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp, &self.path)?;

        self.staged.commit();
        debug!(path = %self.path.display(), bytes = bytes.len(), "saved local store");
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Category, WorkoutType};
    use tempfile::TempDir;

    #[test]
    fn missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("local.json")).unwrap();
        assert!(store.fetch_all::<Category>().unwrap().is_empty());
    }

    #[test]
    fn saved_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("local.json");
        let category = Category::new(Uuid::new_v4(), "Back", "#00ff00", WorkoutType::Strength);

        let mut store = JsonFileStore::open(&path).unwrap();
        store.insert(category.clone()).unwrap();
        store.save().unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.fetch_all::<Category>().unwrap(), vec![category]);
        assert!(!reopened.temp_path().exists());
    }

    #[test]
    fn unsaved_changes_are_not_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store
            .insert(Category::new(Uuid::new_v4(), "Core", "#0000ff", WorkoutType::Yoga))
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert!(reopened.fetch_all::<Category>().unwrap().is_empty());
    }
}
