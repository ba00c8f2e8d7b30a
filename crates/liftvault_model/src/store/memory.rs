//! In-memory local store.

use uuid::Uuid;

use super::{LocalStore, Staged, Tables};
use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};

/// An in-memory [`LocalStore`].
///
/// Suitable for tests and for previewing. Failure switches let tests drive
/// the engine's clear and commit error paths.
///
/// # Example
///
/// ```rust
/// use liftvault_model::{Category, LocalStore, MemoryStore, WorkoutType};
/// use uuid::Uuid;
///
/// let mut store = MemoryStore::new();
/// store
///     .insert(Category::new(Uuid::new_v4(), "Legs", "#ff0000", WorkoutType::Strength))
///     .unwrap();
/// store.save().unwrap();
/// assert_eq!(store.fetch_all::<Category>().unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    staged: Staged,
    fail_on_save: bool,
    fail_on_delete: bool,
    saves: u64,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose committed state is `tables`.
    #[must_use]
    pub fn with_tables(tables: Tables) -> Self {
        Self {
            staged: Staged::from_committed(tables),
            ..Self::default()
        }
    }

    /// Returns a copy of the committed tables.
    pub fn committed(&self) -> Tables {
        self.staged.committed.clone()
    }

    /// Returns true if there are unsaved changes.
    pub fn has_changes(&self) -> bool {
        self.staged.is_dirty()
    }

    /// Makes every subsequent `save` fail.
    pub fn set_fail_on_save(&mut self, fail: bool) {
        self.fail_on_save = fail;
    }

    /// Makes every subsequent `delete` fail.
    pub fn set_fail_on_delete(&mut self, fail: bool) {
        self.fail_on_delete = fail;
    }

    /// Returns the number of successful saves.
    pub fn save_count(&self) -> u64 {
        self.saves
    }
}

impl LocalStore for MemoryStore {
    fn fetch_all<E: Entity>(&self) -> StoreResult<Vec<E>> {
        Ok(self.staged.fetch_all())
    }

    fn insert<E: Entity>(&mut self, entity: E) -> StoreResult<()> {
        self.staged.insert(entity);
        Ok(())
    }

    fn delete<E: Entity>(&mut self, id: Uuid) -> StoreResult<bool> {
        if self.fail_on_delete {
            return Err(StoreError::write_rejected(E::KIND, "delete disabled"));
        }
        Ok(self.staged.delete::<E>(id))
    }

    fn save(&mut self) -> StoreResult<()> {
        if self.fail_on_save {
            return Err(StoreError::SaveFailed("save disabled".into()));
        }
        self.staged.commit();
        self.saves += 1;
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Subcategory, Workout, WorkoutType};

    #[test]
    fn insert_is_upsert_by_id() {
        let mut store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.insert(Subcategory::new(id, "Quads", None)).unwrap();
        store.insert(Subcategory::new(id, "Hamstrings", None)).unwrap();

        let all = store.fetch_all::<Subcategory>().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Hamstrings");
    }

    #[test]
    fn rollback_discards_staged_changes() {
        let mut store = MemoryStore::new();
        let kept = Workout::new(Uuid::new_v4(), WorkoutType::Running, 0, 60.0);
        store.insert(kept.clone()).unwrap();
        store.save().unwrap();

        store.delete::<Workout>(kept.id).unwrap();
        store
            .insert(Workout::new(Uuid::new_v4(), WorkoutType::Yoga, 0, 60.0))
            .unwrap();
        assert!(store.has_changes());

        store.rollback();
        assert!(!store.has_changes());
        assert_eq!(store.fetch_all::<Workout>().unwrap(), vec![kept]);
    }

    #[test]
    fn failed_save_keeps_committed_state() {
        let mut store = MemoryStore::new();
        store.set_fail_on_save(true);
        store
            .insert(Workout::new(Uuid::new_v4(), WorkoutType::Hiit, 0, 60.0))
            .unwrap();

        assert!(matches!(store.save(), Err(StoreError::SaveFailed(_))));
        assert!(store.committed().workouts.is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn delete_reports_missing_entities() {
        let mut store = MemoryStore::new();
        assert!(!store.delete::<Workout>(Uuid::new_v4()).unwrap());
    }
}
