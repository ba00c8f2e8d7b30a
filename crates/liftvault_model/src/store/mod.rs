//! The local store abstraction.
//!
//! The backup engine treats the local relational store as a plain CRUD
//! surface. Writes are staged until [`LocalStore::save`]; a failed save or an
//! explicit [`LocalStore::rollback`] discards every staged change, which is
//! what makes a restore all-or-nothing.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Category, Entity, Exercise, StrengthTemplate, Subcategory, Workout};
use crate::error::StoreResult;

/// A local entity store.
pub trait LocalStore: Send {
    /// Returns every entity of type `E`, including staged changes.
    fn fetch_all<E: Entity>(&self) -> StoreResult<Vec<E>>;

    /// Inserts an entity, replacing any existing entity with the same id.
    fn insert<E: Entity>(&mut self, entity: E) -> StoreResult<()>;

    /// Deletes the entity of type `E` with the given id.
    ///
    /// Returns `false` if no such entity existed.
    fn delete<E: Entity>(&mut self, id: Uuid) -> StoreResult<bool>;

    /// Persists all staged changes.
    fn save(&mut self) -> StoreResult<()>;

    /// Discards all staged changes since the last successful save.
    fn rollback(&mut self);
}

/// One map per entity kind, keyed by primary id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    /// Workouts by id.
    pub workouts: BTreeMap<Uuid, Workout>,
    /// Categories by id.
    pub categories: BTreeMap<Uuid, Category>,
    /// Subcategories by id.
    pub subcategories: BTreeMap<Uuid, Subcategory>,
    /// Exercises by id.
    pub exercises: BTreeMap<Uuid, Exercise>,
    /// Strength templates by id.
    pub templates: BTreeMap<Uuid, StrengthTemplate>,
}

/// Committed tables plus a working copy that receives writes.
#[derive(Debug, Clone, Default)]
struct Staged {
    committed: Tables,
    working: Tables,
}

impl Staged {
    fn from_committed(committed: Tables) -> Self {
        Self {
            working: committed.clone(),
            committed,
        }
    }

    fn fetch_all<E: Entity>(&self) -> Vec<E> {
        E::table(&self.working).values().cloned().collect()
    }

    fn insert<E: Entity>(&mut self, entity: E) {
        E::table_mut(&mut self.working).insert(entity.id(), entity);
    }

    fn delete<E: Entity>(&mut self, id: Uuid) -> bool {
        E::table_mut(&mut self.working).remove(&id).is_some()
    }

    fn commit(&mut self) {
        self.committed = self.working.clone();
    }

    fn rollback(&mut self) {
        self.working = self.committed.clone();
    }

    fn is_dirty(&self) -> bool {
        self.working != self.committed
    }
}
