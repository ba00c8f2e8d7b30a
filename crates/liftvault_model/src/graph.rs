//! Whole-graph snapshot of the local store.

use serde::{Deserialize, Serialize};

use crate::entity::{Category, EntityKind, Exercise, StrengthTemplate, Subcategory, Workout};
use crate::error::StoreResult;
use crate::store::LocalStore;

/// Number of entities per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    /// Number of workouts.
    pub workouts: u64,
    /// Number of categories.
    pub categories: u64,
    /// Number of subcategories.
    pub subcategories: u64,
    /// Number of exercises.
    pub exercises: u64,
    /// Number of strength templates.
    pub templates: u64,
}

impl EntityCounts {
    /// Returns the count for one kind.
    pub fn get(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Workout => self.workouts,
            EntityKind::Category => self.categories,
            EntityKind::Subcategory => self.subcategories,
            EntityKind::Exercise => self.exercises,
            EntityKind::StrengthTemplate => self.templates,
        }
    }

    /// Sets the count for one kind.
    pub fn set(&mut self, kind: EntityKind, count: u64) {
        match kind {
            EntityKind::Workout => self.workouts = count,
            EntityKind::Category => self.categories = count,
            EntityKind::Subcategory => self.subcategories = count,
            EntityKind::Exercise => self.exercises = count,
            EntityKind::StrengthTemplate => self.templates = count,
        }
    }

    /// Returns the total across all kinds.
    pub fn total(&self) -> u64 {
        EntityKind::ALL.iter().map(|k| self.get(*k)).sum()
    }
}

/// A full in-memory copy of the entity graph.
///
/// Every list is ordered by primary id when read from a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityGraph {
    /// All workouts.
    pub workouts: Vec<Workout>,
    /// All categories.
    pub categories: Vec<Category>,
    /// All subcategories.
    pub subcategories: Vec<Subcategory>,
    /// All exercises.
    pub exercises: Vec<Exercise>,
    /// All strength templates.
    pub templates: Vec<StrengthTemplate>,
}

impl EntityGraph {
    /// Reads every table from a store.
    pub fn from_store<L: LocalStore + ?Sized>(store: &L) -> StoreResult<Self> {
        Ok(Self {
            workouts: store.fetch_all()?,
            categories: store.fetch_all()?,
            subcategories: store.fetch_all()?,
            exercises: store.fetch_all()?,
            templates: store.fetch_all()?,
        })
    }

    /// Inserts every entity into a store. Does not save.
    pub fn insert_into<L: LocalStore + ?Sized>(&self, store: &mut L) -> StoreResult<()> {
        for category in &self.categories {
            store.insert(category.clone())?;
        }
        for subcategory in &self.subcategories {
            store.insert(subcategory.clone())?;
        }
        for exercise in &self.exercises {
            store.insert(exercise.clone())?;
        }
        for workout in &self.workouts {
            store.insert(workout.clone())?;
        }
        for template in &self.templates {
            store.insert(template.clone())?;
        }
        Ok(())
    }

    /// Returns the number of entities per kind.
    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            workouts: self.workouts.len() as u64,
            categories: self.categories.len() as u64,
            subcategories: self.subcategories.len() as u64,
            exercises: self.exercises.len() as u64,
            templates: self.templates.len() as u64,
        }
    }

    /// Returns true if the graph holds no entities.
    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    /// Sorts every list by primary id.
    pub fn sort_by_id(&mut self) {
        self.workouts.sort_by_key(|e| e.id);
        self.categories.sort_by_key(|e| e.id);
        self.subcategories.sort_by_key(|e| e.id);
        self.exercises.sort_by_key(|e| e.id);
        self.templates.sort_by_key(|e| e.id);
    }
}
