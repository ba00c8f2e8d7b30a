//! Categories and subcategories.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::WorkoutType;

/// A user-defined workout category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Primary id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Display color as a hex string (`#RRGGBB`).
    pub color: String,
    /// The workout type this category is offered for.
    pub workout_type: WorkoutType,
}

impl Category {
    /// Creates a category.
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        color: impl Into<String>,
        workout_type: WorkoutType,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            workout_type,
        }
    }
}

/// A subcategory owned by a [`Category`].
///
/// `category_id` is a lookup edge only; deleting a subcategory never touches
/// its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    /// Primary id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Owning category.
    pub category_id: Option<Uuid>,
}

impl Subcategory {
    /// Creates a subcategory.
    pub fn new(id: Uuid, name: impl Into<String>, category_id: Option<Uuid>) -> Self {
        Self {
            id,
            name: name.into(),
            category_id,
        }
    }

    /// Returns a copy with the parent link cleared.
    pub fn scalars_only(&self) -> Self {
        Self {
            category_id: None,
            ..self.clone()
        }
    }
}
