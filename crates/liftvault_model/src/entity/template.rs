//! Strength workout templates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reusable strength workout plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthTemplate {
    /// Primary id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Free-form category tag (for example `"push"` or `"legs"`).
    pub category: String,
    /// Last modification time in milliseconds since the Unix epoch.
    pub updated_at: i64,
    /// Template exercises, in display order.
    pub exercise_ids: Vec<Uuid>,
}

impl StrengthTemplate {
    /// Creates a template with no exercises.
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        category: impl Into<String>,
        updated_at: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            updated_at,
            exercise_ids: Vec::new(),
        }
    }

    /// Returns a copy with the exercise list emptied.
    pub fn scalars_only(&self) -> Self {
        Self {
            exercise_ids: Vec::new(),
            ..self.clone()
        }
    }
}
