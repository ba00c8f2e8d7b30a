//! Workouts and exercises.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The activity type of a workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    /// Weight training.
    Strength,
    /// General cardio.
    Cardio,
    /// Running.
    Running,
    /// Cycling.
    Cycling,
    /// Swimming.
    Swimming,
    /// Walking or hiking.
    Walking,
    /// Yoga or mobility work.
    Yoga,
    /// High-intensity interval training.
    Hiit,
    /// Anything else.
    Other,
}

impl WorkoutType {
    /// Every workout type.
    pub const ALL: [WorkoutType; 9] = [
        WorkoutType::Strength,
        WorkoutType::Cardio,
        WorkoutType::Running,
        WorkoutType::Cycling,
        WorkoutType::Swimming,
        WorkoutType::Walking,
        WorkoutType::Yoga,
        WorkoutType::Hiit,
        WorkoutType::Other,
    ];

    /// Returns the stable tag for this type.
    pub fn as_tag(&self) -> &'static str {
        match self {
            WorkoutType::Strength => "strength",
            WorkoutType::Cardio => "cardio",
            WorkoutType::Running => "running",
            WorkoutType::Cycling => "cycling",
            WorkoutType::Swimming => "swimming",
            WorkoutType::Walking => "walking",
            WorkoutType::Yoga => "yoga",
            WorkoutType::Hiit => "hiit",
            WorkoutType::Other => "other",
        }
    }

    /// Parses a tag produced by [`as_tag`](Self::as_tag).
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_tag() == tag)
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A logged workout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    /// Primary id.
    pub id: Uuid,
    /// Activity type.
    pub workout_type: WorkoutType,
    /// Start time in milliseconds since the Unix epoch.
    pub start_time: i64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Distance covered, in kilometres.
    pub distance_km: Option<f64>,
    /// User rating (1-5).
    pub rating: Option<i64>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Owned exercises, in display order.
    pub exercise_ids: Vec<Uuid>,
    /// Linked categories.
    pub category_ids: Vec<Uuid>,
    /// Linked subcategories.
    pub subcategory_ids: Vec<Uuid>,
}

impl Workout {
    /// Creates a workout with no relationships.
    pub fn new(id: Uuid, workout_type: WorkoutType, start_time: i64, duration_secs: f64) -> Self {
        Self {
            id,
            workout_type,
            start_time,
            duration_secs,
            distance_km: None,
            rating: None,
            notes: None,
            exercise_ids: Vec::new(),
            category_ids: Vec::new(),
            subcategory_ids: Vec::new(),
        }
    }

    /// Returns a copy with every relationship list emptied.
    pub fn scalars_only(&self) -> Self {
        Self {
            exercise_ids: Vec::new(),
            category_ids: Vec::new(),
            subcategory_ids: Vec::new(),
            ..self.clone()
        }
    }
}

/// A single exercise entry.
///
/// Exercises belong to exactly one workout or strength template; the owner
/// lists them by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Primary id.
    pub id: Uuid,
    /// Exercise name.
    pub name: String,
    /// Number of sets.
    pub sets: Option<i64>,
    /// Repetitions per set.
    pub reps: Option<i64>,
    /// Weight per repetition, in kilograms.
    pub weight_kg: Option<f64>,
    /// Position within the owner's exercise list.
    pub order_index: i64,
    /// Optional subcategory this exercise trains.
    pub subcategory_id: Option<Uuid>,
}

impl Exercise {
    /// Creates an exercise with no subcategory link.
    pub fn new(id: Uuid, name: impl Into<String>, order_index: i64) -> Self {
        Self {
            id,
            name: name.into(),
            sets: None,
            reps: None,
            weight_kg: None,
            order_index,
            subcategory_id: None,
        }
    }

    /// Returns a copy with the subcategory link cleared.
    pub fn scalars_only(&self) -> Self {
        Self {
            subcategory_id: None,
            ..self.clone()
        }
    }
}
