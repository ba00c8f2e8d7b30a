//! Wire field names.

/// Current snapshot format version, written into every metadata record.
pub const FORMAT_VERSION: i64 = 1;

pub(crate) const NAME: &str = "name";
pub(crate) const COLOR: &str = "color";
pub(crate) const WORKOUT_TYPE: &str = "workoutType";

pub(crate) const TYPE: &str = "type";
pub(crate) const START_TIME: &str = "startTime";
pub(crate) const DURATION: &str = "duration";
pub(crate) const DISTANCE: &str = "distance";
pub(crate) const RATING: &str = "rating";
pub(crate) const NOTES: &str = "notes";

pub(crate) const SETS: &str = "sets";
pub(crate) const REPS: &str = "reps";
pub(crate) const WEIGHT: &str = "weight";
pub(crate) const ORDER_INDEX: &str = "orderIndex";

pub(crate) const CATEGORY: &str = "category";
pub(crate) const UPDATED_AT: &str = "updatedAt";

pub(crate) const DEVICE_NAME: &str = "deviceName";
pub(crate) const TIMESTAMP: &str = "timestamp";
pub(crate) const FORMAT: &str = "formatVersion";
pub(crate) const APP_VERSION: &str = "appVersion";
pub(crate) const WORKOUT_COUNT: &str = "workoutCount";
pub(crate) const CATEGORY_COUNT: &str = "categoryCount";
pub(crate) const SUBCATEGORY_COUNT: &str = "subcategoryCount";
pub(crate) const EXERCISE_COUNT: &str = "exerciseCount";
pub(crate) const TEMPLATE_COUNT: &str = "templateCount";

pub(crate) const REASON: &str = "reason";
