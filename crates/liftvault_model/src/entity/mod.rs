//! Entity types and the common [`Entity`] trait.

mod category;
mod template;
mod workout;

pub use category::{Category, Subcategory};
pub use template::StrengthTemplate;
pub use workout::{Exercise, Workout, WorkoutType};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Tables;

/// The kinds of entity held by the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A logged workout session.
    Workout,
    /// A user-defined category.
    Category,
    /// A subcategory belonging to a category.
    Subcategory,
    /// An exercise owned by a workout or template.
    Exercise,
    /// A reusable strength workout template.
    StrengthTemplate,
}

impl EntityKind {
    /// Every entity kind, in dependency order (link targets first).
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Category,
        EntityKind::Subcategory,
        EntityKind::Exercise,
        EntityKind::Workout,
        EntityKind::StrengthTemplate,
    ];

    /// Returns the stable name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Workout => "workout",
            EntityKind::Category => "category",
            EntityKind::Subcategory => "subcategory",
            EntityKind::Exercise => "exercise",
            EntityKind::StrengthTemplate => "strengthTemplate",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A storable entity with a stable primary id.
///
/// Each implementor maps onto exactly one table of [`Tables`], which lets a
/// [`LocalStore`](crate::LocalStore) offer typed `fetch_all::<T>()` without
/// knowing the concrete entity list.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// The kind tag for this entity type.
    const KIND: EntityKind;

    /// Returns the primary id.
    fn id(&self) -> Uuid;

    /// Returns the table holding entities of this type.
    fn table(tables: &Tables) -> &BTreeMap<Uuid, Self>;

    /// Returns the mutable table holding entities of this type.
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Uuid, Self>;
}

macro_rules! impl_entity {
    ($ty:ty, $kind:expr, $field:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> Uuid {
                self.id
            }

            fn table(tables: &Tables) -> &BTreeMap<Uuid, Self> {
                &tables.$field
            }

            fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Uuid, Self> {
                &mut tables.$field
            }
        }
    };
}

impl_entity!(Workout, EntityKind::Workout, workouts);
impl_entity!(Category, EntityKind::Category, categories);
impl_entity!(Subcategory, EntityKind::Subcategory, subcategories);
impl_entity!(Exercise, EntityKind::Exercise, exercises);
impl_entity!(StrengthTemplate, EntityKind::StrengthTemplate, templates);
