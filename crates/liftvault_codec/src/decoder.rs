//! Record to partial graph decoding.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use liftvault_model::{
    Category, EntityKind, Exercise, StrengthTemplate, Subcategory, Workout, WorkoutType,
};
use uuid::Uuid;

use crate::error::{CodecError, CodecResult};
use crate::record::{Record, RecordKind};
use crate::schema;

/// A scalar-only entity together with its unresolved references.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// The entity with every relationship empty.
    pub entity: T,
    /// Foreign-key id lists by role, exactly as found on the record.
    pub refs: BTreeMap<String, Vec<Uuid>>,
}

/// A record that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    /// Id of the malformed record.
    pub record_id: Uuid,
    /// Kind name found on the record.
    pub kind: String,
    /// Why decoding failed.
    pub reason: CodecError,
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} record {}: {}", self.kind, self.record_id, self.reason)
    }
}

/// Records grouped by kind, keyed by id, with references unresolved.
#[derive(Debug, Clone, Default)]
pub struct PartialGraph {
    /// Decoded workouts.
    pub workouts: BTreeMap<Uuid, Decoded<Workout>>,
    /// Decoded categories.
    pub categories: BTreeMap<Uuid, Decoded<Category>>,
    /// Decoded subcategories.
    pub subcategories: BTreeMap<Uuid, Decoded<Subcategory>>,
    /// Decoded exercises.
    pub exercises: BTreeMap<Uuid, Decoded<Exercise>>,
    /// Decoded strength templates.
    pub templates: BTreeMap<Uuid, Decoded<StrengthTemplate>>,
    /// Entity kinds that appear in the record set, decodable or not.
    pub kinds_present: BTreeSet<EntityKind>,
    /// Number of records whose kind this build does not recognize.
    pub unknown_kinds: usize,
    /// Number of metadata records seen.
    pub metadata_records: usize,
    /// Records that were recognized but malformed.
    pub failures: Vec<DecodeFailure>,
}

impl PartialGraph {
    /// Returns the number of successfully decoded entities.
    pub fn entity_count(&self) -> usize {
        self.workouts.len()
            + self.categories.len()
            + self.subcategories.len()
            + self.exercises.len()
            + self.templates.len()
    }
}

/// Groups records by kind and decodes their scalar fields.
///
/// References are copied verbatim and not resolved. Unknown kinds are
/// counted and skipped; malformed records and unreadable placeholders are
/// collected in [`PartialGraph::failures`]. Metadata records are counted but otherwise
/// ignored. Never fails as a whole.
pub fn decode(records: &[Record]) -> PartialGraph {
    let mut graph = PartialGraph::default();

    for record in records {
        let Some(kind) = record.record_kind() else {
            graph.unknown_kinds += 1;
            continue;
        };
        if let Some(reason) = record.unreadable_error() {
            graph.failures.push(DecodeFailure {
                record_id: record.id,
                kind: record.kind.clone(),
                reason,
            });
            continue;
        }
        let Some(entity_kind) = kind.entity_kind() else {
            graph.metadata_records += 1;
            continue;
        };
        graph.kinds_present.insert(entity_kind);

        let result = match kind {
            RecordKind::Workout => {
                decode_workout(record).map(|w| insert(&mut graph.workouts, record, w))
            }
            RecordKind::Category => {
                decode_category(record).map(|c| insert(&mut graph.categories, record, c))
            }
            RecordKind::Subcategory => {
                decode_subcategory(record).map(|s| insert(&mut graph.subcategories, record, s))
            }
            RecordKind::Exercise => {
                decode_exercise(record).map(|e| insert(&mut graph.exercises, record, e))
            }
            RecordKind::StrengthTemplate => {
                decode_template(record).map(|t| insert(&mut graph.templates, record, t))
            }
            RecordKind::Metadata | RecordKind::Unreadable => Ok(()),
        };

        if let Err(reason) = result {
            graph.failures.push(DecodeFailure {
                record_id: record.id,
                kind: record.kind.clone(),
                reason,
            });
        }
    }

    graph
}

fn insert<T>(map: &mut BTreeMap<Uuid, Decoded<T>>, record: &Record, entity: T) {
    map.insert(
        record.id,
        Decoded {
            entity,
            refs: record.refs.clone(),
        },
    );
}

fn workout_type(field: &str, tag: &str) -> CodecResult<WorkoutType> {
    WorkoutType::from_tag(tag)
        .ok_or_else(|| CodecError::invalid(field, format!("unknown workout type `{tag}`")))
}

/// Decodes the scalar fields of a workout record.
pub fn decode_workout(record: &Record) -> CodecResult<Workout> {
    let r = record.reader();
    let mut workout = Workout::new(
        record.id,
        workout_type(schema::TYPE, &r.text(schema::TYPE)?)?,
        r.integer(schema::START_TIME)?,
        r.float(schema::DURATION)?,
    );
    workout.distance_km = r.opt_float(schema::DISTANCE)?;
    workout.rating = r.opt_integer(schema::RATING)?;
    workout.notes = r.opt_text(schema::NOTES)?;
    Ok(workout)
}

/// Decodes the scalar fields of a category record.
pub fn decode_category(record: &Record) -> CodecResult<Category> {
    let r = record.reader();
    Ok(Category::new(
        record.id,
        r.text(schema::NAME)?,
        r.text(schema::COLOR)?,
        workout_type(schema::WORKOUT_TYPE, &r.text(schema::WORKOUT_TYPE)?)?,
    ))
}

/// Decodes the scalar fields of a subcategory record.
pub fn decode_subcategory(record: &Record) -> CodecResult<Subcategory> {
    let r = record.reader();
    Ok(Subcategory::new(record.id, r.text(schema::NAME)?, None))
}

/// Decodes the scalar fields of an exercise record.
pub fn decode_exercise(record: &Record) -> CodecResult<Exercise> {
    let r = record.reader();
    let mut exercise = Exercise::new(
        record.id,
        r.text(schema::NAME)?,
        r.opt_integer(schema::ORDER_INDEX)?.unwrap_or(0),
    );
    exercise.sets = r.opt_integer(schema::SETS)?;
    exercise.reps = r.opt_integer(schema::REPS)?;
    exercise.weight_kg = r.opt_float(schema::WEIGHT)?;
    Ok(exercise)
}

/// Decodes the scalar fields of a strength template record.
pub fn decode_template(record: &Record) -> CodecResult<StrengthTemplate> {
    let r = record.reader();
    Ok(StrengthTemplate::new(
        record.id,
        r.text(schema::NAME)?,
        r.opt_text(schema::CATEGORY)?.unwrap_or_default(),
        r.opt_integer(schema::UPDATED_AT)?.unwrap_or(0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode, encode_workout};
    use crate::record::{SnapshotHeader, ROLE_CATEGORIES};
    use crate::value::FieldValue;
    use crate::SnapshotMetadata;
    use liftvault_model::{EntityCounts, EntityGraph};

    fn header() -> SnapshotHeader {
        SnapshotHeader::new(Uuid::new_v4(), 7)
    }

    #[test]
    fn scalars_survive_and_refs_are_kept_verbatim() {
        let h = header();
        let mut workout = Workout::new(Uuid::new_v4(), WorkoutType::Cycling, 123, 4000.0);
        workout.rating = Some(4);
        workout.notes = Some("windy".into());
        let dangling = Uuid::new_v4();
        workout.category_ids = vec![dangling];

        let graph = decode(&[encode_workout(&workout, &h)]);
        let decoded = &graph.workouts[&workout.id];
        assert_eq!(decoded.entity, workout.scalars_only());
        assert_eq!(decoded.refs[ROLE_CATEGORIES], vec![dangling]);
        assert!(graph.kinds_present.contains(&EntityKind::Workout));
    }

    #[test]
    fn unknown_kinds_are_counted_not_rejected() {
        let h = header();
        let mut alien = Record::new(Uuid::new_v4(), RecordKind::Workout, &h);
        alien.kind = "heartRateZone".into();

        let graph = decode(&[alien]);
        assert_eq!(graph.unknown_kinds, 1);
        assert_eq!(graph.entity_count(), 0);
        assert!(graph.failures.is_empty());
        assert!(graph.kinds_present.is_empty());
    }

    #[test]
    fn malformed_record_is_reported_and_others_survive() {
        let h = header();
        let good = Workout::new(Uuid::new_v4(), WorkoutType::Yoga, 0, 900.0);
        let mut bad = encode_workout(
            &Workout::new(Uuid::new_v4(), WorkoutType::Yoga, 0, 900.0),
            &h,
        );
        bad.fields
            .insert("duration".into(), FieldValue::Text("long".into()));

        let graph = decode(&[encode_workout(&good, &h), bad.clone()]);
        assert_eq!(graph.workouts.len(), 1);
        assert_eq!(graph.failures.len(), 1);
        assert_eq!(graph.failures[0].record_id, bad.id);
        assert!(matches!(
            graph.failures[0].reason,
            CodecError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn unknown_workout_type_is_a_decode_failure() {
        let h = header();
        let mut record = encode_workout(
            &Workout::new(Uuid::new_v4(), WorkoutType::Other, 0, 1.0),
            &h,
        );
        record
            .fields
            .insert("type".into(), FieldValue::Text("curling".into()));

        let graph = decode(&[record]);
        assert!(matches!(
            graph.failures[0].reason,
            CodecError::InvalidValue { .. }
        ));
    }

    #[test]
    fn unreadable_placeholder_is_a_decode_failure() {
        let h = header();
        let good = Workout::new(Uuid::new_v4(), WorkoutType::Yoga, 0, 900.0);
        let key = crate::RecordKey::new(h.snapshot_id, Uuid::new_v4());

        let graph = decode(&[
            encode_workout(&good, &h),
            Record::unreadable(key, "key must be a string"),
        ]);
        assert_eq!(graph.workouts.len(), 1);
        assert_eq!(graph.unknown_kinds, 0);
        assert_eq!(graph.metadata_records, 0);
        assert_eq!(graph.failures.len(), 1);
        assert_eq!(graph.failures[0].record_id, key.record_id);
        assert!(matches!(
            graph.failures[0].reason,
            CodecError::Unreadable { .. }
        ));
    }

    #[test]
    fn metadata_is_counted_separately() {
        let h = header();
        let meta = SnapshotMetadata::new(&h, "phone", EntityCounts::default(), "1.0.0");
        let mut records = encode(&EntityGraph::default(), &h);
        records.push(meta.to_record());

        let graph = decode(&records);
        assert_eq!(graph.metadata_records, 1);
        assert_eq!(graph.unknown_kinds, 0);
        assert_eq!(graph.entity_count(), 0);
    }
}
