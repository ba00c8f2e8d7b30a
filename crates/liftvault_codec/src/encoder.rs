//! Entity graph to record encoding.

use std::collections::BTreeMap;

use liftvault_model::{Category, EntityGraph, Exercise, StrengthTemplate, Subcategory, Workout};
use uuid::Uuid;

use crate::record::{
    Record, RecordKind, SnapshotHeader, ROLE_CATEGORIES, ROLE_EXERCISES, ROLE_SUBCATEGORIES,
};
use crate::schema;

/// Encodes an entity graph into flat records.
///
/// Pure and total: every entity yields exactly one record. Records are
/// emitted link targets first (categories, subcategories, exercises, then
/// workouts and templates). The metadata record is not included; see
/// [`SnapshotMetadata::to_record`](crate::SnapshotMetadata::to_record).
pub fn encode(graph: &EntityGraph, header: &SnapshotHeader) -> Vec<Record> {
    let mut owned_subcategories: BTreeMap<Uuid, Vec<Uuid>> = BTreeMap::new();
    for sub in &graph.subcategories {
        if let Some(parent) = sub.category_id {
            owned_subcategories.entry(parent).or_default().push(sub.id);
        }
    }

    let mut records = Vec::with_capacity(graph.counts().total() as usize);
    records.extend(graph.categories.iter().map(|c| {
        let owned = owned_subcategories.remove(&c.id).unwrap_or_default();
        encode_category(c, owned, header)
    }));
    records.extend(graph.subcategories.iter().map(|s| encode_subcategory(s, header)));
    records.extend(graph.exercises.iter().map(|e| encode_exercise(e, header)));
    records.extend(graph.workouts.iter().map(|w| encode_workout(w, header)));
    records.extend(graph.templates.iter().map(|t| encode_template(t, header)));
    records
}

/// Encodes a category and the ids of the subcategories it owns.
pub fn encode_category(category: &Category, owned: Vec<Uuid>, header: &SnapshotHeader) -> Record {
    Record::new(category.id, RecordKind::Category, header)
        .with_field(schema::NAME, category.name.as_str())
        .with_field(schema::COLOR, category.color.as_str())
        .with_field(schema::WORKOUT_TYPE, category.workout_type.as_tag())
        .with_refs(ROLE_SUBCATEGORIES, owned)
}

/// Encodes a subcategory; the parent goes under `categoryIds`.
pub fn encode_subcategory(subcategory: &Subcategory, header: &SnapshotHeader) -> Record {
    Record::new(subcategory.id, RecordKind::Subcategory, header)
        .with_field(schema::NAME, subcategory.name.as_str())
        .with_refs(
            ROLE_CATEGORIES,
            subcategory.category_id.into_iter().collect(),
        )
}

/// Encodes an exercise.
pub fn encode_exercise(exercise: &Exercise, header: &SnapshotHeader) -> Record {
    Record::new(exercise.id, RecordKind::Exercise, header)
        .with_field(schema::NAME, exercise.name.as_str())
        .with_field(schema::SETS, exercise.sets)
        .with_field(schema::REPS, exercise.reps)
        .with_field(schema::WEIGHT, exercise.weight_kg)
        .with_field(schema::ORDER_INDEX, exercise.order_index)
        .with_refs(
            ROLE_SUBCATEGORIES,
            exercise.subcategory_id.into_iter().collect(),
        )
}

/// Encodes a workout.
pub fn encode_workout(workout: &Workout, header: &SnapshotHeader) -> Record {
    Record::new(workout.id, RecordKind::Workout, header)
        .with_field(schema::TYPE, workout.workout_type.as_tag())
        .with_field(schema::START_TIME, workout.start_time)
        .with_field(schema::DURATION, workout.duration_secs)
        .with_field(schema::DISTANCE, workout.distance_km)
        .with_field(schema::RATING, workout.rating)
        .with_field(schema::NOTES, workout.notes.clone())
        .with_refs(ROLE_CATEGORIES, workout.category_ids.clone())
        .with_refs(ROLE_SUBCATEGORIES, workout.subcategory_ids.clone())
        .with_refs(ROLE_EXERCISES, workout.exercise_ids.clone())
}

/// Encodes a strength template.
pub fn encode_template(template: &StrengthTemplate, header: &SnapshotHeader) -> Record {
    Record::new(template.id, RecordKind::StrengthTemplate, header)
        .with_field(schema::NAME, template.name.as_str())
        .with_field(schema::CATEGORY, template.category.as_str())
        .with_field(schema::UPDATED_AT, template.updated_at)
        .with_refs(ROLE_EXERCISES, template.exercise_ids.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;
    use liftvault_model::WorkoutType;

    fn header() -> SnapshotHeader {
        SnapshotHeader::new(Uuid::new_v4(), 42)
    }

    #[test]
    fn one_record_per_entity() {
        let mut graph = EntityGraph::default();
        let cat = Category::new(Uuid::new_v4(), "Legs", "#aa0000", WorkoutType::Strength);
        let sub = Subcategory::new(Uuid::new_v4(), "Quads", Some(cat.id));
        graph.categories.push(cat);
        graph.subcategories.push(sub);
        graph
            .workouts
            .push(Workout::new(Uuid::new_v4(), WorkoutType::Strength, 0, 3600.0));

        let records = encode(&graph, &header());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, "category");
        assert_eq!(records[1].kind, "subcategory");
        assert_eq!(records[2].kind, "workout");
    }

    #[test]
    fn category_lists_owned_subcategories() {
        let cat = Category::new(Uuid::new_v4(), "Legs", "#aa0000", WorkoutType::Strength);
        let quads = Subcategory::new(Uuid::new_v4(), "Quads", Some(cat.id));
        let orphan = Subcategory::new(Uuid::new_v4(), "Loose", None);
        let graph = EntityGraph {
            categories: vec![cat.clone()],
            subcategories: vec![quads.clone(), orphan.clone()],
            ..EntityGraph::default()
        };

        let records = encode(&graph, &header());
        assert_eq!(records[0].refs_for(ROLE_SUBCATEGORIES), &[quads.id]);
        assert_eq!(records[1].refs_for(ROLE_CATEGORIES), &[cat.id]);
        assert!(records[2].refs.is_empty());
    }

    #[test]
    fn workout_fields_and_refs() {
        let h = header();
        let mut workout = Workout::new(Uuid::new_v4(), WorkoutType::Running, 1_000, 1800.0);
        workout.distance_km = Some(5.2);
        workout.category_ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        workout.exercise_ids = vec![Uuid::new_v4()];

        let record = encode_workout(&workout, &h);
        assert_eq!(record.id, workout.id);
        assert_eq!(record.snapshot_id, h.snapshot_id);
        assert_eq!(record.created_at, 42);
        assert_eq!(record.fields["type"], FieldValue::Text("running".into()));
        assert_eq!(record.fields["distance"], FieldValue::Float(5.2));
        assert_eq!(record.fields["rating"], FieldValue::Null);
        assert_eq!(record.refs_for(ROLE_CATEGORIES), workout.category_ids.as_slice());
        assert_eq!(record.refs_for(ROLE_EXERCISES), workout.exercise_ids.as_slice());
        assert!(record.refs_for(ROLE_SUBCATEGORIES).is_empty());
    }
}
