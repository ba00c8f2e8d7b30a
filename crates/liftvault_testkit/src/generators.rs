//! Property-based test generators using proptest.
//!
//! Generated graphs keep the invariants a real store maintains: every
//! reference resolves, each exercise has at most one owner, and an owner's
//! exercises carry `order_index` equal to their position.

use liftvault_model::{
    Category, EntityGraph, Exercise, StrengthTemplate, Subcategory, Workout, WorkoutType,
};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::Index;
use uuid::Uuid;

/// Strategy for generating entity ids.
pub fn id_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Strategy for generating display names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,23}").expect("Invalid regex")
}

/// Strategy for generating workout types.
pub fn workout_type_strategy() -> impl Strategy<Value = WorkoutType> {
    prop::sample::select(WorkoutType::ALL.to_vec())
}

/// Strategy for generating categories.
pub fn category_strategy() -> impl Strategy<Value = Category> {
    (
        id_strategy(),
        name_strategy(),
        prop::string::string_regex("#[0-9a-f]{6}").expect("Invalid regex"),
        workout_type_strategy(),
    )
        .prop_map(|(id, name, color, kind)| Category::new(id, name, color, kind))
}

/// Strategy for generating a workout with no relationships.
pub fn workout_strategy() -> impl Strategy<Value = Workout> {
    (
        id_strategy(),
        workout_type_strategy(),
        0i64..2_000_000_000,
        (0u32..20_000).prop_map(f64::from),
        prop::option::of((0u32..50_000).prop_map(|m| f64::from(m) / 10.0)),
        prop::option::of(1i64..=5),
        prop::option::of(name_strategy()),
    )
        .prop_map(
            |(id, kind, start, duration, distance, rating, notes)| {
                let mut workout = Workout::new(id, kind, start, duration);
                workout.distance_km = distance;
                workout.rating = rating;
                workout.notes = notes;
                workout
            },
        )
}

/// Strategy for generating an exercise with no owner or subcategory.
pub fn exercise_strategy() -> impl Strategy<Value = Exercise> {
    (
        id_strategy(),
        name_strategy(),
        prop::option::of(1i64..10),
        prop::option::of(1i64..30),
        prop::option::of((0u32..4_000).prop_map(|w| f64::from(w) / 4.0)),
    )
        .prop_map(|(id, name, sets, reps, weight)| {
            let mut exercise = Exercise::new(id, name, 0);
            exercise.sets = sets;
            exercise.reps = reps;
            exercise.weight_kg = weight;
            exercise
        })
}

/// Strategy for generating a template with no exercises.
pub fn template_strategy() -> impl Strategy<Value = StrengthTemplate> {
    (
        id_strategy(),
        name_strategy(),
        prop::string::string_regex("[a-z]{0,8}").expect("Invalid regex"),
        0i64..2_000_000_000_000,
    )
        .prop_map(|(id, name, category, updated)| {
            StrengthTemplate::new(id, name, category, updated)
        })
}

/// Raw material for one generated graph; linked by [`assemble`].
#[derive(Debug, Clone)]
struct GraphParts {
    categories: Vec<Category>,
    subcategories: Vec<(Uuid, String, Option<Index>)>,
    exercises: Vec<(Exercise, Option<Index>, Option<Index>)>,
    workouts: Vec<(Workout, Vec<Index>, Vec<Index>)>,
    templates: Vec<StrengthTemplate>,
}

fn pick(ids: &[Uuid], index: &Index) -> Option<Uuid> {
    (!ids.is_empty()).then(|| ids[index.index(ids.len())])
}

fn pick_distinct(ids: &[Uuid], indexes: &[Index]) -> Vec<Uuid> {
    let mut picked = Vec::new();
    for index in indexes {
        if let Some(id) = pick(ids, index) {
            if !picked.contains(&id) {
                picked.push(id);
            }
        }
    }
    picked
}

fn assemble(parts: GraphParts) -> EntityGraph {
    let category_ids: Vec<Uuid> = parts.categories.iter().map(|c| c.id).collect();
    let subcategories: Vec<Subcategory> = parts
        .subcategories
        .into_iter()
        .map(|(id, name, parent)| {
            Subcategory::new(id, name, parent.and_then(|p| pick(&category_ids, &p)))
        })
        .collect();
    let subcategory_ids: Vec<Uuid> = subcategories.iter().map(|s| s.id).collect();

    let mut workouts: Vec<Workout> = parts
        .workouts
        .into_iter()
        .map(|(mut workout, cats, subs)| {
            workout.category_ids = pick_distinct(&category_ids, &cats);
            workout.subcategory_ids = pick_distinct(&subcategory_ids, &subs);
            workout
        })
        .collect();
    let mut templates = parts.templates;

    let owner_count = workouts.len() + templates.len();
    let mut exercises = Vec::with_capacity(parts.exercises.len());
    for (mut exercise, subcategory, owner) in parts.exercises {
        exercise.subcategory_id = subcategory.and_then(|s| pick(&subcategory_ids, &s));
        if let Some(owner) = owner.filter(|_| owner_count > 0) {
            let slot = owner.index(owner_count);
            let list = if slot < workouts.len() {
                &mut workouts[slot].exercise_ids
            } else {
                &mut templates[slot - workouts.len()].exercise_ids
            };
            exercise.order_index = list.len() as i64;
            list.push(exercise.id);
        }
        exercises.push(exercise);
    }

    let mut graph = EntityGraph {
        workouts,
        categories: parts.categories,
        subcategories,
        exercises,
        templates,
    };
    graph.sort_by_id();
    graph
}

/// Strategy for generating consistent entity graphs, each list sorted by id.
pub fn graph_strategy() -> impl Strategy<Value = EntityGraph> {
    (
        vec(category_strategy(), 0..4),
        vec((id_strategy(), name_strategy(), any::<Option<Index>>()), 0..5),
        vec(
            (
                exercise_strategy(),
                any::<Option<Index>>(),
                any::<Option<Index>>(),
            ),
            0..12,
        ),
        vec(
            (
                workout_strategy(),
                vec(any::<Index>(), 0..3),
                vec(any::<Index>(), 0..3),
            ),
            0..6,
        ),
        vec(template_strategy(), 0..3),
    )
        .prop_map(|(categories, subcategories, exercises, workouts, templates)| {
            assemble(GraphParts {
                categories,
                subcategories,
                exercises,
                workouts,
                templates,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    proptest! {
        #[test]
        fn generated_graphs_are_consistent(graph in graph_strategy()) {
            let categories: BTreeSet<_> = graph.categories.iter().map(|c| c.id).collect();
            let subcategories: BTreeSet<_> = graph.subcategories.iter().map(|s| s.id).collect();

            for sub in &graph.subcategories {
                if let Some(parent) = sub.category_id {
                    prop_assert!(categories.contains(&parent));
                }
            }
            for workout in &graph.workouts {
                prop_assert!(workout.category_ids.iter().all(|id| categories.contains(id)));
                prop_assert!(workout.subcategory_ids.iter().all(|id| subcategories.contains(id)));
            }

            let mut owned = BTreeSet::new();
            let lists = graph
                .workouts
                .iter()
                .map(|w| &w.exercise_ids)
                .chain(graph.templates.iter().map(|t| &t.exercise_ids));
            for list in lists {
                for id in list {
                    prop_assert!(owned.insert(*id), "exercise owned twice");
                }
            }
        }
    }
}
