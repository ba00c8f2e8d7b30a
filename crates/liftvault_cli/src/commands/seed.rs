//! Seed command: sample data for trying out backups.

use std::time::{SystemTime, UNIX_EPOCH};

use liftvault_model::{
    Category, EntityGraph, Exercise, JsonFileStore, LocalStore, StrengthTemplate, Subcategory,
    Workout, WorkoutType,
};
use tracing::info;
use uuid::Uuid;

use super::{Context, OutputFormat};

const DAY_SECS: i64 = 86_400;

/// Builds `workouts` sample workouts ending today.
///
/// Strength workouts get three exercises each; every workout is tagged with
/// one of the sample categories.
pub fn sample_graph(workouts: usize, now_secs: i64) -> EntityGraph {
    let strength = Category::new(Uuid::new_v4(), "Strength", "#d94f30", WorkoutType::Strength);
    let cardio = Category::new(Uuid::new_v4(), "Cardio", "#2f8fd9", WorkoutType::Running);
    let mobility = Category::new(Uuid::new_v4(), "Mobility", "#6abf69", WorkoutType::Yoga);
    let upper = Subcategory::new(Uuid::new_v4(), "Upper Body", Some(strength.id));
    let lower = Subcategory::new(Uuid::new_v4(), "Lower Body", Some(strength.id));

    let mut graph = EntityGraph::default();
    let lifts = [
        ("Bench Press", upper.id, 60.0),
        ("Barbell Row", upper.id, 50.0),
        ("Back Squat", lower.id, 80.0),
    ];

    for i in 0..workouts {
        let start = now_secs - DAY_SECS * (workouts - i) as i64;
        let workout = match i % 3 {
            0 => {
                let mut w = Workout::new(Uuid::new_v4(), WorkoutType::Strength, start, 3_600.0);
                w.category_ids = vec![strength.id];
                w.subcategory_ids = vec![upper.id, lower.id];
                for (order, (name, sub, weight)) in lifts.iter().enumerate() {
                    let mut exercise = Exercise::new(Uuid::new_v4(), *name, order as i64);
                    exercise.sets = Some(5);
                    exercise.reps = Some(5);
                    exercise.weight_kg = Some(weight + i as f64);
                    exercise.subcategory_id = Some(*sub);
                    w.exercise_ids.push(exercise.id);
                    graph.exercises.push(exercise);
                }
                w
            }
            1 => {
                let mut w = Workout::new(Uuid::new_v4(), WorkoutType::Running, start, 1_800.0);
                w.category_ids = vec![cardio.id];
                w.distance_km = Some(5.0 + (i % 5) as f64);
                w
            }
            _ => {
                let mut w = Workout::new(Uuid::new_v4(), WorkoutType::Yoga, start, 2_700.0);
                w.category_ids = vec![mobility.id];
                w.notes = Some("hips and shoulders".into());
                w
            }
        };
        graph.workouts.push(workout);
    }

    let mut template =
        StrengthTemplate::new(Uuid::new_v4(), "Full Body A", "strength", now_secs * 1000);
    for (order, (name, sub, _)) in lifts.iter().enumerate() {
        let mut exercise = Exercise::new(Uuid::new_v4(), *name, order as i64);
        exercise.subcategory_id = Some(*sub);
        template.exercise_ids.push(exercise.id);
        graph.exercises.push(exercise);
    }
    graph.templates.push(template);

    graph.categories = vec![strength, cardio, mobility];
    graph.subcategories = vec![upper, lower];
    graph
}

/// Runs the seed command.
pub fn run(ctx: &Context, workouts: usize, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = JsonFileStore::open(&ctx.local)?;
    if !force && !EntityGraph::from_store(&store)?.is_empty() {
        return Err(format!(
            "Local store {:?} already has data. Use --force to add more.",
            ctx.local
        )
        .into());
    }

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
    let graph = sample_graph(workouts, now);
    graph.insert_into(&mut store)?;
    store.save()?;

    let counts = graph.counts();
    info!(path = %ctx.local.display(), total = counts.total(), "seeded local store");

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&counts)?,
        OutputFormat::Text => {
            println!("✓ Local store seeded");
            println!("  Path: {:?}", ctx.local);
            println!("  Workouts: {}", counts.workouts);
            println!("  Exercises: {}", counts.exercises);
            println!("  Categories: {}", counts.categories);
            println!("  Subcategories: {}", counts.subcategories);
            println!("  Templates: {}", counts.templates);
        }
    }

    Ok(())
}
