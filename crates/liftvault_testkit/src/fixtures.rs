//! Test fixtures and store helpers.
//!
//! Provides ready-made entity graphs, seeded stores and engines wired to
//! in-memory fakes.

use std::sync::Arc;

use liftvault_backup::{
    BackupConfig, BackupEngine, ConnectionClass, RemoteStore, RetryConfig, StaticClassifier,
};
use liftvault_codec::{Record, RecordKind, SnapshotHeader};
use liftvault_model::{
    Category, EntityGraph, Exercise, JsonFileStore, LocalStore, MemoryStore, StrengthTemplate,
    Subcategory, Workout, WorkoutType,
};
use tempfile::TempDir;
use uuid::Uuid;

/// The three-workout graph: 2 categories, 1 subcategory, 3 workouts.
///
/// Workouts are linked to categories `Strength` and `Cardio` by id; the
/// subcategory `Upper Body` belongs to `Strength`.
pub fn scenario_graph() -> EntityGraph {
    let strength = Category::new(Uuid::new_v4(), "Strength", "#d94f30", WorkoutType::Strength);
    let cardio = Category::new(Uuid::new_v4(), "Cardio", "#2f8fd9", WorkoutType::Running);
    let upper = Subcategory::new(Uuid::new_v4(), "Upper Body", Some(strength.id));

    let mut push_day = Workout::new(Uuid::new_v4(), WorkoutType::Strength, 1_700_000_000, 3_600.0);
    push_day.category_ids = vec![strength.id];
    push_day.subcategory_ids = vec![upper.id];
    push_day.rating = Some(4);

    let mut morning_run =
        Workout::new(Uuid::new_v4(), WorkoutType::Running, 1_700_086_400, 1_800.0);
    morning_run.category_ids = vec![cardio.id];
    morning_run.distance_km = Some(5.0);

    let mut brick = Workout::new(Uuid::new_v4(), WorkoutType::Hiit, 1_700_172_800, 2_400.0);
    brick.category_ids = vec![strength.id, cardio.id];
    brick.notes = Some("intervals then curls".into());

    EntityGraph {
        workouts: vec![push_day, morning_run, brick],
        categories: vec![strength, cardio],
        subcategories: vec![upper],
        exercises: Vec::new(),
        templates: Vec::new(),
    }
}

/// A graph using every entity kind and every relationship.
pub fn full_graph() -> EntityGraph {
    let mut graph = scenario_graph();
    let upper = graph.subcategories[0].id;

    let mut bench = Exercise::new(Uuid::new_v4(), "Bench Press", 0);
    bench.sets = Some(5);
    bench.reps = Some(5);
    bench.weight_kg = Some(80.0);
    bench.subcategory_id = Some(upper);
    let mut row = Exercise::new(Uuid::new_v4(), "Barbell Row", 1);
    row.sets = Some(3);
    row.reps = Some(8);
    row.weight_kg = Some(60.0);
    row.subcategory_id = Some(upper);
    graph.workouts[0].exercise_ids = vec![bench.id, row.id];

    let mut press = Exercise::new(Uuid::new_v4(), "Overhead Press", 0);
    press.subcategory_id = Some(upper);
    let dips = Exercise::new(Uuid::new_v4(), "Dips", 1);
    let mut template = StrengthTemplate::new(Uuid::new_v4(), "Push A", "push", 1_700_000_500);
    template.exercise_ids = vec![press.id, dips.id];

    graph.exercises = vec![bench, row, press, dips];
    graph.templates = vec![template];
    graph
}

/// Returns a saved in-memory store holding `graph`.
pub fn seeded_store(graph: &EntityGraph) -> MemoryStore {
    let mut store = MemoryStore::new();
    graph
        .insert_into(&mut store)
        .expect("memory store accepts inserts");
    store.save().expect("memory store saves");
    store
}

/// Returns a file-backed store in a fresh temporary directory.
///
/// The directory is removed when the returned [`TempDir`] is dropped.
pub fn temp_file_store() -> (TempDir, JsonFileStore) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store =
        JsonFileStore::open(dir.path().join("liftvault.json")).expect("Failed to open store");
    (dir, store)
}

/// Returns `n` small exercise records of one snapshot.
pub fn exercise_records(n: usize) -> (SnapshotHeader, Vec<Record>) {
    let header = SnapshotHeader::new(Uuid::new_v4(), 1_700_000_000_000);
    let records = (0..n)
        .map(|i| {
            Record::new(Uuid::new_v4(), RecordKind::Exercise, &header)
                .with_field("name", format!("exercise {i:04}"))
                .with_field("orderIndex", i as i64)
        })
        .collect();
    (header, records)
}

/// Backup configuration with retries that never sleep.
pub fn fast_config() -> BackupConfig {
    BackupConfig::new("test device")
        .with_app_version("0.0.0-test")
        .with_retry(RetryConfig::immediate(3))
}

/// An engine over the given stores plus the classifier that drives its gate.
pub fn test_engine<R, L>(
    remote: Arc<R>,
    local: L,
    class: ConnectionClass,
) -> (Arc<StaticClassifier>, BackupEngine<R, L>)
where
    R: RemoteStore + 'static,
    L: LocalStore,
{
    test_engine_with(fast_config(), remote, local, class)
}

/// Like [`test_engine`] with an explicit configuration.
pub fn test_engine_with<R, L>(
    config: BackupConfig,
    remote: Arc<R>,
    local: L,
    class: ConnectionClass,
) -> (Arc<StaticClassifier>, BackupEngine<R, L>)
where
    R: RemoteStore + 'static,
    L: LocalStore,
{
    let classifier = Arc::new(StaticClassifier::new(class));
    let engine = BackupEngine::new(config, remote, local, classifier.clone());
    (classifier, engine)
}
