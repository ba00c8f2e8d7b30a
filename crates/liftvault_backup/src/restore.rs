//! Two-phase reconstruction of the entity graph from snapshot records.
//!
//! Phase one inserts every decoded entity with its scalar fields only.
//! Phase two resolves the reference lists against the ids that were
//! actually decoded and stores the linked entities. References that do not
//! resolve are dropped with a [`ReconstructionWarning`]; they never fail a
//! restore.
//!
//! [`link`] is pure so that preview and restore produce the same graph.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use liftvault_codec::{
    decode, DecodeFailure, Decoded, PartialGraph, ROLE_CATEGORIES, ROLE_EXERCISES,
    ROLE_SUBCATEGORIES,
};
use liftvault_model::{
    Category, Entity, EntityCounts, EntityGraph, EntityKind, Exercise, LocalStore,
    StoreResult, StrengthTemplate, Subcategory, Workout,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::SnapshotContents;
use crate::error::{BackupError, BackupResult, RestorePhase};

/// A non-fatal problem found while linking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReconstructionWarning {
    /// A referenced id is not present in the snapshot.
    DanglingReference {
        /// Kind of the referencing entity.
        kind: EntityKind,
        /// The referencing entity.
        id: Uuid,
        /// Reference role.
        role: String,
        /// The missing target.
        target: Uuid,
    },
    /// A subcategory was claimed by a second parent category.
    ParentConflict {
        /// The subcategory.
        subcategory_id: Uuid,
        /// The parent that was kept.
        kept: Uuid,
        /// The parent that was ignored.
        ignored: Uuid,
    },
    /// An exercise was listed by a second owner.
    DuplicateOwner {
        /// The exercise.
        exercise_id: Uuid,
        /// The owner that was kept.
        kept: Uuid,
        /// The owner that was ignored.
        ignored: Uuid,
    },
    /// A record carries a reference role this kind does not use.
    UnknownRole {
        /// Kind of the entity.
        kind: EntityKind,
        /// The entity.
        id: Uuid,
        /// The unexpected role.
        role: String,
    },
}

impl fmt::Display for ReconstructionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconstructionWarning::DanglingReference {
                kind,
                id,
                role,
                target,
            } => write!(f, "{kind} {id}: dropped {role} reference to missing {target}"),
            ReconstructionWarning::ParentConflict {
                subcategory_id,
                kept,
                ignored,
            } => write!(
                f,
                "subcategory {subcategory_id}: kept parent {kept}, ignored {ignored}"
            ),
            ReconstructionWarning::DuplicateOwner {
                exercise_id,
                kept,
                ignored,
            } => write!(
                f,
                "exercise {exercise_id}: kept owner {kept}, ignored {ignored}"
            ),
            ReconstructionWarning::UnknownRole { kind, id, role } => {
                write!(f, "{kind} {id}: ignored unknown reference role `{role}`")
            }
        }
    }
}

/// A linked graph plus the warnings produced while linking it.
#[derive(Debug, Clone, Default)]
pub struct Linked {
    /// The reconstructed graph, each list ordered by id.
    pub graph: EntityGraph,
    /// Problems found while resolving references.
    pub warnings: Vec<ReconstructionWarning>,
}

/// Outcome of a successful restore.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    /// The restored snapshot.
    pub snapshot_id: Uuid,
    /// Entities written per kind.
    pub counts: EntityCounts,
    /// Local entities removed per kind before inserting.
    pub cleared: EntityCounts,
    /// Problems found while resolving references.
    pub warnings: Vec<ReconstructionWarning>,
    /// Records that could not be decoded and were skipped.
    #[serde(serialize_with = "serialize_failures")]
    pub malformed: Vec<DecodeFailure>,
    /// Records of kinds this build does not recognize.
    pub unknown_kinds: usize,
}

impl RestoreReport {
    /// Ids of the records that were skipped as malformed.
    pub fn malformed_ids(&self) -> Vec<Uuid> {
        self.malformed.iter().map(|f| f.record_id).collect()
    }
}

pub(crate) fn serialize_failures<S: serde::Serializer>(
    failures: &[DecodeFailure],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(failures.iter().map(|f| f.to_string()))
}

struct Linker<'a> {
    partial: &'a PartialGraph,
    warnings: Vec<ReconstructionWarning>,
}

impl<'a> Linker<'a> {
    fn warn(&mut self, warning: ReconstructionWarning) {
        warn!(%warning, "reconstruction warning");
        self.warnings.push(warning);
    }

    fn check_roles<T>(
        &mut self,
        kind: EntityKind,
        id: Uuid,
        decoded: &Decoded<T>,
        allowed: &[&str],
    ) {
        for role in decoded.refs.keys() {
            if !allowed.contains(&role.as_str()) {
                self.warn(ReconstructionWarning::UnknownRole {
                    kind,
                    id,
                    role: role.clone(),
                });
            }
        }
    }

    /// Returns the ids under `role` that exist in `targets`, deduplicated in
    /// order. Missing ids produce warnings.
    fn resolve<T, U>(
        &mut self,
        kind: EntityKind,
        id: Uuid,
        decoded: &Decoded<T>,
        role: &str,
        targets: &BTreeMap<Uuid, U>,
    ) -> Vec<Uuid> {
        let mut seen = BTreeSet::new();
        let mut resolved = Vec::new();
        for target in decoded.refs.get(role).into_iter().flatten() {
            if !targets.contains_key(target) {
                self.warn(ReconstructionWarning::DanglingReference {
                    kind,
                    id,
                    role: role.to_string(),
                    target: *target,
                });
            } else if seen.insert(*target) {
                resolved.push(*target);
            }
        }
        resolved
    }

    fn subcategory_parents(&mut self) -> BTreeMap<Uuid, Uuid> {
        let partial = self.partial;
        let mut parents: BTreeMap<Uuid, Uuid> = BTreeMap::new();

        let mut claim = |linker: &mut Self, sub: Uuid, parent: Uuid| match parents.get(&sub) {
            None => {
                parents.insert(sub, parent);
            }
            Some(kept) if *kept != parent => {
                linker.warn(ReconstructionWarning::ParentConflict {
                    subcategory_id: sub,
                    kept: *kept,
                    ignored: parent,
                });
            }
            Some(_) => {}
        };

        // A subcategory's own parent edge wins over a category's listing.
        for (id, decoded) in &partial.subcategories {
            self.check_roles(EntityKind::Subcategory, *id, decoded, &[ROLE_CATEGORIES]);
            let found = self.resolve(
                EntityKind::Subcategory,
                *id,
                decoded,
                ROLE_CATEGORIES,
                &partial.categories,
            );
            for parent in found {
                claim(self, *id, parent);
            }
        }
        for (id, decoded) in &partial.categories {
            self.check_roles(EntityKind::Category, *id, decoded, &[ROLE_SUBCATEGORIES]);
            let owned = self.resolve(
                EntityKind::Category,
                *id,
                decoded,
                ROLE_SUBCATEGORIES,
                &partial.subcategories,
            );
            for sub in owned {
                claim(self, sub, *id);
            }
        }
        parents
    }

    /// Resolves an owned exercise list, enforcing a single owner per
    /// exercise and ordering by `order_index`.
    fn owned_exercises<T>(
        &mut self,
        kind: EntityKind,
        owner: Uuid,
        decoded: &Decoded<T>,
        owners: &mut BTreeMap<Uuid, Uuid>,
    ) -> Vec<Uuid> {
        let partial = self.partial;
        let mut owned: Vec<Uuid> = self
            .resolve(kind, owner, decoded, ROLE_EXERCISES, &partial.exercises)
            .into_iter()
            .filter(|exercise| match owners.get(exercise) {
                Some(kept) => {
                    let warning = ReconstructionWarning::DuplicateOwner {
                        exercise_id: *exercise,
                        kept: *kept,
                        ignored: owner,
                    };
                    warn!(%warning, "reconstruction warning");
                    self.warnings.push(warning);
                    false
                }
                None => {
                    owners.insert(*exercise, owner);
                    true
                }
            })
            .collect();

        owned.sort_by_key(|id| {
            partial
                .exercises
                .get(id)
                .map_or(i64::MAX, |d| d.entity.order_index)
        });
        owned
    }

    fn run(mut self) -> Linked {
        let partial = self.partial;
        let mut graph = EntityGraph::default();

        let parents = self.subcategory_parents();
        graph.categories = partial
            .categories
            .values()
            .map(|d| d.entity.clone())
            .collect();
        graph.subcategories = partial
            .subcategories
            .values()
            .map(|d| Subcategory {
                category_id: parents.get(&d.entity.id).copied(),
                ..d.entity.clone()
            })
            .collect();

        for (id, decoded) in &partial.exercises {
            self.check_roles(EntityKind::Exercise, *id, decoded, &[ROLE_SUBCATEGORIES]);
            let subcategory = self
                .resolve(
                    EntityKind::Exercise,
                    *id,
                    decoded,
                    ROLE_SUBCATEGORIES,
                    &partial.subcategories,
                )
                .first()
                .copied();
            graph.exercises.push(Exercise {
                subcategory_id: subcategory,
                ..decoded.entity.clone()
            });
        }

        let mut owners = BTreeMap::new();
        for (id, decoded) in &partial.workouts {
            self.check_roles(
                EntityKind::Workout,
                *id,
                decoded,
                &[ROLE_CATEGORIES, ROLE_SUBCATEGORIES, ROLE_EXERCISES],
            );
            let category_ids = self.resolve(
                EntityKind::Workout,
                *id,
                decoded,
                ROLE_CATEGORIES,
                &partial.categories,
            );
            let subcategory_ids = self.resolve(
                EntityKind::Workout,
                *id,
                decoded,
                ROLE_SUBCATEGORIES,
                &partial.subcategories,
            );
            let exercise_ids = self.owned_exercises(EntityKind::Workout, *id, decoded, &mut owners);
            graph.workouts.push(Workout {
                category_ids,
                subcategory_ids,
                exercise_ids,
                ..decoded.entity.clone()
            });
        }

        for (id, decoded) in &partial.templates {
            self.check_roles(EntityKind::StrengthTemplate, *id, decoded, &[ROLE_EXERCISES]);
            let exercise_ids =
                self.owned_exercises(EntityKind::StrengthTemplate, *id, decoded, &mut owners);
            graph.templates.push(StrengthTemplate {
                exercise_ids,
                ..decoded.entity.clone()
            });
        }

        Linked {
            graph,
            warnings: self.warnings,
        }
    }
}

/// Resolves every reference in a decoded snapshot into a linked graph.
///
/// Pure: the same input always yields the same graph and warnings.
pub fn link(partial: &PartialGraph) -> Linked {
    Linker {
        partial,
        warnings: Vec::new(),
    }
    .run()
}

fn clear<E: Entity, L: LocalStore>(store: &mut L) -> StoreResult<u64> {
    let existing = store.fetch_all::<E>()?;
    for entity in &existing {
        store.delete::<E>(entity.id())?;
    }
    Ok(existing.len() as u64)
}

fn clear_kind<L: LocalStore>(store: &mut L, kind: EntityKind) -> StoreResult<u64> {
    match kind {
        EntityKind::Workout => clear::<Workout, L>(store),
        EntityKind::Category => clear::<Category, L>(store),
        EntityKind::Subcategory => clear::<Subcategory, L>(store),
        EntityKind::Exercise => clear::<Exercise, L>(store),
        EntityKind::StrengthTemplate => clear::<StrengthTemplate, L>(store),
    }
}

fn insert_scalars<E: Entity, L: LocalStore>(
    store: &mut L,
    decoded: &BTreeMap<Uuid, Decoded<E>>,
) -> StoreResult<()> {
    for entry in decoded.values() {
        store.insert(entry.entity.clone())?;
    }
    Ok(())
}

fn apply<L: LocalStore>(
    store: &mut L,
    partial: &PartialGraph,
) -> BackupResult<(EntityCounts, Linked)> {
    // Clear
    let mut cleared = EntityCounts::default();
    for kind in EntityKind::ALL.iter().rev() {
        if partial.kinds_present.contains(kind) {
            let removed =
                clear_kind(store, *kind).map_err(|source| BackupError::ClearFailed { source })?;
            cleared.set(*kind, removed);
        }
    }

    // Insert scalars
    let insert_failed = |source| BackupError::InsertFailed {
        phase: RestorePhase::InsertScalars,
        source,
    };
    insert_scalars(store, &partial.categories).map_err(insert_failed)?;
    insert_scalars(store, &partial.subcategories).map_err(insert_failed)?;
    insert_scalars(store, &partial.exercises).map_err(insert_failed)?;
    insert_scalars(store, &partial.workouts).map_err(insert_failed)?;
    insert_scalars(store, &partial.templates).map_err(insert_failed)?;

    // Attach relationships
    let linked = link(partial);
    linked
        .graph
        .insert_into(store)
        .map_err(|source| BackupError::InsertFailed {
            phase: RestorePhase::AttachRelationships,
            source,
        })?;

    // Commit
    store
        .save()
        .map_err(|source| BackupError::CommitFailed { source })?;

    Ok((cleared, linked))
}

/// Replaces the local entities of every kind in the snapshot.
///
/// Kinds absent from the snapshot are left untouched. Malformed records are
/// skipped and reported. On any store failure every staged change is rolled
/// back before the error is returned.
pub fn restore_into<L: LocalStore>(
    store: &mut L,
    contents: &SnapshotContents,
) -> BackupResult<RestoreReport> {
    let snapshot_id = contents.summary.snapshot_id;
    let partial = decode(&contents.records);
    for failure in &partial.failures {
        warn!(%snapshot_id, %failure, "skipping malformed record");
    }
    if partial.unknown_kinds > 0 {
        debug!(%snapshot_id, count = partial.unknown_kinds, "skipping records of unknown kind");
    }

    match apply(store, &partial) {
        Ok((cleared, linked)) => {
            let counts = linked.graph.counts();
            info!(
                %snapshot_id,
                restored = counts.total(),
                warnings = linked.warnings.len(),
                malformed = partial.failures.len(),
                "restore committed"
            );
            Ok(RestoreReport {
                snapshot_id,
                counts,
                cleared,
                warnings: linked.warnings,
                malformed: partial.failures,
                unknown_kinds: partial.unknown_kinds,
            })
        }
        Err(e) => {
            store.rollback();
            warn!(%snapshot_id, error = %e, "restore rolled back");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SnapshotSummary;
    use liftvault_codec::{encode, encode_workout, SnapshotHeader, SnapshotMetadata};
    use liftvault_model::{MemoryStore, WorkoutType};

    fn contents(graph: &EntityGraph) -> SnapshotContents {
        let header = SnapshotHeader::new(Uuid::new_v4(), 1_000);
        let meta = SnapshotMetadata::new(&header, "test", graph.counts(), "1.0.0");
        let mut records = encode(graph, &header);
        records.push(meta.to_record());
        SnapshotContents {
            summary: SnapshotSummary::from(meta),
            records,
        }
    }

    fn strength_graph() -> EntityGraph {
        let legs = Category::new(Uuid::new_v4(), "Legs", "#aa0000", WorkoutType::Strength);
        let quads = Subcategory::new(Uuid::new_v4(), "Quads", Some(legs.id));
        let mut squat = Exercise::new(Uuid::new_v4(), "Squat", 0);
        squat.subcategory_id = Some(quads.id);
        let lunge = Exercise::new(Uuid::new_v4(), "Lunge", 1);
        let mut workout = Workout::new(Uuid::new_v4(), WorkoutType::Strength, 10, 3600.0);
        workout.category_ids = vec![legs.id];
        workout.subcategory_ids = vec![quads.id];
        workout.exercise_ids = vec![squat.id, lunge.id];

        EntityGraph {
            workouts: vec![workout],
            categories: vec![legs],
            subcategories: vec![quads],
            exercises: vec![squat, lunge],
            templates: Vec::new(),
        }
    }

    #[test]
    fn link_rebuilds_every_edge() {
        let mut graph = strength_graph();
        let linked = link(&decode(&contents(&graph).records));
        graph.sort_by_id();
        assert_eq!(linked.graph, graph);
        assert!(linked.warnings.is_empty());
    }

    #[test]
    fn owned_exercises_follow_order_index() {
        let mut graph = strength_graph();
        graph.workouts[0].exercise_ids.reverse();
        let linked = link(&decode(&contents(&graph).records));
        let names: Vec<_> = linked.graph.workouts[0]
            .exercise_ids
            .iter()
            .map(|id| {
                linked
                    .graph
                    .exercises
                    .iter()
                    .find(|e| e.id == *id)
                    .map(|e| e.name.clone())
                    .unwrap()
            })
            .collect();
        assert_eq!(names, vec!["Squat", "Lunge"]);
    }

    #[test]
    fn dangling_references_are_dropped_with_warnings() {
        let header = SnapshotHeader::new(Uuid::new_v4(), 1);
        let ghost = Uuid::new_v4();
        let mut workout = Workout::new(Uuid::new_v4(), WorkoutType::Running, 0, 60.0);
        workout.category_ids = vec![ghost];

        let linked = link(&decode(&[encode_workout(&workout, &header)]));
        assert!(linked.graph.workouts[0].category_ids.is_empty());
        assert_eq!(
            linked.warnings,
            vec![ReconstructionWarning::DanglingReference {
                kind: EntityKind::Workout,
                id: workout.id,
                role: ROLE_CATEGORIES.to_string(),
                target: ghost,
            }]
        );
    }

    #[test]
    fn exercise_listed_twice_keeps_first_owner() {
        let mut graph = strength_graph();
        let shared = graph.exercises[0].id;
        let mut template = StrengthTemplate::new(Uuid::new_v4(), "Leg day", "legs", 5);
        template.exercise_ids = vec![shared];
        graph.templates.push(template.clone());

        let linked = link(&decode(&contents(&graph).records));
        assert!(linked.graph.templates[0].exercise_ids.is_empty());
        assert!(matches!(
            linked.warnings[0],
            ReconstructionWarning::DuplicateOwner { exercise_id, ignored, .. }
                if exercise_id == shared && ignored == template.id
        ));
    }

    #[test]
    fn restore_replaces_only_present_kinds() {
        let mut store = MemoryStore::new();
        let stale = Workout::new(Uuid::new_v4(), WorkoutType::Walking, 0, 10.0);
        let template = StrengthTemplate::new(Uuid::new_v4(), "Keep me", "push", 1);
        store.insert(stale.clone()).unwrap();
        store.insert(template.clone()).unwrap();
        store.save().unwrap();

        let report = restore_into(&mut store, &contents(&strength_graph())).unwrap();
        assert_eq!(report.counts.workouts, 1);
        assert_eq!(report.cleared.workouts, 1);

        let workouts: Vec<Workout> = store.fetch_all().unwrap();
        assert_eq!(workouts.len(), 1);
        assert_ne!(workouts[0].id, stale.id);
        let templates: Vec<StrengthTemplate> = store.fetch_all().unwrap();
        assert_eq!(templates, vec![template]);
    }

    #[test]
    fn failed_commit_rolls_back() {
        let mut store = MemoryStore::new();
        let existing = Workout::new(Uuid::new_v4(), WorkoutType::Yoga, 0, 10.0);
        store.insert(existing.clone()).unwrap();
        store.save().unwrap();
        store.set_fail_on_save(true);

        let err = restore_into(&mut store, &contents(&strength_graph())).unwrap_err();
        assert!(matches!(err, BackupError::CommitFailed { .. }));
        assert_eq!(err.restore_phase(), Some(RestorePhase::Commit));

        let workouts: Vec<Workout> = store.fetch_all().unwrap();
        assert_eq!(workouts, vec![existing]);
        assert!(!store.has_changes());
    }
}
