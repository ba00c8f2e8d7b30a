//! Snapshot commands: backup, list, preview, restore and delete.
//!
//! Each command opens the local store, builds an engine over the remote
//! snapshot directory and runs one engine operation. The network class
//! comes from `--network`, so the gate behaves as it would on a device.

use liftvault_backup::{RestoreReport, SnapshotPreview, SnapshotSummary};
use liftvault_model::{EntityCounts, EntityGraph};
use tracing::info;
use uuid::Uuid;

use super::{format_timestamp, Context, OutputFormat};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Create a snapshot of the local store.
pub async fn create(ctx: &Context) -> CmdResult {
    let engine = ctx.engine()?;
    info!("Backing up {:?} to {:?}", ctx.local, ctx.remote);

    let summary = engine.create_backup(ctx.allow_metered).await?;
    let stats = engine.stats();

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&summary)?,
        OutputFormat::Text => {
            println!("✓ Backup created successfully");
            print_summary(&summary);
            println!("  Records written: {}", stats.records_written);
        }
    }
    Ok(())
}

/// List complete snapshots, newest first.
pub async fn list(ctx: &Context) -> CmdResult {
    let engine = ctx.engine()?;
    let snapshots = engine.list_backups(ctx.allow_metered).await?;

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&snapshots)?,
        OutputFormat::Text => {
            if snapshots.is_empty() {
                println!("No snapshots in {:?}", ctx.remote);
                return Ok(());
            }
            println!(
                "{:<36}  {:<23}  {:>8}  {:>9}  Device",
                "Snapshot", "Created", "Workouts", "Exercises"
            );
            for s in &snapshots {
                println!(
                    "{:<36}  {:<23}  {:>8}  {:>9}  {}",
                    s.snapshot_id,
                    format_timestamp(s.created_at),
                    s.counts.workouts,
                    s.counts.exercises,
                    s.device_name
                );
            }
        }
    }
    Ok(())
}

/// Show what restoring a snapshot would produce, without changing anything.
pub async fn preview(ctx: &Context, snapshot_id: Uuid) -> CmdResult {
    let engine = ctx.engine()?;
    let preview = engine
        .preview_backup(snapshot_id, ctx.allow_metered)
        .await?;

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&preview)?,
        OutputFormat::Text => print_preview(&preview),
    }
    Ok(())
}

/// Replace local data with a snapshot.
///
/// Refuses to overwrite a non-empty local store unless `yes` is set.
pub async fn restore(ctx: &Context, snapshot_id: Uuid, yes: bool) -> CmdResult {
    let engine = ctx.engine()?;
    let local = engine.with_local(|store| EntityGraph::from_store(store))?;
    if !yes && !local.is_empty() {
        return Err(format!(
            "Local store {:?} holds {} entities. Use --yes to replace them.",
            ctx.local,
            local.counts().total()
        )
        .into());
    }

    let report = engine
        .restore_backup(snapshot_id, ctx.allow_metered)
        .await?;

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&report)?,
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

/// Delete snapshots from the remote store.
pub async fn delete(ctx: &Context, snapshot_ids: &[Uuid]) -> CmdResult {
    let engine = ctx.engine()?;
    let report = engine
        .delete_backups(snapshot_ids, ctx.allow_metered)
        .await?;

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&report)?,
        OutputFormat::Text => {
            for id in &report.succeeded {
                println!("✓ Deleted {id}");
            }
            for id in &report.failed {
                println!("✗ Could not fully delete {id}");
            }
        }
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(format!("{} snapshot(s) not deleted", report.failed.len()).into())
    }
}

fn print_summary(summary: &SnapshotSummary) {
    println!("  Snapshot: {}", summary.snapshot_id);
    println!("  Device: {}", summary.device_name);
    println!("  Created: {}", format_timestamp(summary.created_at));
    println!("  App version: {}", summary.app_version);
    print_counts(&summary.counts);
}

fn print_counts(counts: &EntityCounts) {
    println!("  Workouts: {}", counts.workouts);
    println!("  Exercises: {}", counts.exercises);
    println!("  Categories: {}", counts.categories);
    println!("  Subcategories: {}", counts.subcategories);
    println!("  Templates: {}", counts.templates);
}

fn print_preview(preview: &SnapshotPreview) {
    println!("Snapshot Preview");
    println!("================");
    print_summary(&preview.summary);

    let counts = preview.graph.counts();
    if counts != preview.summary.counts {
        println!("  Restorable:");
        print_counts(&counts);
    }
    if preview.unknown_kinds > 0 {
        println!("  Unknown records: {}", preview.unknown_kinds);
    }
    for failure in &preview.malformed {
        println!("  ✗ {failure}");
    }
    for warning in &preview.warnings {
        println!("  ! {warning}");
    }
}

fn print_report(report: &RestoreReport) {
    println!("✓ Snapshot restored successfully");
    println!("  Snapshot: {}", report.snapshot_id);
    print_counts(&report.counts);
    println!("  Replaced: {} local entities", report.cleared.total());
    if report.unknown_kinds > 0 {
        println!("  Skipped unknown records: {}", report.unknown_kinds);
    }
    for failure in &report.malformed {
        println!("  ✗ {failure}");
    }
    for warning in &report.warnings {
        println!("  ! {warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::seed;
    use liftvault_backup::{BackupError, ConnectionClass};
    use liftvault_model::{LocalStore, Workout};

    fn context(dir: &tempfile::TempDir, network: ConnectionClass) -> Context {
        Context {
            local: dir.path().join("local.json"),
            remote: dir.path().join("remote"),
            device: "cli-test".into(),
            network,
            allow_metered: false,
            format: OutputFormat::Json,
        }
    }

    #[tokio::test]
    async fn backup_list_restore_delete() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, ConnectionClass::Unmetered);
        seed::run(&ctx, 4, false).unwrap();
        create(&ctx).await.unwrap();

        let engine = ctx.engine().unwrap();
        let snapshots = engine.list_backups(false).await.unwrap();
        assert_eq!(snapshots.len(), 1);
        let id = snapshots[0].snapshot_id;
        assert_eq!(snapshots[0].counts.workouts, 4);

        preview(&ctx, id).await.unwrap();
        assert!(restore(&ctx, id, false).await.is_err());
        restore(&ctx, id, true).await.unwrap();

        let local = liftvault_model::JsonFileStore::open(&ctx.local).unwrap();
        assert_eq!(local.fetch_all::<Workout>().unwrap().len(), 4);

        delete(&ctx, &[id]).await.unwrap();
        assert!(engine.list_backups(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metered_without_override_is_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, ConnectionClass::Metered);
        seed::run(&ctx, 1, false).unwrap();

        let err = create(&ctx).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BackupError>(),
            Some(BackupError::NetworkBlocked { .. })
        ));
        assert!(!ctx.remote.exists());

        let ctx = Context {
            allow_metered: true,
            ..ctx
        };
        create(&ctx).await.unwrap();
        assert!(ctx.remote.exists());
    }
}
