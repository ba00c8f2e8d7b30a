//! LiftVault CLI
//!
//! Command-line snapshot management for a LiftVault workout store.
//!
//! # Commands
//!
//! - `seed` - Fill the local store with sample workouts
//! - `backup` - Write a new snapshot of the local store
//! - `list` - List complete snapshots, newest first
//! - `preview` - Show what restoring a snapshot would produce
//! - `restore` - Replace local data with a snapshot
//! - `delete` - Delete snapshots from the remote store

mod commands;

use clap::{Parser, Subcommand};
use commands::{Context, OutputFormat};
use liftvault_backup::ConnectionClass;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// LiftVault workout backup tools.
#[derive(Parser)]
#[command(name = "liftvault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local JSON store
    #[arg(global = true, short, long, env = "LIFTVAULT_LOCAL", default_value = "liftvault.json")]
    local: PathBuf,

    /// Directory holding remote snapshots
    #[arg(global = true, short, long, env = "LIFTVAULT_REMOTE", default_value = "liftvault-remote")]
    remote: PathBuf,

    /// Name recorded in new snapshots
    #[arg(global = true, long, env = "LIFTVAULT_DEVICE", default_value = "liftvault-cli")]
    device: String,

    /// Connection class to report (unmetered, metered, offline)
    #[arg(
        global = true,
        short,
        long,
        env = "LIFTVAULT_NETWORK",
        default_value = "unmetered",
        value_parser = parse_network
    )]
    network: ConnectionClass,

    /// Allow remote calls on a metered connection
    #[arg(global = true, long, env = "LIFTVAULT_ALLOW_METERED")]
    allow_metered: bool,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill the local store with sample workouts
    Seed {
        /// Number of workouts to create
        #[arg(short, long, default_value = "3")]
        workouts: usize,

        /// Seed even if the store already has data
        #[arg(long)]
        force: bool,
    },

    /// Write a new snapshot of the local store
    Backup,

    /// List complete snapshots, newest first
    List,

    /// Show what restoring a snapshot would produce
    Preview {
        /// Snapshot id
        snapshot: Uuid,
    },

    /// Replace local data with a snapshot
    Restore {
        /// Snapshot id
        snapshot: Uuid,

        /// Replace existing local data without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete snapshots from the remote store
    Delete {
        /// Snapshot ids
        #[arg(required = true)]
        snapshots: Vec<Uuid>,
    },

    /// Show version information
    Version,
}

fn parse_network(value: &str) -> Result<ConnectionClass, String> {
    ConnectionClass::parse(value)
        .ok_or_else(|| format!("unknown connection class `{value}` (unmetered, metered, offline)"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let ctx = Context {
        local: cli.local,
        remote: cli.remote,
        device: cli.device,
        network: cli.network,
        allow_metered: cli.allow_metered,
        format: cli.format,
    };

    match cli.command {
        Commands::Seed { workouts, force } => {
            commands::seed::run(&ctx, workouts, force)?;
        }
        Commands::Backup => {
            commands::backup::create(&ctx).await?;
        }
        Commands::List => {
            commands::backup::list(&ctx).await?;
        }
        Commands::Preview { snapshot } => {
            commands::backup::preview(&ctx, snapshot).await?;
        }
        Commands::Restore { snapshot, yes } => {
            commands::backup::restore(&ctx, snapshot, yes).await?;
        }
        Commands::Delete { snapshots } => {
            commands::backup::delete(&ctx, &snapshots).await?;
        }
        Commands::Version => {
            println!("LiftVault CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Snapshot format v{}", liftvault_codec::FORMAT_VERSION);
        }
    }

    Ok(())
}
