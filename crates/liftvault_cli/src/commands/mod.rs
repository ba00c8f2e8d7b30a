//! CLI command implementations.

pub mod backup;
pub mod seed;

use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use liftvault_backup::{
    BackupConfig, BackupEngine, ConnectionClass, DirectoryRemoteStore, StaticClassifier,
};
use liftvault_model::JsonFileStore;
use serde::Serialize;

/// Engine over the on-disk stores the CLI works with.
pub type Engine = BackupEngine<DirectoryRemoteStore, JsonFileStore>;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Local store file.
    pub local: PathBuf,
    /// Remote snapshot directory.
    pub remote: PathBuf,
    /// Device name for new snapshots.
    pub device: String,
    /// Connection class reported to the gate.
    pub network: ConnectionClass,
    /// Whether metered connections may be used.
    pub allow_metered: bool,
    /// Output format.
    pub format: OutputFormat,
}

impl Context {
    /// Opens the local store and builds an engine around it.
    pub fn engine(&self) -> Result<Engine, Box<dyn std::error::Error>> {
        let local = JsonFileStore::open(&self.local)?;
        let remote = Arc::new(DirectoryRemoteStore::new(&self.remote));
        let config = BackupConfig::new(self.device.as_str())
            .with_app_version(env!("CARGO_PKG_VERSION"));
        Ok(BackupEngine::new(
            config,
            remote,
            local,
            Arc::new(StaticClassifier::new(self.network)),
        ))
    }

    /// Prints `value` as pretty JSON.
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<(), Box<dyn std::error::Error>> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Formats milliseconds since the epoch as a UTC date and time.
pub fn format_timestamp(ms: u64) -> String {
    let secs = ms / 1000;
    let days = (secs / 86_400) as i64;
    let (hours, mins, secs) = ((secs / 3600) % 24, (secs / 60) % 60, secs % 60);

    // Civil date from days since 1970-01-01.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    format!("{year:04}-{month:02}-{day:02} {hours:02}:{mins:02}:{secs:02} UTC")
}
