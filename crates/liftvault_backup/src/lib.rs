//! # LiftVault Backup
//!
//! Snapshot, restore and prune engine for the LiftVault workout store.
//!
//! This crate provides:
//! - Network gate (unmetered / metered / offline policy)
//! - Chunked, retried, bounded-parallel batch writer
//! - Backup catalog (list and full fetch)
//! - Two-phase restore reconstructor with rollback
//! - Snapshot pruner
//! - Remote store abstraction with in-memory and directory implementations
//!
//! ## Architecture
//!
//! A backup reads the whole local graph, encodes it into flat records and
//! writes them in chunks. The snapshot's metadata record is written last:
//! a snapshot is listed only once every data record has landed.
//!
//! A restore fetches one snapshot, decodes it, clears the affected local
//! kinds, inserts scalar-only entities and then attaches relationships
//! through the decoded ids before a single save.
//!
//! ## Key Invariants
//!
//! - No remote call is made when the gate refuses the connection
//! - A new backup always creates a new snapshot id
//! - Metadata is written last and deleted last
//! - Dangling references are dropped with warnings, never fatal
//! - A failed restore leaves the local store unchanged

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod config;
mod engine;
mod error;
mod gate;
mod prune;
mod remote;
mod restore;
mod retry;
mod writer;

pub use catalog::{Catalog, SnapshotContents, SnapshotSummary};
pub use config::{
    BackupConfig, RetryConfig, DEFAULT_MAX_BATCH_BYTES, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_MAX_PARALLEL_CHUNKS,
};
pub use engine::{BackupEngine, EngineStats, OperationKind, SnapshotPreview};
pub use error::{BackupError, BackupResult, RestorePhase};
pub use gate::{ConnectionClass, ConnectionClassifier, NetworkGate, StaticClassifier};
pub use prune::{PruneReport, Pruner};
pub use remote::{
    BatchOutcome, DirectoryRemoteStore, MemoryRemoteStore, RecordTag, RemoteError, RemoteResult,
    RemoteStore,
};
pub use restore::{link, restore_into, Linked, ReconstructionWarning, RestoreReport};
pub use writer::{BatchWriter, FailureReason, RecordFailure, WriteResult};
