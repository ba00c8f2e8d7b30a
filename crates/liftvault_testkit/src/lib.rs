//! # LiftVault Testkit
//!
//! Test utilities for LiftVault.
//!
//! This crate provides:
//! - Entity graph fixtures, seeded stores and pre-wired engines
//! - Property-based graph generators using proptest
//! - A fault-injecting remote store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use liftvault_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn backs_up_the_scenario() {
//!     let remote = Arc::new(MemoryRemoteStore::new());
//!     let local = seeded_store(&scenario_graph());
//!     let (_, engine) = test_engine(remote, local, ConnectionClass::Unmetered);
//!     engine.create_backup(false).await.unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
