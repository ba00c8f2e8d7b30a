//! # LiftVault Model
//!
//! The local workout entity graph and the store abstraction the backup
//! engine consumes.
//!
//! This crate provides:
//! - Entity types: [`Workout`], [`Category`], [`Subcategory`], [`Exercise`],
//!   [`StrengthTemplate`]
//! - [`EntityGraph`], a full in-memory copy of every table
//! - The [`LocalStore`] trait (fetch all, insert, delete, save, rollback)
//! - [`MemoryStore`] and [`JsonFileStore`] implementations
//!
//! ## Relationships
//!
//! Relationships are held as id lists, never as object references. A
//! subcategory points at its parent category through `category_id`; the
//! category's ownership of its subcategories is derived from that edge.
//! Exercises are stored in their own table and listed, in order, by the
//! workout or template that owns them.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod error;
mod graph;
mod store;

pub use entity::{
    Category, Entity, EntityKind, Exercise, StrengthTemplate, Subcategory, Workout, WorkoutType,
};
pub use error::{StoreError, StoreResult};
pub use graph::{EntityCounts, EntityGraph};
pub use store::{JsonFileStore, LocalStore, MemoryStore, Tables};
