//! # LiftVault Codec
//!
//! Flattens the workout entity graph into schemaless records and groups
//! records back into per-kind maps.
//!
//! Each record holds a primary id, scalar fields and foreign-key id lists
//! keyed by role (`categoryIds`, `subcategoryIds`, `exercises`). Records are
//! flat so that any one of them can be written on its own; nothing is
//! nested.
//!
//! Encoding is total and decoding never fails as a whole: unknown kinds are
//! counted and malformed records are reported individually. Resolving
//! references is left to the restore side.
//!
//! ## Usage
//!
//! ```
//! use liftvault_codec::{decode, encode, SnapshotHeader};
//! use liftvault_model::{EntityGraph, Workout, WorkoutType};
//! use uuid::Uuid;
//!
//! let mut graph = EntityGraph::default();
//! graph.workouts.push(Workout::new(Uuid::new_v4(), WorkoutType::Running, 0, 1800.0));
//!
//! let header = SnapshotHeader::new(Uuid::new_v4(), 1_700_000_000_000);
//! let records = encode(&graph, &header);
//! let partial = decode(&records);
//! assert_eq!(partial.workouts.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod metadata;
mod record;
mod schema;
mod value;

pub use decoder::{
    decode, decode_category, decode_exercise, decode_subcategory, decode_template,
    decode_workout, DecodeFailure, Decoded, PartialGraph,
};
pub use encoder::{
    encode, encode_category, encode_exercise, encode_subcategory, encode_template,
    encode_workout,
};
pub use error::{CodecError, CodecResult};
pub use metadata::SnapshotMetadata;
pub use record::{
    Record, RecordKey, RecordKind, SnapshotHeader, ROLE_CATEGORIES, ROLE_EXERCISES,
    ROLE_SUBCATEGORIES,
};
pub use schema::FORMAT_VERSION;
pub use value::FieldValue;
