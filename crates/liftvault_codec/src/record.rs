//! The flat wire record.

use std::collections::BTreeMap;
use std::fmt;

use liftvault_model::EntityKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CodecError, CodecResult};
use crate::schema;
use crate::value::FieldValue;

/// Reference role: linked category ids.
pub const ROLE_CATEGORIES: &str = "categoryIds";
/// Reference role: linked subcategory ids.
pub const ROLE_SUBCATEGORIES: &str = "subcategoryIds";
/// Reference role: owned exercise ids, in order.
pub const ROLE_EXERCISES: &str = "exercises";

/// Record kind tag.
///
/// On the wire the kind is a plain string so that newer writers can add
/// kinds without breaking older readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    /// A [`Workout`](liftvault_model::Workout).
    Workout,
    /// A [`Category`](liftvault_model::Category).
    Category,
    /// A [`Subcategory`](liftvault_model::Subcategory).
    Subcategory,
    /// An [`Exercise`](liftvault_model::Exercise).
    Exercise,
    /// A [`StrengthTemplate`](liftvault_model::StrengthTemplate).
    StrengthTemplate,
    /// The per-snapshot metadata record.
    Metadata,
    /// Stands in for a stored record the remote store could not parse.
    Unreadable,
}

impl RecordKind {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Workout => "workout",
            RecordKind::Category => "category",
            RecordKind::Subcategory => "subcategory",
            RecordKind::Exercise => "exercise",
            RecordKind::StrengthTemplate => "strengthTemplate",
            RecordKind::Metadata => "metadata",
            RecordKind::Unreadable => "unreadable",
        }
    }

    /// Parses a wire name. Unknown names return `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "workout" => Some(RecordKind::Workout),
            "category" => Some(RecordKind::Category),
            "subcategory" => Some(RecordKind::Subcategory),
            "exercise" => Some(RecordKind::Exercise),
            "strengthTemplate" => Some(RecordKind::StrengthTemplate),
            "metadata" => Some(RecordKind::Metadata),
            "unreadable" => Some(RecordKind::Unreadable),
            _ => None,
        }
    }

    /// Returns the entity kind, or `None` for metadata and placeholders.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            RecordKind::Workout => Some(EntityKind::Workout),
            RecordKind::Category => Some(EntityKind::Category),
            RecordKind::Subcategory => Some(EntityKind::Subcategory),
            RecordKind::Exercise => Some(EntityKind::Exercise),
            RecordKind::StrengthTemplate => Some(EntityKind::StrengthTemplate),
            RecordKind::Metadata | RecordKind::Unreadable => None,
        }
    }
}

impl From<EntityKind> for RecordKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Workout => RecordKind::Workout,
            EntityKind::Category => RecordKind::Category,
            EntityKind::Subcategory => RecordKind::Subcategory,
            EntityKind::Exercise => RecordKind::Exercise,
            EntityKind::StrengthTemplate => RecordKind::StrengthTemplate,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote address of a record.
///
/// The same entity id appears in every snapshot that contains the entity,
/// so records are keyed by snapshot and id together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    /// Snapshot the record belongs to.
    pub snapshot_id: Uuid,
    /// Record id (the entity's primary id).
    pub record_id: Uuid,
}

impl RecordKey {
    /// Creates a record key.
    pub fn new(snapshot_id: Uuid, record_id: Uuid) -> Self {
        Self {
            snapshot_id,
            record_id,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.snapshot_id, self.record_id)
    }
}

/// Identity shared by every record of one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Snapshot id.
    pub snapshot_id: Uuid,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl SnapshotHeader {
    /// Creates a header.
    pub fn new(snapshot_id: Uuid, created_at: u64) -> Self {
        Self {
            snapshot_id,
            created_at,
        }
    }
}

/// A flat, foreign-key-addressed record.
///
/// # Fields
///
/// - `id`: the entity's primary id (the snapshot id for metadata records)
/// - `kind`: wire kind name, see [`RecordKind`]
/// - `fields`: scalar values keyed by field name
/// - `refs`: foreign-key id lists keyed by role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Primary id.
    pub id: Uuid,
    /// Kind name.
    pub kind: String,
    /// Owning snapshot.
    pub snapshot_id: Uuid,
    /// Snapshot creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Scalar fields.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Foreign-key lists by role.
    #[serde(default)]
    pub refs: BTreeMap<String, Vec<Uuid>>,
}

impl Record {
    /// Creates an empty record of the given kind.
    pub fn new(id: Uuid, kind: RecordKind, header: &SnapshotHeader) -> Self {
        Self {
            id,
            kind: kind.as_str().to_string(),
            snapshot_id: header.snapshot_id,
            created_at: header.created_at,
            fields: BTreeMap::new(),
            refs: BTreeMap::new(),
        }
    }

    /// Creates a placeholder for a stored record that could not be parsed.
    ///
    /// Only the key survives. Decoding reports the placeholder as a
    /// malformed record carrying `reason`.
    pub fn unreadable(key: RecordKey, reason: impl Into<String>) -> Self {
        let header = SnapshotHeader::new(key.snapshot_id, 0);
        Self::new(key.record_id, RecordKind::Unreadable, &header)
            .with_field(schema::REASON, FieldValue::Text(reason.into()))
    }

    /// Sets a scalar field.
    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Sets a reference list. Empty lists are omitted.
    pub fn with_refs(mut self, role: &str, ids: Vec<Uuid>) -> Self {
        if !ids.is_empty() {
            self.refs.insert(role.to_string(), ids);
        }
        self
    }

    /// Returns the parsed kind, or `None` for kinds this build does not know.
    pub fn record_kind(&self) -> Option<RecordKind> {
        RecordKind::parse(&self.kind)
    }

    /// Returns the remote key.
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.snapshot_id, self.id)
    }

    /// Returns true if this is a metadata record.
    pub fn is_metadata(&self) -> bool {
        self.record_kind() == Some(RecordKind::Metadata)
    }

    /// Returns the parse error behind an unreadable placeholder.
    pub fn unreadable_error(&self) -> Option<CodecError> {
        if self.record_kind() != Some(RecordKind::Unreadable) {
            return None;
        }
        let reason = self.fields.get(schema::REASON).and_then(FieldValue::as_text);
        Some(CodecError::unreadable(reason.unwrap_or_default()))
    }

    /// Returns the name of the first field holding a NaN or infinite float.
    ///
    /// Text formats such as JSON cannot carry these values.
    pub fn non_finite_field(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, value)| matches!(value, FieldValue::Float(f) if !f.is_finite()))
            .map(|(name, _)| name.as_str())
    }

    /// Returns the ids listed under `role`, or an empty slice.
    pub fn refs_for(&self, role: &str) -> &[Uuid] {
        self.refs.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the size of this record's CBOR encoding in bytes.
    ///
    /// Used to keep write batches under the remote store's request size.
    pub fn encoded_len(&self) -> CodecResult<usize> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
        Ok(buf.len())
    }

    pub(crate) fn reader(&self) -> FieldReader<'_> {
        FieldReader { record: self }
    }
}

/// Typed access to a record's scalar fields.
pub(crate) struct FieldReader<'a> {
    record: &'a Record,
}

impl<'a> FieldReader<'a> {
    fn value(&self, field: &str) -> Option<&'a FieldValue> {
        self.record.fields.get(field).filter(|v| !v.is_null())
    }

    fn mismatch(field: &str, expected: &'static str, found: &FieldValue) -> CodecError {
        CodecError::TypeMismatch {
            field: field.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    pub(crate) fn opt_text(&self, field: &str) -> CodecResult<Option<String>> {
        match self.value(field) {
            None => Ok(None),
            Some(v) => v
                .as_text()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| Self::mismatch(field, "text", v)),
        }
    }

    pub(crate) fn text(&self, field: &str) -> CodecResult<String> {
        self.opt_text(field)?
            .ok_or_else(|| CodecError::missing(field))
    }

    pub(crate) fn opt_integer(&self, field: &str) -> CodecResult<Option<i64>> {
        match self.value(field) {
            None => Ok(None),
            Some(v) => v
                .as_integer()
                .map(Some)
                .ok_or_else(|| Self::mismatch(field, "integer", v)),
        }
    }

    pub(crate) fn integer(&self, field: &str) -> CodecResult<i64> {
        self.opt_integer(field)?
            .ok_or_else(|| CodecError::missing(field))
    }

    pub(crate) fn opt_float(&self, field: &str) -> CodecResult<Option<f64>> {
        match self.value(field) {
            None => Ok(None),
            Some(v) => v
                .as_float()
                .map(Some)
                .ok_or_else(|| Self::mismatch(field, "float", v)),
        }
    }

    pub(crate) fn float(&self, field: &str) -> CodecResult<f64> {
        self.opt_float(field)?
            .ok_or_else(|| CodecError::missing(field))
    }
}
