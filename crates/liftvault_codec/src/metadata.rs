//! The per-snapshot metadata record.

use liftvault_model::{EntityCounts, EntityKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CodecError, CodecResult};
use crate::record::{Record, RecordKind, SnapshotHeader};
use crate::schema;

/// Summary data stored once per snapshot.
///
/// Its presence in the remote store marks a snapshot as complete and
/// listable. Counts are precomputed at backup time so listing never has to
/// fetch entity records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Snapshot id (also the metadata record's id).
    pub snapshot_id: Uuid,
    /// Name of the device that wrote the snapshot.
    pub device_name: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Entity counts at backup time.
    pub counts: EntityCounts,
    /// Snapshot format version.
    pub format_version: i64,
    /// Version of the application that wrote the snapshot.
    pub app_version: String,
}

impl SnapshotMetadata {
    /// Creates metadata for a new snapshot at the current format version.
    pub fn new(
        header: &SnapshotHeader,
        device_name: impl Into<String>,
        counts: EntityCounts,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            snapshot_id: header.snapshot_id,
            device_name: device_name.into(),
            created_at: header.created_at,
            counts,
            format_version: schema::FORMAT_VERSION,
            app_version: app_version.into(),
        }
    }

    /// Encodes this metadata as a record.
    pub fn to_record(&self) -> Record {
        let header = SnapshotHeader::new(self.snapshot_id, self.created_at);
        Record::new(self.snapshot_id, RecordKind::Metadata, &header)
            .with_field(schema::DEVICE_NAME, self.device_name.as_str())
            .with_field(schema::TIMESTAMP, self.created_at)
            .with_field(schema::FORMAT, self.format_version)
            .with_field(schema::APP_VERSION, self.app_version.as_str())
            .with_field(schema::WORKOUT_COUNT, self.counts.workouts)
            .with_field(schema::CATEGORY_COUNT, self.counts.categories)
            .with_field(schema::SUBCATEGORY_COUNT, self.counts.subcategories)
            .with_field(schema::EXERCISE_COUNT, self.counts.exercises)
            .with_field(schema::TEMPLATE_COUNT, self.counts.templates)
    }

    /// Decodes metadata from a record.
    ///
    /// Missing counts default to zero; a snapshot written before a kind
    /// existed simply holds none of it.
    pub fn from_record(record: &Record) -> CodecResult<Self> {
        if let Some(e) = record.unreadable_error() {
            return Err(e);
        }
        if !record.is_metadata() {
            return Err(CodecError::UnexpectedKind {
                kind: record.kind.clone(),
            });
        }

        let reader = record.reader();
        let created_at = non_negative(schema::TIMESTAMP, reader.integer(schema::TIMESTAMP)?)?;

        let mut counts = EntityCounts::default();
        for (kind, field) in [
            (EntityKind::Workout, schema::WORKOUT_COUNT),
            (EntityKind::Category, schema::CATEGORY_COUNT),
            (EntityKind::Subcategory, schema::SUBCATEGORY_COUNT),
            (EntityKind::Exercise, schema::EXERCISE_COUNT),
            (EntityKind::StrengthTemplate, schema::TEMPLATE_COUNT),
        ] {
            let count = reader.opt_integer(field)?.unwrap_or(0);
            counts.set(kind, non_negative(field, count)?);
        }

        Ok(Self {
            snapshot_id: record.snapshot_id,
            device_name: reader
                .opt_text(schema::DEVICE_NAME)?
                .unwrap_or_else(|| "unknown device".to_string()),
            created_at,
            counts,
            format_version: reader.opt_integer(schema::FORMAT)?.unwrap_or(1),
            app_version: reader.opt_text(schema::APP_VERSION)?.unwrap_or_default(),
        })
    }
}

fn non_negative(field: &str, value: i64) -> CodecResult<u64> {
    u64::try_from(value).map_err(|_| CodecError::invalid(field, "must not be negative"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    fn sample() -> SnapshotMetadata {
        let counts = EntityCounts {
            workouts: 3,
            categories: 2,
            subcategories: 1,
            exercises: 0,
            templates: 4,
        };
        SnapshotMetadata::new(
            &SnapshotHeader::new(Uuid::new_v4(), 1_700_000_000_000),
            "Pixel 8",
            counts,
            "2.3.0",
        )
    }

    #[test]
    fn record_uses_snapshot_id() {
        let meta = sample();
        let record = meta.to_record();
        assert_eq!(record.id, meta.snapshot_id);
        assert_eq!(record.snapshot_id, meta.snapshot_id);
        assert!(record.is_metadata());
        assert_eq!(SnapshotMetadata::from_record(&record).unwrap(), meta);
    }

    #[test]
    fn unreadable_metadata_keeps_its_parse_error() {
        let id = Uuid::new_v4();
        let record = Record::unreadable(crate::RecordKey::new(id, id), "trailing comma");
        assert_eq!(
            SnapshotMetadata::from_record(&record),
            Err(CodecError::unreadable("trailing comma"))
        );
    }

    #[test]
    fn missing_counts_default_to_zero() {
        let mut record = sample().to_record();
        record.fields.remove("templateCount");
        let meta = SnapshotMetadata::from_record(&record).unwrap();
        assert_eq!(meta.counts.templates, 0);
        assert_eq!(meta.counts.workouts, 3);
    }

    #[test]
    fn negative_timestamp_is_invalid() {
        let mut record = sample().to_record();
        record
            .fields
            .insert("timestamp".into(), FieldValue::Integer(-5));
        assert!(matches!(
            SnapshotMetadata::from_record(&record),
            Err(CodecError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_entity_records() {
        let header = SnapshotHeader::new(Uuid::new_v4(), 0);
        let record = Record::new(Uuid::new_v4(), RecordKind::Workout, &header);
        assert!(matches!(
            SnapshotMetadata::from_record(&record),
            Err(CodecError::UnexpectedKind { .. })
        ));
    }
}
