//! The JSON snapshot envelope: `{"metadata": {..}, "data": [..]}`.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::{format_date, ColumnSpec, Record, Table};
use crate::error::{Result, TabsyncError};
use crate::merge::MergeStrategy;

/// Envelope format version written into every snapshot.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Metadata block of a snapshot envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created: String,
    pub version: String,
    pub record_count: usize,

    /// Source columns, present on loader-produced snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<MergeStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_records: Option<usize>,

    /// Declared column types, e.g. carried over from a database table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<ColumnSpec>>,

    /// Caller-supplied keys not covered above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SnapshotMetadata {
    fn fresh(record_count: usize) -> Self {
        Self {
            created: timestamp(),
            version: SNAPSHOT_VERSION.to_string(),
            record_count,
            columns: None,
            source: None,
            updated: None,
            merge_strategy: None,
            previous_count: None,
            new_records: None,
            schema: None,
            extra: Map::new(),
        }
    }
}

/// A persisted table plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub data: Vec<Record>,
}

impl Snapshot {
    /// Snapshot of bare records. No column list is recorded.
    pub fn from_records(data: Vec<Record>) -> Self {
        Self {
            metadata: SnapshotMetadata::fresh(data.len()),
            data,
        }
    }

    /// Snapshot of a table, recording its column list.
    pub fn from_table(table: &Table) -> Self {
        let mut snapshot = Self::from_records(table.rows().to_vec());
        snapshot.metadata.columns = Some(table.columns().to_vec());
        snapshot
    }

    /// Rebuild a table. Recorded columns lead, in order, so an empty
    /// snapshot still knows its shape.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(self.metadata.columns.clone().unwrap_or_default());
        for record in &self.data {
            table.push_record(record.clone());
        }
        table
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Overlay caller-supplied metadata. Known keys are type-checked;
    /// `record_count` always tracks the data.
    pub fn apply_extra(&mut self, extra: Map<String, Value>) -> Result<()> {
        if extra.is_empty() {
            return Ok(());
        }
        let mut merged = match serde_json::to_value(&self.metadata)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in extra {
            if key != "record_count" {
                merged.insert(key, value);
            }
        }
        self.metadata = serde_json::from_value(Value::Object(merged)).map_err(|e| {
            TabsyncError::Persistence(format!("Invalid snapshot metadata: {}", e))
        })?;
        self.sync_count();
        Ok(())
    }

    /// Force `record_count` to match `data`.
    pub(crate) fn sync_count(&mut self) {
        self.metadata.record_count = self.data.len();
    }
}

/// Local wall-clock time in ISO-8601.
pub(crate) fn timestamp() -> String {
    format_date(&Local::now().naive_local())
}
