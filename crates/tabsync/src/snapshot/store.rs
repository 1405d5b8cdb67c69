//! File-backed snapshot store with timestamped backups.
//!
//! Layout:
//! ```text
//! data/
//! ├── json/
//! │   └── tasks.json                   # live snapshot
//! └── backups/
//!     └── tasks_20240301_101500.json   # copy taken before an update
//! ```
//!
//! There is no locking. Concurrent writers to one name race and the last
//! rename wins.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::TabsyncConfig;
use crate::data::{Record, Table};
use crate::error::{Result, TabsyncError};
use crate::merge::{records_from_value, MergeOptions, MergeOutcome, MergeStrategy, RecordMerger};
use crate::sink::{write_envelope, write_excel};

use super::envelope::{timestamp, Snapshot};

/// Placeholder for metadata that could not be read.
pub const UNKNOWN: &str = "Unknown";

/// One entry of a snapshot or backup listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotInfo {
    pub filename: String,
    pub size: u64,
    /// Last modification time, ISO-8601.
    pub modified: String,
    pub record_count: String,
    pub version: String,
    pub created: String,
}

/// What [`SnapshotStore::update`] did.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    /// Path of the rewritten snapshot.
    pub path: PathBuf,
    /// Backup taken first, if the snapshot already existed.
    pub backup: Option<PathBuf>,
    pub outcome: MergeOutcome,
}

/// Named JSON snapshots in one directory, backups in another.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    json_dir: PathBuf,
    backup_dir: PathBuf,
    export_dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store, creating both directories if needed.
    pub fn new(json_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            json_dir: json_dir.into(),
            backup_dir: backup_dir.into(),
            export_dir: PathBuf::from("exports"),
        };
        ensure_dir(&store.json_dir)?;
        ensure_dir(&store.backup_dir)?;
        Ok(store)
    }

    /// Open the store laid out by `config`.
    pub fn from_config(config: &TabsyncConfig) -> Result<Self> {
        Ok(Self::new(&config.snapshot_dir, &config.backup_dir)?.with_export_dir(&config.export_dir))
    }

    /// Directory that [`export_to_excel`](Self::export_to_excel) writes into.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn json_dir(&self) -> &Path {
        &self.json_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Path of the live snapshot `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.json_dir.join(json_name(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Save `table` as snapshot `name`, overlaying `extra` metadata.
    pub fn save(
        &self,
        table: &Table,
        name: &str,
        extra: Option<Map<String, Value>>,
    ) -> Result<PathBuf> {
        let mut snapshot = Snapshot::from_table(table);
        if let Some(extra) = extra {
            snapshot.apply_extra(extra)?;
        }
        self.save_snapshot(&snapshot, name)
    }

    /// Save bare records as snapshot `name`.
    pub fn save_records(&self, records: Vec<Record>, name: &str) -> Result<PathBuf> {
        self.save_snapshot(&Snapshot::from_records(records), name)
    }

    /// Write a prepared snapshot. `record_count` is corrected to the data length.
    pub fn save_snapshot(&self, snapshot: &Snapshot, name: &str) -> Result<PathBuf> {
        let path = self.path_for(name);
        if snapshot.metadata.record_count == snapshot.len() {
            write_envelope(snapshot, &path)?;
        } else {
            let mut fixed = snapshot.clone();
            fixed.sync_count();
            write_envelope(&fixed, &path)?;
        }
        info!(path = %path.display(), records = snapshot.len(), "saved snapshot");
        Ok(path)
    }

    /// Load snapshot `name`.
    pub fn load(&self, name: &str) -> Result<Snapshot> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(TabsyncError::SnapshotNotFound(json_name(name)));
        }
        let snapshot = read_snapshot(&path)?;
        debug!(path = %path.display(), records = snapshot.len(), "loaded snapshot");
        Ok(snapshot)
    }

    /// Merge `incoming` into snapshot `name` and save the result.
    ///
    /// An existing snapshot is backed up first. The original `created` stamp
    /// is kept and the merge is recorded in the metadata. A missing snapshot
    /// is simply created from `incoming`.
    pub fn update(
        &self,
        name: &str,
        incoming: Vec<Record>,
        strategy: MergeStrategy,
        options: &MergeOptions,
    ) -> Result<UpdateReport> {
        let merger = RecordMerger::with_options(options.clone());

        if !self.exists(name) {
            let outcome = merger.merge(Vec::new(), incoming, strategy);
            let table = Table::from_records(outcome.records.clone());
            let path = self.save_snapshot(&Snapshot::from_table(&table), name)?;
            return Ok(UpdateReport {
                path,
                backup: None,
                outcome,
            });
        }

        let backup = self.backup(name)?;
        let existing = self.load(name)?;
        let had_columns = existing.metadata.columns.is_some();
        let mut metadata = existing.metadata;

        let outcome = merger.merge(existing.data, incoming, strategy);
        for warning in &outcome.warnings {
            debug!(snapshot = name, "{}", warning.message());
        }

        metadata.updated = Some(timestamp());
        metadata.merge_strategy = Some(strategy);
        metadata.previous_count = Some(outcome.previous_count);
        metadata.new_records = Some(outcome.incoming_count);
        if had_columns {
            metadata.columns = Some(Table::from_records(outcome.records.clone()).columns().to_vec());
        }

        let mut snapshot = Snapshot {
            metadata,
            data: outcome.records.clone(),
        };
        snapshot.sync_count();
        let path = self.save_snapshot(&snapshot, name)?;

        Ok(UpdateReport {
            path,
            backup: Some(backup),
            outcome,
        })
    }

    /// [`update`](Self::update) with an arbitrary JSON value as incoming data.
    pub fn update_value(
        &self,
        name: &str,
        incoming: Value,
        strategy: MergeStrategy,
        options: &MergeOptions,
    ) -> Result<UpdateReport> {
        let incoming = records_from_value(incoming)?;
        self.update(name, incoming, strategy, options)
    }

    /// Copy snapshot `name` to `<stem>_<YYYYmmdd_HHMMSS>.json` in the backup
    /// area. Existing backups are never overwritten.
    pub fn backup(&self, name: &str) -> Result<PathBuf> {
        let source = self.path_for(name);
        if !source.is_file() {
            return Err(TabsyncError::SnapshotNotFound(json_name(name)));
        }
        ensure_dir(&self.backup_dir)?;

        let stem = stem(name);
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut target = self.backup_dir.join(format!("{}_{}.json", stem, stamp));
        let mut n = 1;
        while target.exists() {
            target = self.backup_dir.join(format!("{}_{}_{}.json", stem, stamp, n));
            n += 1;
        }

        fs::copy(&source, &target).map_err(|e| {
            TabsyncError::Persistence(format!(
                "Failed to back up '{}' to '{}': {}",
                source.display(),
                target.display(),
                e
            ))
        })?;
        info!(snapshot = %source.display(), backup = %target.display(), "created backup");
        Ok(target)
    }

    /// All live snapshots, newest modification first.
    pub fn list(&self) -> Result<Vec<SnapshotInfo>> {
        list_dir(&self.json_dir)
    }

    /// All backups, newest modification first.
    pub fn list_backups(&self) -> Result<Vec<SnapshotInfo>> {
        list_dir(&self.backup_dir)
    }

    /// Copy backup `backup` over (or into) live snapshot `target`.
    pub fn restore(&self, backup: &str, target: &str) -> Result<PathBuf> {
        let source = self.backup_dir.join(json_name(backup));
        if !source.is_file() {
            return Err(TabsyncError::SnapshotNotFound(format!(
                "backup {}",
                json_name(backup)
            )));
        }
        ensure_dir(&self.json_dir)?;

        let dest = self.path_for(target);
        fs::copy(&source, &dest).map_err(|e| {
            TabsyncError::Persistence(format!(
                "Failed to restore '{}' to '{}': {}",
                source.display(),
                dest.display(),
                e
            ))
        })?;
        info!(backup = %source.display(), snapshot = %dest.display(), "restored backup");
        Ok(dest)
    }

    /// Remove snapshot `name`, backing it up first when asked.
    /// Returns `false` when there was nothing to delete.
    pub fn delete(&self, name: &str, create_backup: bool) -> Result<bool> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Ok(false);
        }
        if create_backup {
            self.backup(name)?;
        }
        fs::remove_file(&path).map_err(|e| TabsyncError::io(&path, e))?;
        info!(path = %path.display(), "deleted snapshot");
        Ok(true)
    }

    /// Write snapshot `name` as a workbook named `file_name` in the export
    /// directory.
    pub fn export_to_excel(&self, name: &str, file_name: &str) -> Result<PathBuf> {
        let snapshot = self.load(name)?;
        if snapshot.is_empty() {
            return Err(TabsyncError::EmptyData(format!(
                "snapshot {} has no records to export",
                json_name(name)
            )));
        }

        ensure_dir(&self.export_dir)?;
        let path = self.export_dir.join(file_name);
        write_excel(&snapshot.to_table(), &path, None)?;
        info!(snapshot = name, path = %path.display(), "exported snapshot to workbook");
        Ok(path)
    }
}

/// Read and parse one envelope file.
fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let file = File::open(path).map_err(|e| TabsyncError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| TabsyncError::unreadable(path.display().to_string(), e))
}

fn list_dir(dir: &Path) -> Result<Vec<SnapshotInfo>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| TabsyncError::io(dir, e))?;
    let mut files: Vec<(SystemTime, SnapshotInfo)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| {
            let stat = fs::metadata(&path).ok()?;
            let modified = stat.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, describe(&path, stat.len(), modified)))
        })
        .collect();

    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.filename.cmp(&a.1.filename)));
    Ok(files.into_iter().map(|(_, info)| info).collect())
}

fn describe(path: &Path, size: u64, modified: SystemTime) -> SnapshotInfo {
    let metadata = match read_metadata(path) {
        Some(metadata) => metadata,
        None => {
            warn!(path = %path.display(), "snapshot metadata unreadable");
            Map::new()
        }
    };

    let field = |key: &str| match metadata.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => UNKNOWN.to_string(),
        Some(other) => other.to_string(),
    };

    SnapshotInfo {
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size,
        modified: DateTime::<Local>::from(modified)
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string(),
        record_count: field("record_count"),
        version: field("version"),
        created: field("created"),
    }
}

/// The raw `metadata` object, without insisting on the full envelope shape.
fn read_metadata(path: &Path) -> Option<Map<String, Value>> {
    let file = File::open(path).ok()?;
    let value: Value = serde_json::from_reader(BufReader::new(file)).ok()?;
    match value {
        Value::Object(mut obj) => match obj.remove("metadata") {
            Some(Value::Object(metadata)) => Some(metadata),
            _ => Some(Map::new()),
        },
        _ => Some(Map::new()),
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            TabsyncError::Persistence(format!(
                "Failed to create directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
    }
    Ok(())
}

/// `name` with a `.json` extension.
fn json_name(name: &str) -> String {
    if name.ends_with(".json") {
        name.to_string()
    } else {
        format!("{}.json", name)
    }
}

fn stem(name: &str) -> &str {
    name.strip_suffix(".json").unwrap_or(name)
}
