//! JSON output: the snapshot envelope.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::data::Table;
use crate::error::{Result, TabsyncError};
use crate::snapshot::Snapshot;

/// Render `table` as a pretty-printed envelope, overlaying `extra` metadata.
pub fn to_json_string(table: &Table, extra: Option<Map<String, Value>>) -> Result<String> {
    let snapshot = envelope(table, extra)?;
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

/// Write `table` as an envelope to `path`.
pub fn write_json(
    table: &Table,
    path: impl AsRef<Path>,
    extra: Option<Map<String, Value>>,
) -> Result<()> {
    let snapshot = envelope(table, extra)?;
    write_envelope(&snapshot, path.as_ref())
}

fn envelope(table: &Table, extra: Option<Map<String, Value>>) -> Result<Snapshot> {
    let mut snapshot = Snapshot::from_table(table);
    if let Some(extra) = extra {
        snapshot.apply_extra(extra)?;
    }
    Ok(snapshot)
}

/// Write a snapshot through a sibling temp file, then rename it into place.
pub(crate) fn write_envelope(snapshot: &Snapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                TabsyncError::Persistence(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let tmp = temp_path(path);
    let file = File::create(&tmp).map_err(|e| {
        TabsyncError::Persistence(format!("Failed to create file '{}': {}", tmp.display(), e))
    })?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)
        .map_err(|e| TabsyncError::Persistence(format!("Failed to serialize snapshot: {}", e)))?;
    writer
        .flush()
        .map_err(|e| TabsyncError::Persistence(format!("Failed to write '{}': {}", tmp.display(), e)))?;
    drop(writer);

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        TabsyncError::Persistence(format!(
            "Failed to move snapshot into '{}': {}",
            path.display(),
            e
        ))
    })?;

    debug!(path = %path.display(), records = snapshot.len(), "wrote snapshot envelope");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
