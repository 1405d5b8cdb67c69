//! Conversion between formats, and database/snapshot synchronization.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::data::Table;
use crate::error::{Result, TabsyncError};
use crate::format::Format;
use crate::input::{Loader, LoaderConfig, Source};
use crate::normalize::Normalizer;
use crate::sink;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::store::{IfExists, RelationalStore};

/// Extra inputs some conversions need.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Database file for `database` endpoints. Falls back to the endpoint path.
    pub db_path: Option<PathBuf>,
    /// Table name for `database` endpoints.
    pub table: Option<String>,
    /// Workbook sheet to read from an `excel` source.
    pub sheet: Option<String>,
    /// Policy when writing into an existing table.
    pub if_exists: IfExists,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            db_path: None,
            table: None,
            sheet: None,
            if_exists: IfExists::Replace,
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn with_if_exists(mut self, policy: IfExists) -> Self {
        self.if_exists = policy;
        self
    }

    fn table_name(&self) -> Result<&str> {
        self.table.as_deref().ok_or_else(|| {
            TabsyncError::Config("database endpoints need a table name".to_string())
        })
    }

    fn database<'a>(&'a self, endpoint: &'a Path) -> &'a Path {
        self.db_path.as_deref().unwrap_or(endpoint)
    }
}

/// Which way [`Converter::sync`] copies data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Database table into the snapshot.
    ToJson,
    /// Snapshot into the database table.
    ToDb,
    /// Database into the snapshot, then back into the table.
    #[default]
    Both,
}

impl FromStr for SyncDirection {
    type Err = TabsyncError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "to_json" => Ok(SyncDirection::ToJson),
            "to_db" => Ok(SyncDirection::ToDb),
            "both" => Ok(SyncDirection::Both),
            other => Err(TabsyncError::Config(format!(
                "unknown sync direction '{}' (use to_json, to_db or both)",
                other
            ))),
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::ToJson => write!(f, "to_json"),
            SyncDirection::ToDb => write!(f, "to_db"),
            SyncDirection::Both => write!(f, "both"),
        }
    }
}

/// Record counts after a sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub json_records: usize,
    pub db_records: usize,
    pub synced: usize,
}

/// Moves tables between files, snapshots and databases.
pub struct Converter {
    loader: LoaderConfig,
}

impl Converter {
    pub fn new() -> Self {
        Self::with_loader_config(LoaderConfig::default())
    }

    pub fn with_loader_config(loader: LoaderConfig) -> Self {
        Self { loader }
    }

    /// Read `source` as `format`.
    pub fn read(&self, source: &Path, format: Format, options: &ConvertOptions) -> Result<Table> {
        match format {
            Format::Database => {
                let table = options.table_name()?;
                RelationalStore::open(options.database(source))?.read_table(table)
            }
            _ => {
                let mut config = self.loader.clone();
                if options.sheet.is_some() {
                    config.sheet = options.sheet.clone();
                }
                // Snapshots carry dates as text; restore them the way sync does.
                if format == Format::Json {
                    config.json_dates_by_name = true;
                }
                let (table, _) = Loader::with_config(config).load(Source::path(source), format)?;
                Ok(table)
            }
        }
    }

    /// Convert `source` into `target`. Returns the number of rows written.
    pub fn convert(
        &self,
        source: &Path,
        target: &Path,
        source_format: Format,
        target_format: Format,
        options: &ConvertOptions,
    ) -> Result<usize> {
        let table = self.read(source, source_format, options)?;

        match target_format {
            Format::Database => {
                let dest = options.table_name()?;
                let mut store = RelationalStore::open(options.database(target))?;
                store.write_table(&table, dest, options.if_exists)?;
            }
            _ => sink::write_path(&table, target, target_format)?,
        }
        let written = table.row_count();

        info!(
            source = %source.display(),
            target = %target.display(),
            from = %source_format,
            to = %target_format,
            rows = written,
            "converted"
        );
        Ok(written)
    }

    /// Snapshot a database table, or the result of `query` when given. The
    /// table's declared columns are kept as schema metadata.
    pub fn database_to_snapshot(
        &self,
        store: &RelationalStore,
        table: &str,
        query: Option<&str>,
    ) -> Result<Snapshot> {
        let data = match query {
            Some(sql) => store.read_query(sql)?,
            None => store.read_table(table)?,
        };
        let schema = store.table_info(table)?;

        let mut snapshot = Snapshot::from_table(&data);
        let mut extra = Map::new();
        extra.insert("source".to_string(), json!("database"));
        extra.insert("database".to_string(), database_name(store.label()));
        extra.insert("table".to_string(), json!(table));
        extra.insert("schema".to_string(), serde_json::to_value(&schema)?);
        snapshot.apply_extra(extra)?;

        debug!(table, records = snapshot.len(), "snapshotted database table");
        Ok(snapshot)
    }

    /// Write a snapshot into a database table. Declared schema types and
    /// date-named columns are restored before writing. Returns the table's
    /// row count afterwards.
    pub fn snapshot_to_database(
        &self,
        snapshot: &Snapshot,
        store: &mut RelationalStore,
        table: &str,
        if_exists: IfExists,
    ) -> Result<usize> {
        let mut data = snapshot.to_table();
        Normalizer::new()
            .with_schema(snapshot.metadata.schema.clone().unwrap_or_default())
            .with_numeric_inference(false)
            .normalize(&mut data);
        store.write_table(&data, table, if_exists)
    }

    /// Synchronize database table `table` with snapshot `name`.
    pub fn sync(
        &self,
        db: &mut RelationalStore,
        table: &str,
        snapshots: &SnapshotStore,
        name: &str,
        direction: SyncDirection,
    ) -> Result<SyncStats> {
        let mut stats = SyncStats::default();
        let mut exported = None;

        if matches!(direction, SyncDirection::ToJson | SyncDirection::Both) {
            let snapshot = self.database_to_snapshot(db, table, None)?;
            snapshots.save_snapshot(&snapshot, name)?;
            stats.json_records = snapshot.metadata.record_count;
            exported = Some(snapshot);
        }

        if matches!(direction, SyncDirection::ToDb | SyncDirection::Both) {
            let snapshot = match exported {
                Some(snapshot) => snapshot,
                None => snapshots.load(name)?,
            };
            stats.db_records = self.snapshot_to_database(&snapshot, db, table, IfExists::Replace)?;
        }

        stats.synced = stats.json_records.max(stats.db_records);
        info!(
            table,
            snapshot = name,
            direction = %direction,
            json_records = stats.json_records,
            db_records = stats.db_records,
            "synced"
        );
        Ok(stats)
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

fn database_name(label: &str) -> Value {
    let name = Path::new(label)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| label.to_string());
    Value::String(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Cell;

    fn people() -> Table {
        Table::from_rows(
            vec!["id".into(), "name".into(), "start_date".into()],
            vec![
                vec![Cell::Integer(1), Cell::text("ada"), Cell::text("2024-01-02")],
                vec![Cell::Integer(2), Cell::text("bo"), Cell::Null],
            ],
        )
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("to-json".parse::<SyncDirection>().unwrap(), SyncDirection::ToJson);
        assert_eq!("TO_DB".parse::<SyncDirection>().unwrap(), SyncDirection::ToDb);
        assert!("sideways".parse::<SyncDirection>().is_err());
    }

    #[test]
    fn test_database_snapshot_carries_schema() {
        let mut store = RelationalStore::open_in_memory().unwrap();
        store.write_table(&people(), "people", IfExists::Fail).unwrap();

        let snapshot = Converter::new().database_to_snapshot(&store, "people", None).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.metadata.source.as_deref(), Some("database"));
        assert_eq!(snapshot.metadata.extra.get("table"), Some(&json!("people")));
        let schema = snapshot.metadata.schema.unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema[0].type_name, "INTEGER");
    }

    #[test]
    fn test_snapshot_to_database_restores_dates() {
        let snapshot = Snapshot::from_table(&people());
        let mut store = RelationalStore::open_in_memory().unwrap();
        let count = Converter::new()
            .snapshot_to_database(&snapshot, &mut store, "people", IfExists::Replace)
            .unwrap();
        assert_eq!(count, 2);

        let info = store.table_info("people").unwrap();
        assert_eq!(info[2].type_name, "TIMESTAMP");
    }

    #[test]
    fn test_json_to_database_matches_sync_types() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("people.json");
        sink::write_json(&people(), &source, None).unwrap();

        let db_path = dir.path().join("people.db");
        let options = ConvertOptions::new().with_table("people");
        Converter::new()
            .convert(&source, &db_path, Format::Json, Format::Database, &options)
            .unwrap();
        let converted = RelationalStore::open(&db_path).unwrap().table_info("people").unwrap();

        let mut synced = RelationalStore::open_in_memory().unwrap();
        Converter::new()
            .snapshot_to_database(&Snapshot::from_table(&people()), &mut synced, "people", IfExists::Replace)
            .unwrap();
        let expected = synced.table_info("people").unwrap();

        let types = |specs: &[crate::data::ColumnSpec]| {
            specs.iter().map(|s| s.type_name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(types(&converted), types(&expected));
        assert_eq!(converted[2].type_name, "TIMESTAMP");
    }

    #[test]
    fn test_database_endpoint_needs_table() {
        let dir = tempfile::tempdir().unwrap();
        let err = Converter::new()
            .read(&dir.path().join("x.db"), Format::Database, &ConvertOptions::new())
            .unwrap_err();
        assert!(matches!(err, TabsyncError::Config(_)));
    }
}
