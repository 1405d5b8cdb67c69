//! tabsync: load, reconcile and persist tabular data.
//!
//! Tables arrive as CSV, Excel or JSON, get their column types normalized,
//! optionally have multi-value cells fanned out into rows, and are merged
//! into named JSON snapshots. Every in-place update backs the snapshot up
//! first. Tables can also be written to CSV, Excel, JSON or SQLite.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use tabsync::{Format, Loader, MergeOptions, MergeStrategy, SnapshotStore, Source};
//!
//! let store = SnapshotStore::new("data/json", "data/backups")?;
//! let (table, batch) = Loader::new().load(Source::path(Path::new("tasks.xlsx")), Format::Excel)?;
//!
//! let report = store.update("tasks", table.into_records(), MergeStrategy::Update, &MergeOptions::new())?;
//! println!("{} rows from {} -> {}", batch.row_count, batch.source, report.path.display());
//! # Ok::<(), tabsync::TabsyncError>(())
//! ```

pub mod config;
pub mod convert;
pub mod data;
pub mod error;
pub mod format;
pub mod input;
pub mod merge;
pub mod normalize;
pub mod sink;
pub mod snapshot;
pub mod store;
pub mod transform;

pub use config::TabsyncConfig;
pub use convert::{ConvertOptions, Converter, SyncDirection, SyncStats};
pub use data::{Cell, ColumnSpec, ColumnType, Record, Table};
pub use error::{ErrorKind, Result, TabsyncError};
pub use format::Format;
pub use input::{ImportBatch, Loader, LoaderConfig, Source};
pub use merge::{MergeOptions, MergeOutcome, MergeStrategy, RecordMerger};
pub use normalize::{NormalizeReport, Normalizer};
pub use snapshot::{Snapshot, SnapshotInfo, SnapshotStore};
pub use store::{IfExists, RelationalStore};
pub use transform::{split_comma_separated, RowExpander};
