//! Workspace configuration: where snapshots, backups and exports live.

use std::path::{Path, PathBuf};

use crate::input::LoaderConfig;
use crate::merge::MergeOptions;

/// Default root of the data area.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Configuration shared by the store, loader and merger.
#[derive(Debug, Clone)]
pub struct TabsyncConfig {
    /// Root of the data area.
    pub data_dir: PathBuf,
    /// Live snapshots. Defaults to `<data_dir>/json`.
    pub snapshot_dir: PathBuf,
    /// Backups. Defaults to `<data_dir>/backups`.
    pub backup_dir: PathBuf,
    /// Workbook exports.
    pub export_dir: PathBuf,
    /// Loader configuration.
    pub loader: LoaderConfig,
    /// Merge options.
    pub merge: MergeOptions,
}

impl Default for TabsyncConfig {
    fn default() -> Self {
        Self::with_data_dir(DEFAULT_DATA_DIR)
    }
}

impl TabsyncConfig {
    /// Lay the snapshot and backup areas out under `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            snapshot_dir: data_dir.join("json"),
            backup_dir: data_dir.join("backups"),
            export_dir: PathBuf::from("exports"),
            data_dir,
            loader: LoaderConfig::default(),
            merge: MergeOptions::default(),
        }
    }

    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_merge(mut self, merge: MergeOptions) -> Self {
        self.merge = merge;
        self
    }
}
