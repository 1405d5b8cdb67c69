//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tabsync::{Format, IfExists, MergeStrategy, SyncDirection};

/// tabsync: import, merge and snapshot tabular data
#[derive(Parser)]
#[command(name = "tabsync")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Root of the data area (snapshots in <DIR>/json, backups in <DIR>/backups)
    #[arg(long, global = true, env = "TABSYNC_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for workbook exports
    #[arg(long, global = true, default_value = "exports")]
    pub export_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a file and merge it into a snapshot
    Import {
        /// Path to the data file (CSV, Excel or JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Snapshot name (default: file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Source format (default: from extension)
        #[arg(short, long, value_parser = parse_format)]
        format: Option<Format>,

        /// How incoming rows combine with the snapshot
        #[arg(short, long, default_value = "update", value_parser = parse_strategy)]
        strategy: MergeStrategy,

        /// Identifier field for update merges (default: first of id, ID, index, ...)
        #[arg(long)]
        identifier: Option<String>,

        /// Workbook sheet to read
        #[arg(long)]
        sheet: Option<String>,

        /// Split comma-separated values of this column into separate rows
        #[arg(long, value_name = "COLUMN")]
        split: Option<String>,

        /// Numeric column divided evenly across split rows
        #[arg(long, value_name = "COLUMN", requires = "split")]
        distribute: Option<String>,
    },

    /// Write a snapshot out as CSV, Excel or JSON
    Export {
        /// Snapshot name
        #[arg(value_name = "NAME")]
        name: String,

        /// Output path (default: <export-dir>/<NAME>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "excel", value_parser = parse_format)]
        format: Format,
    },

    /// List snapshots with their metadata
    List {
        /// List backups instead of live snapshots
        #[arg(long)]
        backups: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy a backup over a live snapshot
    Restore {
        /// Backup file name
        #[arg(value_name = "BACKUP")]
        backup: String,

        /// Snapshot to restore into
        #[arg(value_name = "TARGET")]
        target: String,
    },

    /// Delete a snapshot
    Delete {
        /// Snapshot name
        #[arg(value_name = "NAME")]
        name: String,

        /// Skip the backup taken before deleting
        #[arg(long)]
        no_backup: bool,
    },

    /// Convert a table between formats
    Convert {
        /// Source file (or database, with --from database)
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Target file (or database, with --to database)
        #[arg(value_name = "TARGET")]
        target: PathBuf,

        /// Source format (default: from extension)
        #[arg(long, value_parser = parse_format)]
        from: Option<Format>,

        /// Target format (default: from extension)
        #[arg(long, value_parser = parse_format)]
        to: Option<Format>,

        /// Table name for database endpoints
        #[arg(short, long)]
        table: Option<String>,

        /// Workbook sheet to read
        #[arg(long)]
        sheet: Option<String>,

        /// Policy when the target table exists
        #[arg(long, default_value = "replace", value_parser = parse_if_exists)]
        if_exists: IfExists,
    },

    /// Synchronize a database table with a snapshot
    Sync {
        /// SQLite database file
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// Table name
        #[arg(value_name = "TABLE")]
        table: String,

        /// Snapshot name (default: table name)
        #[arg(short, long)]
        name: Option<String>,

        /// Direction: to_json, to_db or both
        #[arg(short, long, default_value = "both", value_parser = parse_direction)]
        direction: SyncDirection,
    },

    /// List the sheets of a workbook
    Sheets {
        /// Path to the workbook
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn parse_format(s: &str) -> Result<Format, String> {
    s.parse().map_err(|e: tabsync::TabsyncError| e.to_string())
}

fn parse_strategy(s: &str) -> Result<MergeStrategy, String> {
    s.parse().map_err(|e: tabsync::TabsyncError| e.to_string())
}

fn parse_if_exists(s: &str) -> Result<IfExists, String> {
    s.parse().map_err(|e: tabsync::TabsyncError| e.to_string())
}

fn parse_direction(s: &str) -> Result<SyncDirection, String> {
    s.parse().map_err(|e: tabsync::TabsyncError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_import_args() {
        let cli = Cli::try_parse_from([
            "tabsync", "import", "tasks.xlsx", "--strategy", "append", "--split", "owner",
            "--distribute", "hours", "--data-dir", "/tmp/d",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, PathBuf::from("/tmp/d"));
        match cli.command {
            Commands::Import {
                strategy,
                split,
                distribute,
                ..
            } => {
                assert_eq!(strategy, MergeStrategy::Append);
                assert_eq!(split.as_deref(), Some("owner"));
                assert_eq!(distribute.as_deref(), Some("hours"));
            }
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn test_bad_strategy_rejected() {
        assert!(Cli::try_parse_from(["tabsync", "import", "a.csv", "-s", "upsert"]).is_err());
    }
}
