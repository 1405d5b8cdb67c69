//! Export command - write a snapshot out in a file format.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use tabsync::{sink, Format, SnapshotStore, TabsyncConfig};

pub fn run(
    config: &TabsyncConfig,
    name: &str,
    output: Option<PathBuf>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SnapshotStore::from_config(config)?;
    let stem = name.strip_suffix(".json").unwrap_or(name);

    let path = match (format, output) {
        (Format::Excel, None) => store.export_to_excel(name, &format!("{}.xlsx", stem))?,
        (Format::Database, _) => {
            return Err("Use 'tabsync sync' to write snapshots into a database".into());
        }
        (format, output) => {
            let path = output
                .unwrap_or_else(|| config.export_dir.join(format!("{}.{}", stem, format.extension())));
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let snapshot = store.load(name)?;
            sink::write_path(&snapshot.to_table(), &path, format)?;
            path
        }
    };

    println!(
        "{} {} -> {}",
        "Exported".green().bold(),
        name.white(),
        path.display()
    );
    Ok(())
}
