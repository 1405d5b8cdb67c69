//! List command - show snapshots or backups with their metadata.

use colored::Colorize;
use tabsync::snapshot::UNKNOWN;
use tabsync::{SnapshotStore, TabsyncConfig};

pub fn run(
    config: &TabsyncConfig,
    backups: bool,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SnapshotStore::from_config(config)?;
    let entries = if backups {
        store.list_backups()?
    } else {
        store.list()?
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let (title, dir) = if backups {
        ("Backups in", store.backup_dir())
    } else {
        ("Snapshots in", store.json_dir())
    };
    println!("{} {}", title.cyan().bold(), dir.display().to_string().white());
    println!();

    if entries.is_empty() {
        println!("  {}", "(none)".dimmed());
        return Ok(());
    }

    for entry in &entries {
        let records = if entry.record_count == UNKNOWN {
            entry.record_count.red().to_string()
        } else {
            entry.record_count.white().bold().to_string()
        };
        println!(
            "  {:<40} {:>8} records  {:>10} bytes  modified {}",
            entry.filename, records, entry.size, entry.modified
        );
        if !backups {
            println!(
                "  {:<40} version {}  created {}",
                "",
                entry.version.dimmed(),
                entry.created.dimmed()
            );
        }
    }

    println!();
    println!("{} {}", "Total:".yellow().bold(), entries.len());
    Ok(())
}
