//! Restore and delete commands.

use colored::Colorize;
use tabsync::{SnapshotStore, TabsyncConfig};

pub fn run(
    config: &TabsyncConfig,
    backup: &str,
    target: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SnapshotStore::from_config(config)?;
    let path = store.restore(backup, target)?;

    println!(
        "{} {} -> {}",
        "Restored".green().bold(),
        backup.white(),
        path.display()
    );
    Ok(())
}

pub fn delete(
    config: &TabsyncConfig,
    name: &str,
    create_backup: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SnapshotStore::from_config(config)?;

    if store.delete(name, create_backup)? {
        println!("{} {}", "Deleted".green().bold(), name.white());
        if create_backup {
            println!("  Backup kept in {}", store.backup_dir().display());
        }
    } else {
        println!("{} {}", "Nothing to delete:".yellow(), name);
    }
    Ok(())
}
