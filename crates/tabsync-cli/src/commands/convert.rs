//! Convert and sync commands.

use std::path::PathBuf;

use colored::Colorize;
use tabsync::{
    ConvertOptions, Converter, Format, IfExists, RelationalStore, SnapshotStore, SyncDirection,
    TabsyncConfig,
};

use super::resolve_format;

pub struct ConvertArgs {
    pub source: PathBuf,
    pub target: PathBuf,
    pub from: Option<Format>,
    pub to: Option<Format>,
    pub table: Option<String>,
    pub sheet: Option<String>,
    pub if_exists: IfExists,
}

pub fn run(config: &TabsyncConfig, args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let from = resolve_format(args.from, &args.source)?;
    let to = resolve_format(args.to, &args.target)?;

    let mut options = ConvertOptions::new().with_if_exists(args.if_exists);
    if let Some(table) = args.table {
        options = options.with_table(table);
    }
    if let Some(sheet) = args.sheet {
        options = options.with_sheet(sheet);
    }

    let converter = Converter::with_loader_config(config.loader.clone());
    let rows = converter.convert(&args.source, &args.target, from, to, &options)?;

    println!(
        "{} {} ({}) -> {} ({}): {} rows",
        "Converted".green().bold(),
        args.source.display(),
        from,
        args.target.display(),
        to,
        rows.to_string().white().bold()
    );
    Ok(())
}

pub fn sync(
    config: &TabsyncConfig,
    database: PathBuf,
    table: &str,
    name: Option<String>,
    direction: SyncDirection,
) -> Result<(), Box<dyn std::error::Error>> {
    let name = name.unwrap_or_else(|| table.to_string());
    let store = SnapshotStore::from_config(config)?;
    let mut db = RelationalStore::open(&database)?;

    let stats = Converter::with_loader_config(config.loader.clone())
        .sync(&mut db, table, &store, &name, direction)?;

    println!(
        "{} {}:{} <-> {} ({})",
        "Synced".green().bold(),
        database.display(),
        table.white(),
        name.white(),
        direction
    );
    println!("  Snapshot records: {}", stats.json_records);
    println!("  Table rows:       {}", stats.db_records);
    println!("  Synced:           {}", stats.synced.to_string().green());
    Ok(())
}
