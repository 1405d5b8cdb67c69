//! Import command - load a file, optionally split rows, merge into a snapshot.

use std::path::PathBuf;

use colored::Colorize;
use tabsync::merge::MergeWarning;
use tabsync::{
    Loader, MergeOptions, MergeStrategy, RowExpander, SnapshotStore, Source, TabsyncConfig,
};

use super::resolve_format;

pub struct ImportArgs {
    pub file: PathBuf,
    pub name: Option<String>,
    pub format: Option<tabsync::Format>,
    pub strategy: MergeStrategy,
    pub identifier: Option<String>,
    pub sheet: Option<String>,
    pub split: Option<String>,
    pub distribute: Option<String>,
}

pub fn run(config: &TabsyncConfig, args: ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let format = resolve_format(args.format, &args.file)?;
    let name = match args.name {
        Some(name) => name,
        None => args
            .file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or("Cannot derive a snapshot name from the file; pass --name")?,
    };

    println!(
        "{} {}",
        "Importing".cyan().bold(),
        args.file.display().to_string().white()
    );

    let mut loader_config = config.loader.clone();
    if args.sheet.is_some() {
        loader_config.sheet = args.sheet;
    }
    let (mut table, batch) =
        Loader::with_config(loader_config).load(Source::path(&args.file), format)?;

    println!(
        "  Loaded {} rows, {} columns ({})",
        batch.row_count.to_string().white().bold(),
        batch.column_count,
        batch.format
    );

    if let Some(column) = &args.split {
        let mut expander = RowExpander::new(column);
        if let Some(distribute) = &args.distribute {
            expander = expander.with_distribute(distribute);
        }
        let result = expander.apply(&table);
        println!(
            "  Split {} rows on '{}' (+{} rows)",
            result.rows_split.to_string().white().bold(),
            column,
            result.rows_added
        );
        table = result.table;
    }

    let mut options: MergeOptions = config.merge.clone();
    if let Some(identifier) = args.identifier {
        options = options.with_identifier(identifier);
    }

    let store = SnapshotStore::from_config(config)?;
    let report = store.update(&name, table.into_records(), args.strategy, &options)?;
    let outcome = &report.outcome;

    if let Some(backup) = &report.backup {
        println!("  Backup: {}", backup.display().to_string().dimmed());
    }

    for warning in &outcome.warnings {
        let line = warning.message();
        match warning {
            MergeWarning::IdentifierNotFound { .. } => println!("  {} {}", "!".yellow(), line.yellow()),
            _ => println!("  {} {}", "!".yellow(), line),
        }
    }

    println!();
    println!(
        "{} {} ({}): {} -> {} records",
        "Saved".green().bold(),
        name.white().bold(),
        outcome.strategy,
        outcome.previous_count,
        outcome.records.len().to_string().green()
    );
    if let Some(identifier) = &outcome.identifier {
        println!(
            "  Matched on '{}': {} updated, {} inserted",
            identifier, outcome.updated, outcome.inserted
        );
    }
    println!("  {}", report.path.display());

    Ok(())
}

/// List the sheets of a workbook.
pub fn sheets(config: &TabsyncConfig, file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let names = Loader::with_config(config.loader.clone()).sheet_names(Source::path(&file))?;

    println!("{} {}", "Sheets in".cyan().bold(), file.display().to_string().white());
    for (i, name) in names.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }
    Ok(())
}
