//! tabsync CLI - import, merge and snapshot tabular data.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tabsync::TabsyncConfig;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = TabsyncConfig::with_data_dir(&cli.data_dir).with_export_dir(&cli.export_dir);

    let result = match cli.command {
        Commands::Import {
            file,
            name,
            format,
            strategy,
            identifier,
            sheet,
            split,
            distribute,
        } => commands::import::run(
            &config,
            commands::import::ImportArgs {
                file,
                name,
                format,
                strategy,
                identifier,
                sheet,
                split,
                distribute,
            },
        ),

        Commands::Export {
            name,
            output,
            format,
        } => commands::export::run(&config, &name, output, format),

        Commands::List { backups, json } => commands::list::run(&config, backups, json),

        Commands::Restore { backup, target } => commands::restore::run(&config, &backup, &target),

        Commands::Delete { name, no_backup } => commands::restore::delete(&config, &name, !no_backup),

        Commands::Convert {
            source,
            target,
            from,
            to,
            table,
            sheet,
            if_exists,
        } => commands::convert::run(
            &config,
            commands::convert::ConvertArgs {
                source,
                target,
                from,
                to,
                table,
                sheet,
                if_exists,
            },
        ),

        Commands::Sync {
            database,
            table,
            name,
            direction,
        } => commands::convert::sync(&config, database, &table, name, direction),

        Commands::Sheets { file } => commands::import::sheets(&config, file),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
