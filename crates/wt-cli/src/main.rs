use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt_cli::commands::{cache, series, timeline, util};
use wt_cli::{CacheAction, Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout stays parseable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(grammar) = cli.grammar {
        config.grammar = grammar;
    }
    tracing::debug!(?config, "loaded configuration");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command {
        Commands::Timeline(args) => timeline::run(&config, args, &mut out)?,
        Commands::Series(args) => series::run(&config, args, &mut out)?,
        Commands::Cache(action) => {
            let db = util::open_database(&config)?;
            match action {
                CacheAction::List { json } => cache::list(&db, *json, &mut out)?,
                CacheAction::Set {
                    key,
                    total,
                    minutes,
                } => cache::set(&db, key, *total, *minutes, &mut out)?,
            }
        }
    }

    Ok(())
}
