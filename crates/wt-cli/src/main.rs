use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt_cli::commands::{agent, export, reclassify, report, settings, status};
use wt_cli::{Cli, Commands, Config, SettingsAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(wt_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = wt_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Run {
            interval,
            idle_threshold,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let agent_config = agent::AgentConfig::resolve(&config, *interval, *idle_threshold)?;
            agent::run(&mut db, agent_config)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let today = Local::now().date_naive();
            status::run(&mut std::io::stdout(), &db, &config.database_path, today)?;
        }
        Some(Commands::Report { range, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            report::run(&db, range.period(), *json)?;
        }
        Some(Commands::Export {
            period,
            format,
            aggregated,
            output,
        }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            export::run(&db, *period, *format, *aggregated, output.as_deref())?;
        }
        Some(Commands::Reclassify) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            reclassify::run(&mut db)?;
        }
        Some(Commands::Settings(action)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let mut stdout = std::io::stdout();
            match action {
                SettingsAction::List => settings::list(&mut stdout, &db)?,
                SettingsAction::Get { key } => settings::get(&mut stdout, &db, key)?,
                SettingsAction::Set { key, value } => settings::set(&mut db, key, value)?,
            }
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
