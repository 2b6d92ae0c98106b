use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wl_cli::commands::{day, days, run, sessions, status, today, week};
use wl_cli::{Cli, Commands, Config};
use wl_core::Calendar;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(wl_db::Database, Config)> {
    let config = load_config(config_path)?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = wl_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so --json output stays parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let mut stdout = io::stdout().lock();
    let calendar = Calendar::local();
    let now = Utc::now();

    match &cli.command {
        Some(Commands::Run) => {
            let config = load_config(cli.config.as_deref())?;
            run::run(&mut stdout, &config)?;
        }
        Some(Commands::Status { json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, &config, &calendar, now, *json)?;
        }
        Some(Commands::Today { json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            today::run(&mut stdout, &db, calendar, now, *json)?;
        }
        Some(Commands::Week { offset, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let week_start = config
                .week_start()
                .with_context(|| format!("invalid week_start {:?}", config.week_start))?;
            week::run(&mut stdout, &db, calendar, week_start, now, *offset, *json)?;
        }
        Some(Commands::Sessions {
            paging,
            active,
            date,
            json,
        }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            sessions::run(
                &mut stdout,
                &db,
                calendar,
                *paging,
                *active,
                date.as_deref(),
                *json,
            )?;
        }
        Some(Commands::Days { paging, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            days::run(&mut stdout, &db, calendar, *paging, *json)?;
        }
        Some(Commands::Day { date, paging, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            day::run(&mut stdout, &db, calendar, date, *paging, *json)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
