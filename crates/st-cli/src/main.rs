use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use st_cli::commands::{report, sessions, status, subjects, timer};
use st_cli::{Cli, Commands, Config, SessionsAction, SubjectsAction};
use st_core::Tracker;

/// Load config and open the tracker, ensuring the database directory exists.
fn open_tracker(config_path: Option<&Path>) -> Result<(Tracker<st_db::Database>, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = st_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;
    Ok((Tracker::open(db), config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut tracker, config) = open_tracker(cli.config.as_deref())?;
    let mut stdout = std::io::stdout();

    match command {
        Commands::Status => status::run(&mut stdout, &tracker, &config.database_path)?,
        Commands::Subjects(action) => match action {
            SubjectsAction::Add { name } => subjects::add(&mut stdout, &mut tracker, &name)?,
            SubjectsAction::List { json } => subjects::list(&mut stdout, &tracker, json)?,
        },
        Commands::Sessions(action) => match action {
            SessionsAction::List { json } => sessions::list(&mut stdout, &tracker, json)?,
            SessionsAction::Show { number } => sessions::show(&mut stdout, &tracker, number)?,
        },
        Commands::Report { window, json } => {
            let selector = window.unwrap_or_else(|| config.default_window.clone());
            report::run(&mut stdout, &tracker, &selector, json)?;
        }
        Commands::Timer(args) => timer::run(&mut tracker, args)?,
    }

    Ok(())
}
