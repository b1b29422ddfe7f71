//! dentaflow-admin — administrative surface for the clinic database.
//!
//! The backfill is invocable standalone and idempotent; its per-step row
//! counts print as JSON so an operator can verify completion (and spot a
//! suspicious zero) before trusting the tightened schema.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dentaflow::backfill::run_backfill;
use dentaflow::config::{SeedConfig, APP_NAME, APP_VERSION};
use dentaflow::db::repository::check_tenant_consistency;
use dentaflow::db::sqlite::open_database;
use dentaflow::directory::seed_directories;

#[derive(Parser, Debug)]
#[command(name = "dentaflow-admin")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the clinic SQLite database
    #[arg(short, long)]
    db: PathBuf,

    /// Path to a seed config JSON file (offices, roster, default office)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create-if-absent the configured offices and staff roster
    Seed,

    /// Run the tenancy backfill and print the per-step report as JSON
    Backfill,

    /// Sweep for tenancy invariant violations and print the report
    Check,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("{APP_NAME} admin v{APP_VERSION}");

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => SeedConfig::from_json_file(path)?,
        None => SeedConfig::default(),
    };
    let mut conn = open_database(&cli.db)?;

    match cli.command {
        Commands::Seed => {
            seed_directories(&conn, &config)?;
            tracing::info!("directories seeded");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Backfill => {
            let report = run_backfill(&mut conn, &config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => {
            let report = check_tenant_consistency(&conn)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.is_clean() {
                Ok(ExitCode::SUCCESS)
            } else {
                // Non-zero exit so scripts notice; the fix is a backfill
                // re-run, never a hand edit.
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
