//! `socialrecipe`: operator tool for the social store.
//!
//! Usage:
//!   socialrecipe [-c <config.toml>] [--data-dir <dir>] <init|audit|repair|stats>

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use config::AdminConfig;

/// SocialRecipe admin CLI.
#[derive(Parser, Debug)]
#[command(name = "socialrecipe", about = "SocialRecipe store administration")]
struct Cli {
    /// Path to config file (default: ./socialrecipe.toml).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides [storage] data_dir).
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    /// SQLite file (overrides [storage] sqlite_path).
    #[arg(long = "sqlite", global = true)]
    sqlite: Option<PathBuf>,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database and schema if missing.
    Init,

    /// Compare stored counters with their facts. Exits non-zero on drift.
    Audit,

    /// Recompute every counter from its facts.
    Repair,

    /// Show row counts.
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(AdminConfig::default_path);
    info!("Loading configuration from {}", config_path.display());
    let mut config = AdminConfig::load(&config_path)?;
    config.storage = config.storage.with_overrides(cli.data_dir, cli.sqlite);

    let json_output = cli.output == "json";
    let module = commands::open(&config)?;

    match cli.command {
        Commands::Init => commands::init(&config),
        Commands::Audit => commands::audit(&module, json_output),
        Commands::Repair => commands::repair(&module),
        Commands::Stats => commands::stats(&module, json_output),
    }
}
