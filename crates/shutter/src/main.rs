//! Shutter CLI - incremental photo indexing.
//!
//! Shutter scans a photo directory, extracts dimensions, capture time and a
//! placeholder for every image, and keeps a cache per directory so repeated
//! runs only touch changed files. The sorted photo list is printed as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Index the root photo directory
//! shutter index
//!
//! # Index one sub-directory, ignoring its cache
//! shutter index 2023/summer --force
//!
//! # Index every directory into a file
//! shutter index --all --output photos.json
//!
//! # View configuration
//! shutter config show
//! ```

use clap::{Parser, Subcommand};
use shutter_core::Config;
use std::path::PathBuf;

mod cli;
mod logging;

/// Shutter - incremental photo indexing with a versioned metadata cache.
#[derive(Parser, Debug)]
#[command(name = "shutter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Read configuration from this file instead of the default locations
    #[arg(short, long, global = true, env = "SHUTTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: cli::overrides::Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Index photos and print the sorted photo list
    Index(cli::index::IndexArgs),

    /// Inspect or clear cache files
    Cache(cli::cache::CacheArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if cli.config.is_none() => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `shutter config path`."
            );
            Config::default()
        }
        Err(e) => return Err(e.into()),
    };
    cli.overrides.apply(&mut config);
    config.validate()?;

    logging::init_from_config(&config, cli.verbose, cli.json_logs);
    tracing::debug!("Shutter v{}", shutter_core::VERSION);

    match cli.command {
        Commands::Index(args) => cli::index::execute(args, config).await,
        Commands::Cache(args) => cli::cache::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config, shutter_core::ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}
