//! The `shutter config` command for configuration management.

use clap::{Args, Subcommand};
use shutter_core::config::LOCAL_CONFIG_FILE;
use shutter_core::Config;
use std::path::PathBuf;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration, overrides included
    Show,

    /// Show which config file is read
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Write `./shutter.toml` instead of the platform config file
        #[arg(long)]
        local: bool,

        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
pub async fn execute(
    args: ConfigArgs,
    config: Config,
    explicit_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", active_path(explicit_path).display());
        }

        ConfigCommand::Init { local, force } => {
            let path = if local {
                PathBuf::from(LOCAL_CONFIG_FILE)
            } else {
                Config::default_path()
            };
            write_default(&path, force)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

/// The file `Config::load` would read, or the explicit `--config` path.
fn active_path(explicit_path: Option<PathBuf>) -> PathBuf {
    explicit_path.unwrap_or_else(|| {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            local
        } else {
            Config::default_path()
        }
    })
}

fn write_default(path: &std::path::Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    Ok(())
}
