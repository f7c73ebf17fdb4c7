//! The `shutter cache` command for inspecting and clearing cache files.

use clap::{Args, Subcommand};
use shutter_core::pipeline::discover_scopes;
use shutter_core::{CacheStore, Config, Scope};

/// Arguments for the `cache` command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Subcommands for cache management.
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show the cache file path for a scope
    Path {
        /// Sub-directory of the photos directory (root when omitted)
        scope: Option<String>,
    },

    /// Delete cached photo data so the next run reprocesses everything
    Clear {
        /// Sub-directory of the photos directory (root when omitted)
        #[arg(conflicts_with = "all")]
        scope: Option<String>,

        /// Clear the cache of every scope below the photos directory
        #[arg(long)]
        all: bool,
    },
}

/// Execute the cache command.
pub async fn execute(args: CacheArgs, config: Config) -> anyhow::Result<()> {
    let store = CacheStore::new(config.storage_dir());

    match args.command {
        CacheCommand::Path { scope } => {
            let scope = Scope::parse(scope.as_deref())?;
            println!("{}", store.path_for(&scope).display());
        }

        CacheCommand::Clear { scope, all } => {
            let scopes = if all {
                discover_scopes(&config.photos_dir())?
            } else {
                vec![Scope::parse(scope.as_deref())?]
            };
            let removed = clear_scopes(&store, &scopes).await?;
            println!("Removed {removed} cache file(s)");
        }
    }

    Ok(())
}

/// Remove the cache file of every scope, returning how many existed.
async fn clear_scopes(store: &CacheStore, scopes: &[Scope]) -> anyhow::Result<usize> {
    let mut removed = 0;
    for scope in scopes {
        if store.clear(scope).await? {
            tracing::info!("Cleared cache for scope {}", scope);
            removed += 1;
        } else {
            tracing::debug!("No cache for scope {}", scope);
        }
    }
    Ok(removed)
}
