//! Configuration management for Shutter.
//!
//! Configuration is read once at startup from `./shutter.toml` or the
//! platform config directory, then passed explicitly into the pipeline.
//! Nothing in the core reads environment variables.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::types::ProcessingOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory before the platform path.
pub const LOCAL_CONFIG_FILE: &str = "shutter.toml";

/// Root configuration structure for Shutter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory layout
    pub general: GeneralConfig,

    /// Processing settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Remote image service
    pub remote: RemoteConfig,

    /// Photo listing
    pub photo: PhotoConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from `./shutter.toml`, then the platform default
    /// location. Returns default configuration if neither exists.
    pub fn load() -> Result<Self, ConfigError> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Self::load_from(&local);
        }
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.shutter.shutter/config.toml
    /// - Linux: ~/.config/shutter/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\shutter\config\config.toml
    ///
    /// Falls back to ~/.shutter/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "shutter", "shutter")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".shutter").join("config.toml")
            })
    }

    /// Serving root with `~` expanded.
    pub fn public_dir(&self) -> PathBuf {
        expand(&self.general.public_dir)
    }

    /// Root photo directory with `~` expanded.
    pub fn photos_dir(&self) -> PathBuf {
        expand(&self.general.photos_dir)
    }

    /// Cache storage directory with `~` expanded.
    pub fn storage_dir(&self) -> PathBuf {
        expand(&self.general.storage_dir)
    }

    /// The extraction fingerprint recorded in, and checked against, cache files.
    pub fn processing_options(&self) -> ProcessingOptions {
        ProcessingOptions {
            use_thumbnails: self.processing.use_embedded_thumbnails,
            disable_blur_generation: self.processing.disable_blur_generation,
        }
    }

    /// Worker pool size with 0 resolved to the hardware concurrency.
    pub fn worker_count(&self) -> usize {
        match self.processing.parallel_workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            n => n,
        }
    }

    /// Whether a remote image service is configured.
    pub fn uses_remote(&self) -> bool {
        self.remote
            .server_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}
