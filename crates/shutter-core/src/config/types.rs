//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::sort::SortMode;

/// Where photos are read from and where cache files are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Serving root; a photo's `src` is its path relative to this directory
    pub public_dir: PathBuf,

    /// Root scope directory, normally inside `public_dir`
    pub photos_dir: PathBuf,

    /// Directory holding one cache file per scope
    pub storage_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("./public"),
            photos_dir: PathBuf::from("./public/photos"),
            storage_dir: PathBuf::from("./storage"),
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Worker pool size; 0 means one worker per hardware thread
    pub parallel_workers: usize,

    /// Extensions the local extractor accepts (case-insensitive)
    pub supported_formats: Vec<String>,

    /// Use the EXIF-embedded thumbnail as placeholder when present
    pub use_embedded_thumbnails: bool,

    /// Skip blur placeholder generation (fast path for huge collections)
    pub disable_blur_generation: bool,

    /// Ignore any existing cache and regenerate on every run
    pub disable_cache: bool,

    /// Abort the whole run when a listed file cannot be stat-ed
    pub strict_probe: bool,

    /// Longest edge of the generated placeholder, in pixels
    pub placeholder_size: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 0,
            supported_formats: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            use_embedded_thumbnails: false,
            disable_blur_generation: false,
            disable_cache: false,
            strict_probe: false,
            placeholder_size: 10,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Per-file local extraction timeout in milliseconds
    pub file_timeout_ms: u64,

    /// Remote metadata request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Max retry attempts for transient remote failures
    pub retry_attempts: u32,

    /// Base delay between remote retries in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 200,
            file_timeout_ms: 30_000,
            request_timeout_ms: 10_000,
            retry_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

/// Remote image service settings. Setting `server_url` switches the
/// pipeline to the remote processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL the indexer uses for metadata requests
    pub server_url: Option<String>,

    /// Base URL browsers use for resized images; falls back to `server_url`
    pub client_url: Option<String>,

    /// Shared HMAC secret for signed request paths
    pub secret: Option<String>,

    /// Output format requested for display images
    pub image_format: String,

    /// Extra filter chain appended after the format filter, e.g. `:hue(290)`
    pub image_filters: String,

    /// Maximum concurrent metadata requests
    pub parallel_requests: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            client_url: None,
            secret: None,
            image_format: "webp".to_string(),
            image_filters: String::new(),
            parallel_requests: 16,
        }
    }
}

/// Accepted values for `remote.image_format`.
pub const REMOTE_IMAGE_FORMATS: &[&str] = &["jpeg", "png", "gif", "webp", "tiff", "avif"];

/// Photo listing settings for consumers of the index.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PhotoConfig {
    /// Sort order for the photo list
    pub sort: SortMode,

    /// Reverse the sorted list
    pub default_reverse: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: pretty, json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
