//! Error types for the Shutter indexing pipeline.
//!
//! Errors are organized by stage so that callers can tell a run-level failure
//! (the photo directory cannot be listed) from a per-file failure (one image
//! would not decode) and react accordingly.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Shutter operations.
#[derive(Error, Debug)]
pub enum ShutterError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Listing the scope's source directory failed. Fatal for the run.
    #[error("Cannot read photo directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A listed file could not be stat-ed (vanished or unreadable mid-scan)
    #[error("Cannot stat {path}: {source}")]
    StatProbe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scope name is not a plain relative directory path
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// A file lies outside the serving root and so has no site URL
    #[error("{path} is not inside the public directory {public_dir}")]
    OutsidePublicDir { path: PathBuf, public_dir: PathBuf },

    /// Dimensions could not be derived from the file
    #[error("Extraction failed for {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    /// File type outside the configured allow-list
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// Remote metadata service failure
    #[error("Remote service error: {message}")]
    Remote {
        message: String,
        /// HTTP status code, when the service answered at all
        status_code: Option<u16>,
    },

    /// The remote service could not be reached (connection refused, DNS,
    /// reset before a response)
    #[error("Remote service unreachable at {url}: {message}")]
    Unreachable { url: String, message: String },

    /// The run was cancelled before every file was processed
    #[error("Run cancelled")]
    Cancelled,
}

/// Cache store failures. Never propagated past the store: a missing or
/// corrupt cache forces reprocessing, a failed write is only logged.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading or parsing the cache document failed
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Writing the cache document failed
    #[error("Cache persist failed: {0}")]
    Persist(String),
}

/// Convenience type alias for Shutter results.
pub type Result<T> = std::result::Result<T, ShutterError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
