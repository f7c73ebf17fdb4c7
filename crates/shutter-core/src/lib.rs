//! Shutter Core - incremental photo indexing library.
//!
//! Shutter walks a directory of photos, extracts per-image metadata
//! (dimensions, capture time, a blurred placeholder or a remote thumbnail
//! URL) and keeps a versioned cache per directory so repeated runs only
//! touch files whose size changed.
//!
//! # Architecture
//!
//! ```text
//! list files → stat → load cache → Processor (worker pool | remote) → merge → save cache
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use shutter_core::{Config, Scope, Shutter};
//!
//! #[tokio::main]
//! async fn main() -> shutter_core::Result<()> {
//!     let shutter = Shutter::new(Config::load()?)?;
//!     let photos = shutter.index_sorted(&Scope::Root).await?;
//!     println!("{} photos", photos.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod sort;
pub mod types;

pub use cache::{CacheFile, CacheStore, CACHE_VERSION};
pub use config::Config;
pub use error::{CacheError, ConfigError, PipelineError, PipelineResult, Result, ShutterError};
pub use pipeline::{PhotoIndexer, Scope};
pub use processor::{create_processor, PerFileRequest, PhotoProcessor, ProcessOutcome, ProcessedResult};
pub use sort::{sort_photos, SortMode};
pub use types::{FileStats, FullPhoto, PhotoMap, ProcessedPhoto, ProcessingOptions, ProcessingStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Main entry point: a configuration plus the indexer built from it.
pub struct Shutter {
    config: Config,
    indexer: PhotoIndexer,
}

impl Shutter {
    /// Build with the processor selected by `config`.
    pub fn new(config: Config) -> Result<Self> {
        tracing::debug!("Initializing Shutter v{}", VERSION);
        let indexer = PhotoIndexer::from_config(&config)?;
        Ok(Self { config, indexer })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn indexer(&self) -> &PhotoIndexer {
        &self.indexer
    }

    /// Index a scope and return its photos ordered by the configured sort.
    pub async fn index_sorted(&self, scope: &Scope) -> Result<Vec<FullPhoto>> {
        let photos = self.indexer.index(scope).await?;
        Ok(sort_photos(
            photos,
            self.config.photo.sort,
            self.config.photo.default_reverse,
        ))
    }
}
