//! Incremental indexing of one scope.
//!
//! A run lists the scope's directory, probes every file, reuses the previous
//! cache when its fingerprint still matches, hands the whole batch to the
//! active [`PhotoProcessor`] and persists the merged result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::discovery::list_files;
use super::probe::probe_all;
use super::scope::{site_src, Scope};
use crate::cache::{CacheFile, CacheStore};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::processor::{create_processor, PerFileRequest, PhotoProcessor, ProcessOutcome};
use crate::types::{FileStats, FullPhoto, PhotoMap, ProcessingOptions, ProcessingStats};

/// Runs the indexing pipeline with one processor chosen at construction.
pub struct PhotoIndexer {
    photos_dir: PathBuf,
    public_dir: PathBuf,
    store: CacheStore,
    options: ProcessingOptions,
    disable_cache: bool,
    strict_probe: bool,
    processor: Box<dyn PhotoProcessor>,
    cancel: CancellationToken,
}

impl PhotoIndexer {
    /// Create an indexer around an already-built processor.
    pub fn new(config: &Config, processor: Box<dyn PhotoProcessor>) -> Self {
        Self {
            photos_dir: config.photos_dir(),
            public_dir: config.public_dir(),
            store: CacheStore::new(config.storage_dir()),
            options: config.processing_options(),
            disable_cache: config.processing.disable_cache,
            strict_probe: config.processing.strict_probe,
            processor,
            cancel: CancellationToken::new(),
        }
    }

    /// Create an indexer with the processor selected by `config`.
    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        Ok(Self::new(config, create_processor(config)?))
    }

    /// Token that cancels the current and any later run of this indexer.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn processor_name(&self) -> &str {
        self.processor.name()
    }

    pub fn cache_store(&self) -> &CacheStore {
        &self.store
    }

    /// Index a scope and return its photos keyed by file path.
    pub async fn index(&self, scope: &Scope) -> PipelineResult<PhotoMap> {
        let (photos, _) = self.index_with_stats(scope, false).await?;
        Ok(photos)
    }

    /// Index a scope, ignoring any cache when `force` is set, and report
    /// what happened to each file.
    pub async fn index_with_stats(
        &self,
        scope: &Scope,
        force: bool,
    ) -> PipelineResult<(PhotoMap, ProcessingStats)> {
        let start = Instant::now();
        let dir = scope.directory(&self.photos_dir);
        tracing::info!(
            "Indexing scope {} ({:?}) with {} processor",
            scope,
            dir,
            self.processor.name()
        );

        let files = list_files(&dir).await?;
        let probed = self.probe_files(&files).await?;
        let previous = self.load_previous(scope, force).await;

        let mut file_stats: HashMap<PathBuf, FileStats> = HashMap::with_capacity(probed.len());
        let requests: Vec<PerFileRequest> = probed
            .into_iter()
            .map(|(path, stats)| {
                file_stats.insert(path.clone(), stats);
                PerFileRequest {
                    cached_photo: previous.get(&cache_key(&path)).cloned(),
                    image_path: path,
                    stats,
                    processing_options: self.options,
                }
            })
            .collect();
        let total = requests.len();

        let results = self.processor.process(requests, &self.cancel).await;
        if self.cancel.is_cancelled() {
            tracing::warn!("Indexing of scope {} cancelled", scope);
            return Err(PipelineError::Cancelled);
        }
        if results.len() != total {
            tracing::warn!(
                "Processor returned {} results for {} requests",
                results.len(),
                total
            );
        }

        let mut stats = ProcessingStats::default();
        let mut photos = PhotoMap::new();
        for result in results {
            let Some(probed) = file_stats.get(&result.image_path).copied() else {
                tracing::warn!("Ignoring result for unrequested file {:?}", result.image_path);
                continue;
            };
            let src = match site_src(&result.image_path, &self.public_dir) {
                Ok(src) => src,
                Err(e) => {
                    tracing::error!("{}, leaving it out of the index", e);
                    stats.failed += 1;
                    continue;
                }
            };

            match &result.outcome {
                ProcessOutcome::Extracted { .. } => stats.extracted += 1,
                ProcessOutcome::Cached { .. } => stats.cached += 1,
                ProcessOutcome::Unsupported => stats.unsupported += 1,
                ProcessOutcome::Failed { .. } => stats.failed += 1,
            }

            let key = cache_key(&result.image_path);
            if let Some(photo) = result.into_photo() {
                photos.insert(key, FullPhoto::new(photo, probed, src));
            }
        }

        let file = CacheFile::new(self.options, photos);
        self.store.save(scope, &file).await;

        stats.total_seconds = start.elapsed().as_secs_f64();
        tracing::info!(
            "Indexed scope {}: {} photos ({} extracted, {} cached, {} unsupported, {} failed) in {:?}",
            scope,
            stats.indexed(),
            stats.extracted,
            stats.cached,
            stats.unsupported,
            stats.failed,
            start.elapsed()
        );

        Ok((file.photos, stats))
    }

    async fn probe_files(&self, files: &[PathBuf]) -> PipelineResult<Vec<(PathBuf, FileStats)>> {
        let mut probed = Vec::with_capacity(files.len());
        for (path, result) in probe_all(files).await {
            match result {
                Ok(stats) => probed.push((path, stats)),
                Err(e) if self.strict_probe => return Err(e),
                Err(e) => tracing::warn!("{}, excluding it from this run", e),
            }
        }
        Ok(probed)
    }

    /// Photos from the previous run, or nothing when the cache must not be
    /// reused at all.
    async fn load_previous(&self, scope: &Scope, force: bool) -> PhotoMap {
        if force || self.disable_cache {
            tracing::info!("Cache disabled, all files will be processed");
            return PhotoMap::new();
        }

        match self.store.load(scope).await {
            Some(file) if file.is_compatible(&self.options) => file.photos,
            Some(_) => {
                tracing::info!("Processing options changed, all files will be processed");
                PhotoMap::new()
            }
            None => PhotoMap::new(),
        }
    }
}

/// Key of a file in the photo mapping.
pub fn cache_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
