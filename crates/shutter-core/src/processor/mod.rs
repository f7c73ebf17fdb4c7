//! Per-file processing abstraction.
//!
//! A [`PhotoProcessor`] turns a batch of [`PerFileRequest`]s into one
//! [`ProcessedResult`] per request. Two implementations exist: a local
//! worker pool that decodes files itself, and a remote processor that asks
//! an image service. Exactly one is chosen per run by [`create_processor`].
//!
//! Both share the cost-avoidance rule in [`reuse_cached`]: a request whose
//! cached photo has the same byte size as the freshly probed file is answered
//! from the cache, before any extraction work is scheduled.

mod remote;
mod worker_pool;

pub use remote::RemoteProcessor;
pub use worker_pool::WorkerPoolProcessor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::PipelineResult;
use crate::types::{FileStats, FullPhoto, ProcessedPhoto, ProcessingOptions};

/// Work item for one file. Plain data, so it can cross into pool units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerFileRequest {
    pub image_path: PathBuf,
    pub stats: FileStats,
    pub processing_options: ProcessingOptions,
    /// Previous run's record for this exact path, if the cache is usable
    #[serde(default)]
    pub cached_photo: Option<FullPhoto>,
}

/// What happened to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessOutcome {
    /// Freshly extracted
    Extracted { photo: ProcessedPhoto },
    /// Reused from the cache without extraction
    Cached { photo: ProcessedPhoto },
    /// File type outside the allow-list; skipped
    Unsupported,
    /// Extraction failed; the file is left out of the index
    Failed { message: String },
}

/// Result for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedResult {
    pub image_path: PathBuf,
    pub outcome: ProcessOutcome,
    /// Time spent on this file
    pub duration_ms: u64,
}

impl ProcessedResult {
    pub fn new(image_path: PathBuf, outcome: ProcessOutcome, duration_ms: u64) -> Self {
        Self {
            image_path,
            outcome,
            duration_ms,
        }
    }

    /// The photo, if this file belongs in the index.
    pub fn photo(&self) -> Option<&ProcessedPhoto> {
        match &self.outcome {
            ProcessOutcome::Extracted { photo } | ProcessOutcome::Cached { photo } => Some(photo),
            _ => None,
        }
    }

    pub fn into_photo(self) -> Option<ProcessedPhoto> {
        match self.outcome {
            ProcessOutcome::Extracted { photo } | ProcessOutcome::Cached { photo } => Some(photo),
            _ => None,
        }
    }

    /// Whether the photo came from the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self.outcome, ProcessOutcome::Cached { .. })
    }
}

/// Trait that both processing strategies implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the orchestrator holds a `Box<dyn PhotoProcessor>`).
#[async_trait]
pub trait PhotoProcessor: Send + Sync {
    /// Processor name for logging.
    fn name(&self) -> &str;

    /// Process a batch. Returns exactly one result per request, in any
    /// order. Once `cancel` fires no new extraction starts.
    async fn process(
        &self,
        requests: Vec<PerFileRequest>,
        cancel: &CancellationToken,
    ) -> Vec<ProcessedResult>;
}

/// The cached photo for a request, if its recorded size still matches.
pub fn reuse_cached(request: &PerFileRequest) -> Option<ProcessedPhoto> {
    request
        .cached_photo
        .as_ref()
        .filter(|cached| cached.stats.file_size == request.stats.file_size)
        .map(|cached| cached.photo.clone())
}

/// Log a finished result at a level matching its outcome.
pub(crate) fn log_result(result: &ProcessedResult) {
    match &result.outcome {
        ProcessOutcome::Extracted { photo } => tracing::debug!(
            "Processed {:?} - {}x{} ({}ms)",
            result.image_path,
            photo.width,
            photo.height,
            result.duration_ms
        ),
        ProcessOutcome::Cached { photo } => tracing::debug!(
            "Processed {:?} - {}x{} (cached)",
            result.image_path,
            photo.width,
            photo.height
        ),
        ProcessOutcome::Unsupported => {}
        ProcessOutcome::Failed { message } => {
            tracing::warn!("Failed: {:?} - {}", result.image_path, message)
        }
    }
}

/// Pick the processor for this run: remote when a service URL is
/// configured, the local worker pool otherwise.
pub fn create_processor(config: &Config) -> PipelineResult<Box<dyn PhotoProcessor>> {
    if config.uses_remote() {
        tracing::info!("Using remote processor");
        Ok(Box::new(RemoteProcessor::from_config(config)?))
    } else {
        tracing::info!("Using worker pool processor ({} workers)", config.worker_count());
        Ok(Box::new(WorkerPoolProcessor::from_config(config)))
    }
}
