//! Processor backed by a remote image service.

use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::{log_result, reuse_cached, PerFileRequest, PhotoProcessor, ProcessOutcome, ProcessedResult};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::remote::RemoteExtractor;

/// Sends every non-cached request to the image service, with at most
/// `remote.parallel_requests` requests in flight.
pub struct RemoteProcessor {
    extractor: RemoteExtractor,
    semaphore: Arc<Semaphore>,
}

impl RemoteProcessor {
    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        Ok(Self {
            extractor: RemoteExtractor::from_config(config)?,
            semaphore: Arc::new(Semaphore::new(config.remote.parallel_requests.max(1))),
        })
    }

    async fn process_one(&self, request: PerFileRequest, cancel: &CancellationToken) -> ProcessedResult {
        let start = Instant::now();

        if let Some(photo) = reuse_cached(&request) {
            return ProcessedResult::new(request.image_path, ProcessOutcome::Cached { photo }, 0);
        }

        let result = async {
            let _permit = tokio::select! {
                permit = self.semaphore.acquire() => permit.map_err(|_| PipelineError::Cancelled)?,
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            };
            // Cancellation may have fired while waiting for a permit
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            self.extractor.extract(&request.image_path).await
        }
        .await;

        let outcome = match result {
            Ok(photo) => ProcessOutcome::Extracted { photo },
            Err(e) => ProcessOutcome::Failed {
                message: e.to_string(),
            },
        };
        ProcessedResult::new(
            request.image_path,
            outcome,
            start.elapsed().as_millis() as u64,
        )
    }
}

#[async_trait]
impl PhotoProcessor for RemoteProcessor {
    fn name(&self) -> &str {
        "remote"
    }

    async fn process(
        &self,
        requests: Vec<PerFileRequest>,
        cancel: &CancellationToken,
    ) -> Vec<ProcessedResult> {
        join_all(requests.into_iter().map(|request| async {
            let result = self.process_one(request, cancel).await;
            log_result(&result);
            result
        }))
        .await
    }
}
