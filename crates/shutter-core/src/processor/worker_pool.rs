//! Local processing on a bounded pool of worker units.
//!
//! Each unit pulls jobs from one shared FIFO queue, reads the file and runs
//! the CPU-bound extraction on the blocking thread pool, so decoding never
//! stalls the orchestrating task. Jobs and replies are owned plain data.

use async_trait::async_trait;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{log_result, reuse_cached, PerFileRequest, PhotoProcessor, ProcessOutcome, ProcessedResult};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::discovery::{extension_of, is_supported};
use crate::pipeline::extract::LocalExtractor;
use crate::types::{ProcessedPhoto, ProcessingOptions};

/// A unit of work sent to the pool.
struct Job {
    image_path: PathBuf,
    file_size: u64,
    options: ProcessingOptions,
    reply: oneshot::Sender<PipelineResult<ProcessedPhoto>>,
}

/// What every pool unit needs to run a job.
#[derive(Debug, Clone)]
struct UnitContext {
    extractor: LocalExtractor,
    max_file_size_mb: u64,
    timeout: Duration,
}

impl UnitContext {
    async fn run(&self, image_path: &Path, file_size: u64, options: ProcessingOptions) -> PipelineResult<ProcessedPhoto> {
        let max_bytes = self.max_file_size_mb.saturating_mul(1024 * 1024);
        if file_size > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: image_path.to_path_buf(),
                size_mb: file_size / (1024 * 1024),
                max_mb: self.max_file_size_mb,
            });
        }

        let deadline = tokio::time::Instant::now() + self.timeout;
        let bytes = match tokio::time::timeout_at(deadline, tokio::fs::read(image_path)).await {
            Ok(read) => read.map_err(|e| PipelineError::Extraction {
                path: image_path.to_path_buf(),
                message: format!("Cannot read file: {e}"),
            })?,
            Err(_) => return Err(self.timeout_error(image_path)),
        };

        let extractor = self.extractor.clone();
        let path = image_path.to_path_buf();
        let mut task =
            tokio::task::spawn_blocking(move || extractor.extract(&path, &bytes, &options));

        let joined = match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                // A blocking decode cannot be interrupted. The unit waits it
                // out before taking the next job, so no more than one decode
                // per unit is ever running.
                tracing::warn!(
                    "Extraction of {:?} exceeded {:?}, waiting for it to finish",
                    image_path,
                    self.timeout
                );
                let _ = task.await;
                return Err(self.timeout_error(image_path));
            }
        };
        joined.map_err(|e| PipelineError::Extraction {
            path: image_path.to_path_buf(),
            message: format!("Task join error: {e}"),
        })?
    }

    fn timeout_error(&self, image_path: &Path) -> PipelineError {
        PipelineError::Timeout {
            path: image_path.to_path_buf(),
            stage: "extract".to_string(),
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}

/// A fixed-size pool of extraction units fed from a FIFO queue.
struct WorkerPool {
    sender: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    fn spawn(size: usize, context: UnitContext, cancel: CancellationToken) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Job>(size * 2);
        let receiver = Arc::new(Mutex::new(receiver));
        let context = Arc::new(context);

        let workers = (0..size)
            .map(|id| {
                let receiver = receiver.clone();
                let context = context.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { run_unit(id, receiver, context, cancel).await })
            })
            .collect();

        Self {
            sender,
            workers,
            cancel,
        }
    }

    /// Number of units in the pool.
    fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a file and wait for its extraction.
    async fn submit(
        &self,
        image_path: &Path,
        file_size: u64,
        options: ProcessingOptions,
    ) -> PipelineResult<ProcessedPhoto> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let (reply, response) = oneshot::channel();
        let job = Job {
            image_path: image_path.to_path_buf(),
            file_size,
            options,
            reply,
        };
        let closed = || PipelineError::Extraction {
            path: image_path.to_path_buf(),
            message: "worker pool closed".to_string(),
        };

        self.sender.send(job).await.map_err(|_| closed())?;
        response.await.map_err(|_| closed())?
    }

    /// Close the queue and wait for every unit to exit.
    async fn shutdown(self) {
        drop(self.sender);
        for handle in self.workers {
            if let Err(e) = handle.await {
                tracing::error!("Worker unit panicked: {e}");
            }
        }
    }
}

async fn run_unit(
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    context: Arc<UnitContext>,
    cancel: CancellationToken,
) {
    loop {
        // Lock only while waiting for the next job, not while running it
        let job = { receiver.lock().await.recv().await };
        let Some(job) = job else { break };

        let result = if cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            context.run(&job.image_path, job.file_size, job.options).await
        };
        // Submitter may have gone away; nothing to do then
        let _ = job.reply.send(result);
    }
    tracing::trace!("Worker unit {id} exiting");
}

/// Processor that extracts metadata locally on a pool of worker units.
///
/// A fresh pool is started for each batch and torn down once every request
/// of the batch is answered.
pub struct WorkerPoolProcessor {
    context: UnitContext,
    supported_formats: Vec<String>,
    workers: usize,
}

impl WorkerPoolProcessor {
    pub fn from_config(config: &Config) -> Self {
        Self {
            context: UnitContext {
                extractor: LocalExtractor::new(config.processing.placeholder_size),
                max_file_size_mb: config.limits.max_file_size_mb,
                timeout: Duration::from_millis(config.limits.file_timeout_ms),
            },
            supported_formats: config.processing.supported_formats.clone(),
            workers: config.worker_count(),
        }
    }

    async fn process_one(&self, pool: &WorkerPool, request: PerFileRequest) -> ProcessedResult {
        let start = Instant::now();

        if !is_supported(&request.image_path, &self.supported_formats) {
            tracing::info!(
                "File type not supported [{}] for file: {:?}, skipping",
                extension_of(&request.image_path),
                request.image_path
            );
            return ProcessedResult::new(request.image_path, ProcessOutcome::Unsupported, 0);
        }

        if let Some(photo) = reuse_cached(&request) {
            return ProcessedResult::new(request.image_path, ProcessOutcome::Cached { photo }, 0);
        }

        let outcome = match pool
            .submit(
                &request.image_path,
                request.stats.file_size,
                request.processing_options,
            )
            .await
        {
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
impl PhotoProcessor for WorkerPoolProcessor {
    fn name(&self) -> &str {
        "worker-pool"
    }

    async fn process(
        &self,
        requests: Vec<PerFileRequest>,
        cancel: &CancellationToken,
    ) -> Vec<ProcessedResult> {
        if requests.is_empty() {
            return Vec::new();
        }

        let pool = WorkerPool::spawn(
            self.workers.min(requests.len()),
            self.context.clone(),
            cancel.clone(),
        );
        tracing::debug!("Started worker pool with {} units", pool.size());

        let results = join_all(requests.into_iter().map(|request| async {
            let result = self.process_one(&pool, request).await;
            log_result(&result);
            result
        }))
        .await;

        pool.shutdown().await;
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::decode::tests::encoded_image;
    use crate::processor::tests::{cached, request};
    use image::ImageFormat;

    fn processor(workers: usize) -> WorkerPoolProcessor {
        let mut config = Config::default();
        config.processing.parallel_workers = workers;
        WorkerPoolProcessor::from_config(&config)
    }

    fn outcome_for<'a>(results: &'a [ProcessedResult], path: &Path) -> &'a ProcessOutcome {
        &results
            .iter()
            .find(|r| r.image_path == path)
            .expect("missing result")
            .outcome
    }

    #[tokio::test]
    async fn test_mixed_batch() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("a.jpg");
        let reused = dir.path().join("b.png");
        let notes = dir.path().join("notes.txt");
        let broken = dir.path().join("broken.jpg");
        std::fs::write(&fresh, encoded_image(30, 20, ImageFormat::Jpeg)).unwrap();
        std::fs::write(&reused, b"not decoded because cached").unwrap();
        std::fs::write(&notes, b"hello").unwrap();
        std::fs::write(&broken, b"not an image").unwrap();

        let requests = vec![
            request(fresh.clone(), 200, None),
            request(reused.clone(), 300, Some(cached("/b.png", 300, 10, 20))),
            request(notes.clone(), 5, None),
            request(broken.clone(), 12, None),
        ];
        let results = processor(2)
            .process(requests, &CancellationToken::new())
            .await;

        assert_eq!(results.len(), 4);
        match outcome_for(&results, &fresh) {
            ProcessOutcome::Extracted { photo } => assert_eq!((photo.width, photo.height), (30, 20)),
            other => panic!("expected extraction, got {other:?}"),
        }
        match outcome_for(&results, &reused) {
            ProcessOutcome::Cached { photo } => assert_eq!((photo.width, photo.height), (10, 20)),
            other => panic!("expected cache hit, got {other:?}"),
        }
        assert_eq!(outcome_for(&results, &notes), &ProcessOutcome::Unsupported);
        assert!(matches!(
            outcome_for(&results, &broken),
            ProcessOutcome::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_single_unit_drains_queue() {
        let dir = tempfile::tempdir().unwrap();
        let requests: Vec<_> = (0..6)
            .map(|i| {
                let path = dir.path().join(format!("{i}.png"));
                std::fs::write(&path, encoded_image(8 + i, 8, ImageFormat::Png)).unwrap();
                request(path, 100, None)
            })
            .collect();

        let results = processor(1)
            .process(requests, &CancellationToken::new())
            .await;
        assert_eq!(results.len(), 6);
        assert!(results
            .iter()
            .all(|r| matches!(r.outcome, ProcessOutcome::Extracted { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_batch_schedules_no_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("a.jpg");
        let reused = dir.path().join("b.jpg");
        std::fs::write(&fresh, encoded_image(8, 8, ImageFormat::Jpeg)).unwrap();
        std::fs::write(&reused, encoded_image(8, 8, ImageFormat::Jpeg)).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = processor(2)
            .process(
                vec![
                    request(fresh.clone(), 10, None),
                    request(reused.clone(), 10, Some(cached("/b.jpg", 10, 8, 8))),
                ],
                &cancel,
            )
            .await;

        assert!(matches!(
            outcome_for(&results, &fresh),
            ProcessOutcome::Failed { message } if message.contains("cancelled")
        ));
        assert!(matches!(
            outcome_for(&results, &reused),
            ProcessOutcome::Cached { .. }
        ));
    }

    #[tokio::test]
    async fn test_file_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.jpg");
        std::fs::write(&path, b"x").unwrap();

        let mut config = Config::default();
        config.limits.max_file_size_mb = 1;
        let processor = WorkerPoolProcessor::from_config(&config);
        let results = processor
            .process(
                vec![request(path.clone(), 5 * 1024 * 1024, None)],
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(
            outcome_for(&results, &path),
            ProcessOutcome::Failed { message } if message.contains("too large")
        ));
    }

    #[tokio::test]
    async fn test_slow_extraction_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, encoded_image(2000, 2000, ImageFormat::Png)).unwrap();

        let context = UnitContext {
            extractor: LocalExtractor::new(16),
            max_file_size_mb: 100,
            timeout: Duration::from_millis(1),
        };
        let err = context
            .run(&path, 1024, ProcessingOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { ref stage, .. } if stage == "extract"));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results = processor(2)
            .process(Vec::new(), &CancellationToken::new())
            .await;
        assert!(results.is_empty());
    }
}
