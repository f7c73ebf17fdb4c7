//! File stats probing.

use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::{PipelineError, PipelineResult};
use crate::types::FileStats;

/// Read size and modification time for one file.
pub async fn probe(path: &Path) -> PipelineResult<FileStats> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| PipelineError::StatProbe {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(stats_from_metadata(&metadata))
}

/// Probe every path concurrently. Results keep the input order.
pub async fn probe_all(paths: &[PathBuf]) -> Vec<(PathBuf, PipelineResult<FileStats>)> {
    let probes = paths.iter().map(|path| async move {
        let stats = probe(path).await;
        (path.clone(), stats)
    });
    join_all(probes).await
}

/// Convert filesystem metadata to [`FileStats`].
///
/// Platforms without modification times report 0.
pub fn stats_from_metadata(metadata: &std::fs::Metadata) -> FileStats {
    let modified_at = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    FileStats {
        file_size: metadata.len(),
        modified_at,
    }
}
