//! Directory listing for a scope, and discovery of every scope below the
//! photos directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::scope::Scope;
use crate::error::{PipelineError, PipelineResult};

/// List the plain files directly inside `dir`, sorted by path.
///
/// Sub-directories are separate scopes and are not descended into. A failure
/// to read the directory itself is fatal for the run.
pub async fn list_files(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let read_error = |source| PipelineError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        match entry.file_type().await {
            Ok(kind) if kind.is_file() => files.push(entry.path()),
            Ok(_) => {}
            Err(e) => tracing::debug!("Skipping {:?}: {}", entry.path(), e),
        }
    }

    files.sort();
    Ok(files)
}

/// Check if a file has an extension in the allow-list (case-insensitive).
pub fn is_supported(path: &Path, formats: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| formats.iter().any(|fmt| fmt.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Lowercase extension for log messages, or `"none"`.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_else(|| "none".to_string())
}

/// Find every scope below `photos_dir`: the root first, then each
/// sub-directory in path order. Hidden directories are skipped.
pub fn discover_scopes(photos_dir: &Path) -> PipelineResult<Vec<Scope>> {
    if !photos_dir.is_dir() {
        return Err(PipelineError::DirectoryRead {
            path: photos_dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut named = Vec::new();
    let walker = WalkDir::new(photos_dir)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {:?}: {}", photos_dir, e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(photos_dir) else {
            continue;
        };
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        match Scope::from_segments(&segments) {
            Ok(scope) => named.push(scope),
            Err(e) => tracing::warn!("Skipping directory {:?}: {}", entry.path(), e),
        }
    }

    named.sort();
    let mut scopes = Vec::with_capacity(named.len() + 1);
    scopes.push(Scope::Root);
    scopes.extend(named);
    Ok(scopes)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}
