//! Versioned per-scope cache of processed photos.
//!
//! One JSON document per scope holds the cache format version, the
//! processing options that produced it and every photo from the last run.
//! The store never fails a run: unreadable caches load as absent and failed
//! writes are logged.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::pipeline::scope::Scope;
use crate::types::{PhotoMap, ProcessingOptions};

/// Cache document format version. Bump whenever extraction output changes
/// shape or meaning; older caches are then discarded wholesale.
pub const CACHE_VERSION: &str = "1.0.0";

/// The persisted document for one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFile {
    pub version: String,
    pub processing_options: ProcessingOptions,
    pub photos: PhotoMap,
}

impl CacheFile {
    /// A document stamped with the current format version.
    pub fn new(processing_options: ProcessingOptions, photos: PhotoMap) -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            processing_options,
            photos,
        }
    }

    /// Whether this cache may be reused by a run with `options`.
    pub fn is_compatible(&self, options: &ProcessingOptions) -> bool {
        self.version == CACHE_VERSION && self.processing_options == *options
    }
}

/// Loads and saves [`CacheFile`]s under a storage directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    storage_dir: PathBuf,
}

impl CacheStore {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Deterministic storage path for a scope.
    pub fn path_for(&self, scope: &Scope) -> PathBuf {
        self.storage_dir.join(scope.cache_file_name())
    }

    /// Load the cache for a scope. Any failure, including a version from an
    /// older format, yields `None`.
    pub async fn load(&self, scope: &Scope) -> Option<CacheFile> {
        let path = self.path_for(scope);
        tracing::debug!("Loading cache file {:?}", path);
        match self.try_load(&path).await {
            Ok(file) => {
                tracing::debug!("Cache file has {} entries", file.photos.len());
                Some(file)
            }
            Err(e) => {
                tracing::warn!("{} ({:?}), all files will be processed", e, path);
                None
            }
        }
    }

    async fn try_load(&self, path: &Path) -> Result<CacheFile, CacheError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let file: CacheFile = serde_json::from_slice(&bytes)
            .map_err(|e| CacheError::Unavailable(format!("corrupt cache file: {e}")))?;
        if file.version != CACHE_VERSION {
            return Err(CacheError::Unavailable(format!(
                "cache version {} does not match {}",
                file.version, CACHE_VERSION
            )));
        }
        Ok(file)
    }

    /// Overwrite the cache for a scope. Returns whether the write succeeded.
    pub async fn save(&self, scope: &Scope, file: &CacheFile) -> bool {
        let path = self.path_for(scope);
        match self.try_save(&path, file).await {
            Ok(()) => {
                tracing::debug!("Wrote {} entries to {:?}", file.photos.len(), path);
                true
            }
            Err(e) => {
                tracing::warn!("{} ({:?})", e, path);
                false
            }
        }
    }

    // Written to a sibling temp file and renamed, so readers never see a
    // partially written document.
    async fn try_save(&self, path: &Path, file: &CacheFile) -> Result<(), CacheError> {
        let persist = |e: std::io::Error| CacheError::Persist(e.to_string());

        tokio::fs::create_dir_all(&self.storage_dir)
            .await
            .map_err(persist)?;
        let bytes = serde_json::to_vec(file).map_err(|e| CacheError::Persist(e.to_string()))?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await.map_err(persist)?;
        tokio::fs::rename(&tmp, path).await.map_err(persist)?;
        Ok(())
    }

    /// Delete the cache for a scope. Returns `false` if there was none.
    pub async fn clear(&self, scope: &Scope) -> std::io::Result<bool> {
        match tokio::fs::remove_file(self.path_for(scope)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
