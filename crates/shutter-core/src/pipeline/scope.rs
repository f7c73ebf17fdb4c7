//! Scopes: the root photo directory or one named sub-directory, each with
//! its own cache file.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};

/// Cache file name used by the root scope.
pub const ROOT_CACHE_FILE: &str = "photos.json";

/// A logical grouping of photos that gets an independent cache file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// The photos directory itself
    Root,
    /// A sub-directory, as a `/`-separated path relative to the photos directory
    Named(String),
}

impl Scope {
    /// Build a scope from an optional name. `None`, empty and `/` are the root.
    pub fn parse(name: Option<&str>) -> PipelineResult<Self> {
        let trimmed = name.map(|n| n.trim().trim_matches('/')).unwrap_or("");
        if trimmed.is_empty() {
            return Ok(Scope::Root);
        }
        Self::from_segments(&trimmed.split('/').collect::<Vec<_>>())
    }

    /// Build a scope from route-style path segments, e.g. `["2023", "summer"]`.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> PipelineResult<Self> {
        if segments.is_empty() {
            return Ok(Scope::Root);
        }
        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            let segment = segment.as_ref();
            if segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.contains('/')
                || segment.contains('\\')
            {
                return Err(PipelineError::InvalidScope(format!(
                    "bad path segment '{segment}'"
                )));
            }
            parts.push(segment);
        }
        Ok(Scope::Named(parts.join("/")))
    }

    /// The scope name, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        match self {
            Scope::Root => None,
            Scope::Named(name) => Some(name),
        }
    }

    /// Source directory for this scope.
    pub fn directory(&self, photos_dir: &Path) -> PathBuf {
        match self {
            Scope::Root => photos_dir.to_path_buf(),
            Scope::Named(name) => name.split('/').fold(photos_dir.to_path_buf(), |p, s| p.join(s)),
        }
    }

    /// Cache file name. Percent-encoding keeps distinct scopes distinct.
    pub fn cache_file_name(&self) -> String {
        match self {
            Scope::Root => ROOT_CACHE_FILE.to_string(),
            Scope::Named(name) => format!("photos-{}.json", urlencoding::encode(name)),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Root => f.write_str("<root>"),
            Scope::Named(name) => f.write_str(name),
        }
    }
}

/// Lexically clean a path: `.` components are dropped and `..` cancels the
/// preceding normal component. The file system is not consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir
                if matches!(out.components().next_back(), Some(Component::Normal(_))) =>
            {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Site-relative `src` for a file: its path below the serving root, with a
/// leading `/` and forward slashes. Fails when the file is not under
/// `public_dir`, since such a file has no URL on the site.
pub fn site_src(path: &Path, public_dir: &Path) -> PipelineResult<String> {
    let path = normalize(path);
    let root = normalize(public_dir);
    let relative = path
        .strip_prefix(&root)
        .map_err(|_| PipelineError::OutsidePublicDir {
            path: path.clone(),
            public_dir: root.clone(),
        })?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(format!("/{}", parts.join("/")))
}
