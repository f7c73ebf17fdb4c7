//! Core data types for the Shutter indexing pipeline.
//!
//! Field names are serialized in camelCase because the same records are read
//! back from the cache file and handed to the page-rendering layer as-is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Filesystem metadata probed fresh for every file on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    /// File size in bytes. The sole staleness key for cache reuse.
    pub file_size: u64,

    /// Modification time in milliseconds since the Unix epoch
    pub modified_at: i64,
}

/// The result of metadata extraction for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedPhoto {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Low-resolution placeholder as a base64 `data:` URI
    #[serde(rename = "blurDataURL", default)]
    pub blur_data_url: Option<String>,

    /// Capture time from embedded EXIF, in epoch milliseconds
    #[serde(default)]
    pub date_time_original_ms: Option<i64>,

    /// Display URL template on a remote resize service
    #[serde(default)]
    pub thumbnail_src: Option<String>,
}

/// A processed photo together with its file stats and site-relative source.
///
/// This is the unit persisted in the cache and exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullPhoto {
    #[serde(flatten)]
    pub photo: ProcessedPhoto,

    #[serde(flatten)]
    pub stats: FileStats,

    /// Path relative to the serving root, e.g. `/photos/beach.jpg`
    pub src: String,
}

impl FullPhoto {
    pub fn new(photo: ProcessedPhoto, stats: FileStats, src: impl Into<String>) -> Self {
        Self {
            photo,
            stats,
            src: src.into(),
        }
    }
}

/// Snapshot of the options that influence extraction output.
///
/// Only ever compared as a whole against a cache file's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOptions {
    /// Prefer the EXIF-embedded thumbnail over a generated blur
    pub use_thumbnails: bool,

    /// Skip placeholder generation entirely
    pub disable_blur_generation: bool,
}

/// Absolute file path to processed photo, for one scope.
///
/// A `BTreeMap` so the cache file serializes in a stable order.
pub type PhotoMap = BTreeMap<String, FullPhoto>;

/// Processing statistics for one run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProcessingStats {
    /// Files that went through extraction
    pub extracted: usize,

    /// Files served from the cache
    pub cached: usize,

    /// Files skipped for their type
    pub unsupported: usize,

    /// Files whose extraction failed
    pub failed: usize,

    /// Wall-clock duration of the run in seconds
    pub total_seconds: f64,
}

impl ProcessingStats {
    /// Number of photos that ended up in the output mapping.
    pub fn indexed(&self) -> usize {
        self.extracted + self.cached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_full_photo() -> FullPhoto {
        FullPhoto::new(
            ProcessedPhoto {
                width: 1920,
                height: 1080,
                blur_data_url: Some("data:image/png;base64,AAAA".to_string()),
                date_time_original_ms: Some(1_662_198_295_000),
                thumbnail_src: None,
            },
            FileStats {
                file_size: 2048,
                modified_at: 1_700_000_000_000,
            },
            "/photos/beach.jpg",
        )
    }

    #[test]
    fn test_full_photo_serializes_flat_camel_case() {
        let json = serde_json::to_value(sample_full_photo()).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj["width"], 1920);
        assert_eq!(obj["fileSize"], 2048);
        assert_eq!(obj["modifiedAt"], 1_700_000_000_000i64);
        assert_eq!(obj["blurDataURL"], "data:image/png;base64,AAAA");
        assert_eq!(obj["dateTimeOriginalMs"], 1_662_198_295_000i64);
        assert!(obj["thumbnailSrc"].is_null());
        assert_eq!(obj["src"], "/photos/beach.jpg");
        assert!(!obj.contains_key("photo"));
        assert!(!obj.contains_key("stats"));
    }

    #[test]
    fn test_full_photo_reads_back_from_json() {
        let json = r#"{
            "width": 10, "height": 20, "blurDataURL": null,
            "dateTimeOriginalMs": null, "thumbnailSrc": null,
            "fileSize": 300, "modifiedAt": 5, "src": "/photos/b.png"
        }"#;
        let photo: FullPhoto = serde_json::from_str(json).unwrap();
        assert_eq!(photo.photo.width, 10);
        assert_eq!(photo.photo.height, 20);
        assert_eq!(photo.stats.file_size, 300);
        assert_eq!(photo.src, "/photos/b.png");
    }

    #[test]
    fn test_processing_options_field_names() {
        let options = ProcessingOptions {
            use_thumbnails: true,
            disable_blur_generation: false,
        };
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(json, r#"{"useThumbnails":true,"disableBlurGeneration":false}"#);
    }

    #[test]
    fn test_stats_indexed() {
        let stats = ProcessingStats {
            extracted: 2,
            cached: 3,
            unsupported: 1,
            failed: 1,
            total_seconds: 0.5,
        };
        assert_eq!(stats.indexed(), 5);
    }
}
