//! Local metadata extraction from raw image bytes.
//!
//! Dimensions are mandatory; capture time and placeholder are best-effort
//! and degrade to `None` with a log line.

use std::path::Path;

use super::decode::{decode_image, read_dimensions};
use super::metadata::MetadataExtractor;
use super::placeholder::{embedded_data_url, PlaceholderGenerator};
use crate::error::PipelineResult;
use crate::types::{ProcessedPhoto, ProcessingOptions};

/// CPU-bound extractor run inside worker pool units.
#[derive(Debug, Clone)]
pub struct LocalExtractor {
    placeholder: PlaceholderGenerator,
}

impl LocalExtractor {
    pub fn new(placeholder_size: u32) -> Self {
        Self {
            placeholder: PlaceholderGenerator::new(placeholder_size),
        }
    }

    /// Derive a [`ProcessedPhoto`] from an image file's bytes.
    pub fn extract(
        &self,
        path: &Path,
        bytes: &[u8],
        options: &ProcessingOptions,
    ) -> PipelineResult<ProcessedPhoto> {
        let (width, height) = read_dimensions(bytes, path)?;

        let exif = MetadataExtractor::extract(bytes).unwrap_or_else(|| {
            tracing::trace!("No EXIF data in {:?}", path);
            Default::default()
        });

        let embedded = if options.use_thumbnails {
            exif.thumbnail.as_deref().map(embedded_data_url)
        } else {
            None
        };

        let blur_data_url = match embedded {
            Some(url) => Some(url),
            None if options.disable_blur_generation => None,
            None => self.generate_blur(path, bytes),
        };

        Ok(ProcessedPhoto {
            width,
            height,
            blur_data_url,
            date_time_original_ms: exif.date_time_original_ms,
            thumbnail_src: None,
        })
    }

    fn generate_blur(&self, path: &Path, bytes: &[u8]) -> Option<String> {
        match decode_image(bytes, path) {
            Ok(image) => {
                let url = self.placeholder.generate(&image);
                if url.is_none() {
                    tracing::warn!("Failed to encode placeholder for {:?}", path);
                }
                url
            }
            Err(e) => {
                tracing::warn!("No placeholder for {:?}: {}", path, e);
                None
            }
        }
    }
}
