//! Low-resolution blurred placeholder generation.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Gaussian sigma applied after downsampling.
const BLUR_SIGMA: f32 = 1.0;

/// Generates tiny blurred previews as `data:` URIs.
#[derive(Debug, Clone)]
pub struct PlaceholderGenerator {
    size: u32,
}

impl PlaceholderGenerator {
    /// Create a generator whose output fits in a `size` x `size` box.
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    /// Downsample, blur and encode as a base64 PNG data URI.
    ///
    /// Returns `None` if encoding fails.
    pub fn generate(&self, image: &DynamicImage) -> Option<String> {
        let small = image.thumbnail(self.size, self.size).blur(BLUR_SIGMA);

        let mut buffer = Cursor::new(Vec::new());
        small.write_to(&mut buffer, ImageFormat::Png).ok()?;

        Some(data_url("image/png", &buffer.into_inner()))
    }
}

/// Wrap raw JPEG preview bytes (an EXIF thumbnail) as a data URI.
pub fn embedded_data_url(jpeg: &[u8]) -> String {
    data_url("image/jpeg", jpeg)
}

fn data_url(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, BASE64.encode(bytes))
}
