//! Image decoding with content-based format detection.

use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

use crate::error::PipelineError;

/// Read pixel dimensions from the image header without decoding pixels.
///
/// A zero width or height is an extraction failure, never a default.
pub fn read_dimensions(bytes: &[u8], path: &Path) -> Result<(u32, u32), PipelineError> {
    let (width, height) = reader_for(bytes, path)?
        .into_dimensions()
        .map_err(|e| extraction_error(path, format!("Cannot read dimensions: {e}")))?;

    if width == 0 || height == 0 {
        return Err(extraction_error(
            path,
            format!("Invalid image size {width}x{height}"),
        ));
    }
    Ok((width, height))
}

/// Fully decode an image from an in-memory buffer.
pub fn decode_image(bytes: &[u8], path: &Path) -> Result<DynamicImage, PipelineError> {
    reader_for(bytes, path)?
        .decode()
        .map_err(|e| extraction_error(path, e.to_string()))
}

// Content sniffing first, extension as a fallback: a PNG named `.jpg`
// still decodes.
fn reader_for<'a>(
    bytes: &'a [u8],
    path: &Path,
) -> Result<ImageReader<Cursor<&'a [u8]>>, PipelineError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| extraction_error(path, format!("Cannot detect image format: {e}")))?;

    if reader.format().is_none() {
        let format = ImageFormat::from_path(path).map_err(|_| PipelineError::UnsupportedFormat {
            path: path.to_path_buf(),
            format: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_string(),
        })?;
        reader.set_format(format);
    }
    Ok(reader)
}

fn extraction_error(path: &Path, message: String) -> PipelineError {
    PipelineError::Extraction {
        path: path.to_path_buf(),
        message,
    }
}
