//! EXIF metadata extraction: capture time and the embedded preview.

use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use std::io::Cursor;

/// Textual layout of EXIF date/time fields.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// The parts of the EXIF block the pipeline uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifSummary {
    /// `DateTimeOriginal` in epoch milliseconds
    pub date_time_original_ms: Option<i64>,

    /// Raw JPEG bytes of the IFD1 thumbnail
    pub thumbnail: Option<Vec<u8>>,
}

/// Extracts EXIF metadata from image bytes.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Read the EXIF block from an in-memory image.
    ///
    /// Returns `None` if the file has no EXIF data or it cannot be parsed.
    /// Missing individual fields are simply absent from the summary.
    pub fn extract(bytes: &[u8]) -> Option<ExifSummary> {
        let exif = Reader::new()
            .read_from_container(&mut Cursor::new(bytes))
            .ok()?;

        Some(ExifSummary {
            date_time_original_ms: Self::get_ascii(&exif, Tag::DateTimeOriginal)
                .and_then(|s| parse_date_time_original(&s)),
            thumbnail: Self::get_thumbnail(&exif),
        })
    }

    /// Raw ASCII value of a primary-image field.
    fn get_ascii(exif: &Exif, tag: Tag) -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        match &field.value {
            Value::Ascii(values) => values
                .first()
                .and_then(|v| std::str::from_utf8(v).ok())
                .map(|s| s.trim_end_matches('\0').to_string()),
            _ => None,
        }
    }

    fn get_u32(exif: &Exif, tag: Tag, ifd: In) -> Option<u32> {
        exif.get_field(tag, ifd).and_then(|f| match &f.value {
            Value::Short(v) => v.first().map(|&x| x as u32),
            Value::Long(v) => v.first().copied(),
            _ => None,
        })
    }

    /// The JPEG thumbnail stored in IFD1. Offsets are relative to the TIFF
    /// header, which is where `Exif::buf` starts.
    fn get_thumbnail(exif: &Exif) -> Option<Vec<u8>> {
        let offset = Self::get_u32(exif, Tag::JPEGInterchangeFormat, In::THUMBNAIL)? as usize;
        let length =
            Self::get_u32(exif, Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)? as usize;
        if length == 0 {
            return None;
        }
        exif.buf()
            .get(offset..offset.checked_add(length)?)
            .map(|bytes| bytes.to_vec())
    }
}

/// Parse an EXIF `YYYY:MM:DD HH:MM:SS` timestamp into epoch milliseconds.
///
/// EXIF carries no zone; the value is read as UTC.
pub fn parse_date_time_original(value: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(value.trim(), EXIF_DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}
