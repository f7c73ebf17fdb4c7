//! Sort selection for processed photos.
//!
//! The pipeline itself never sorts; consumers of a [`PhotoMap`] pick an order
//! here before rendering.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use std::str::FromStr;

use crate::types::{FullPhoto, PhotoMap};

/// Configured sort order for a photo list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Integer value of the file stem, e.g. `2.jpg` before `10.jpg`
    NumericalFileName,
    /// Lexicographic on the site-relative path
    FileName,
    /// File modification time
    ModifiedAt,
    /// EXIF capture time
    #[default]
    ImageTakenDate,
}

/// Comparator over processed photos.
pub type SortFn = fn(&FullPhoto, &FullPhoto) -> Ordering;

impl SortMode {
    /// All modes, in their documented order.
    pub const ALL: [SortMode; 4] = [
        SortMode::NumericalFileName,
        SortMode::FileName,
        SortMode::ModifiedAt,
        SortMode::ImageTakenDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::NumericalFileName => "numerical_file_name",
            SortMode::FileName => "file_name",
            SortMode::ModifiedAt => "modified_at",
            SortMode::ImageTakenDate => "image_taken_date",
        }
    }

    /// Map the mode to its comparator.
    pub fn comparator(&self) -> SortFn {
        match self {
            SortMode::NumericalFileName => numerical_file_name,
            SortMode::FileName => file_name,
            SortMode::ModifiedAt => modified_at,
            SortMode::ImageTakenDate => image_taken_date,
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = SortMode::ALL.iter().map(|m| m.as_str()).collect();
                format!("unknown sort mode '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Consume a photo mapping and return its photos in display order.
pub fn sort_photos(photos: PhotoMap, mode: SortMode, reverse: bool) -> Vec<FullPhoto> {
    let mut list: Vec<FullPhoto> = photos.into_values().collect();
    list.sort_by(mode.comparator());
    if reverse {
        list.reverse();
    }
    list
}

fn file_name(a: &FullPhoto, b: &FullPhoto) -> Ordering {
    a.src.cmp(&b.src)
}

/// Leading decimal digits of the file stem, like a lenient integer parse.
fn leading_number(src: &str) -> Option<u64> {
    let stem = Path::new(src).file_stem()?.to_str()?;
    let digits: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn numerical_file_name(a: &FullPhoto, b: &FullPhoto) -> Ordering {
    match (leading_number(&a.src), leading_number(&b.src)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| file_name(a, b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => file_name(a, b),
    }
}

fn modified_at(a: &FullPhoto, b: &FullPhoto) -> Ordering {
    a.stats.modified_at.cmp(&b.stats.modified_at)
}

// Photos without a capture time fall back to their byte size as the key.
fn image_taken_date(a: &FullPhoto, b: &FullPhoto) -> Ordering {
    let key = |p: &FullPhoto| {
        p.photo
            .date_time_original_ms
            .unwrap_or(p.stats.file_size as i64)
    };
    key(a).cmp(&key(b))
}
