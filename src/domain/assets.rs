//! Asset vocabulary: categories, categorized images, composite identifiers.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Length of one per-category image identifier (a filename stem like `12`).
pub const SEGMENT_LEN: usize = 2;

/// Length of a composite identifier: one segment per fixed category.
pub const COMPOSITE_ID_LEN: usize = SEGMENT_LEN * Category::ALL.len();

/// Filename prefix carried by every video asset, e.g. `video-0017.mp4`.
pub const VIDEO_FILE_PREFIX: &str = "video-";

/// The fixed image categories, in load-bearing order.
///
/// The order defines how a composite identifier decomposes: bytes 0-1 name
/// an artifact, 2-3 a person, 4-5 a landscape. Reordering the variants
/// would silently re-key every cached composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Artifacts,
    People,
    Landscapes,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Artifacts, Category::People, Category::Landscapes];

    /// Name of the subdirectory holding this category's images.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Artifacts => "artifacts",
            Category::People => "people",
            Category::Landscapes => "landscapes",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Category::ALL
            .into_iter()
            .find(|category| category.dir_name() == name)
    }

    /// Byte offset of this category's segment within a composite identifier.
    fn segment_offset(self) -> usize {
        match self {
            Category::Artifacts => 0,
            Category::People => SEGMENT_LEN,
            Category::Landscapes => 2 * SEGMENT_LEN,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One indexed image file. The identifier is the filename stem, e.g. `12`
/// for `12.jpg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedImage {
    pub identifier: String,
    pub category: Category,
    pub path: PathBuf,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("composite identifier must be {COMPOSITE_ID_LEN} characters, got {actual}")]
    WrongLength { actual: usize },
    #[error("composite identifier must be ASCII alphanumeric")]
    InvalidCharacters,
}

/// A validated 6-character composite identifier.
///
/// Both a lookup key and a cache key: the same identifier always decodes to
/// the same three per-category segments, so the rendered composite is
/// content-addressable for as long as the inventory is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId(String);

impl CompositeId {
    /// Validate the shape of a raw identifier.
    ///
    /// Segments are indexed at fixed byte offsets, so the identifier must
    /// be ASCII; anything else is the same malformed-key condition as a
    /// wrong length.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        if raw.len() != COMPOSITE_ID_LEN || raw.chars().count() != COMPOSITE_ID_LEN {
            return Err(IdentifierError::WrongLength {
                actual: raw.chars().count(),
            });
        }
        if !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(IdentifierError::InvalidCharacters);
        }
        Ok(Self(raw.to_string()))
    }

    /// Concatenate one per-category segment in fixed category order.
    ///
    /// The inverse of [`CompositeId::segments`]: feeding the returned
    /// identifier back through decomposition yields the original triple.
    pub fn from_segments(artifacts: &str, people: &str, landscapes: &str) -> Self {
        debug_assert_eq!(artifacts.len(), SEGMENT_LEN);
        debug_assert_eq!(people.len(), SEGMENT_LEN);
        debug_assert_eq!(landscapes.len(), SEGMENT_LEN);
        Self(format!("{artifacts}{people}{landscapes}"))
    }

    /// Decompose into `(category, segment)` pairs in fixed category order.
    pub fn segments(&self) -> [(Category, &str); 3] {
        Category::ALL.map(|category| {
            let offset = category.segment_offset();
            (category, &self.0[offset..offset + SEGMENT_LEN])
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filename of the cached composite for this identifier.
    pub fn cache_file_name(&self) -> String {
        format!("{}.jpg", self.0)
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive a video identifier from its file path: the filename stem with the
/// fixed prefix stripped, e.g. `static/videos/video-0017.mp4` -> `0017`.
pub fn video_identifier(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let identifier = stem.strip_prefix(VIDEO_FILE_PREFIX).unwrap_or(stem);
    (!identifier.is_empty()).then(|| identifier.to_string())
}
