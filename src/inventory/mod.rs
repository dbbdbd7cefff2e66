//! The immutable asset inventory: built once at startup by the indexer,
//! queried lock-free for the lifetime of the process.

mod indexer;
mod query;

pub use indexer::{AssetIndexer, IndexError, MIN_IMAGE_COUNT};
pub use query::QueryError;

use crate::domain::assets::{CategorizedImage, Category};
use std::path::PathBuf;

/// Index of all known images and videos.
///
/// Constructed only through [`AssetIndexer::scan`], which enforces the
/// usability invariant; afterwards the inventory is immutable and safe to
/// share across any number of concurrent readers.
#[derive(Debug, Clone)]
pub struct Inventory {
    images: Vec<CategorizedImage>,
    videos: Vec<PathBuf>,
}

impl Inventory {
    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    pub fn num_videos(&self) -> usize {
        self.videos.len()
    }

    /// Distinct categories present, in fixed category order.
    pub fn categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|category| self.by_category(*category).next().is_some())
            .collect()
    }
}
