//! Read-only query surface over a built [`Inventory`].
//!
//! The inventory is immutable after construction, so every operation here
//! is safe for unlimited concurrent callers without synchronization. The
//! random pickers take an explicit RNG so tests can seed them.

use rand::Rng;
use thiserror::Error;

use crate::domain::assets::{video_identifier, CategorizedImage, Category, CompositeId};

use super::Inventory;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("no {category} image with identifier `{identifier}`")]
    AssetNotFound {
        category: Category,
        identifier: String,
    },
    #[error("cannot pick a random image: category {0} has no images")]
    IncompleteCategories(Category),
    #[error("cannot pick a random video: inventory has no videos")]
    NoVideos,
}

impl Inventory {
    /// All images of a category, in scan order. Empty when the category has
    /// no images.
    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &CategorizedImage> {
        self.images.iter().filter(move |img| img.category == category)
    }

    /// Exact lookup of one image by category and identifier.
    pub fn by_category_and_identifier(
        &self,
        category: Category,
        identifier: &str,
    ) -> Result<&CategorizedImage, QueryError> {
        self.by_category(category)
            .find(|img| img.identifier == identifier)
            .ok_or_else(|| QueryError::AssetNotFound {
                category,
                identifier: identifier.to_string(),
            })
    }

    /// Draw one identifier independently and uniformly from EACH category's
    /// own pool and concatenate them in fixed category order.
    pub fn random_image_identifier<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<CompositeId, QueryError> {
        let mut segments = Category::ALL.map(|_| "");
        for (slot, category) in segments.iter_mut().zip(Category::ALL) {
            let pool: Vec<&CategorizedImage> = self.by_category(category).collect();
            if pool.is_empty() {
                return Err(QueryError::IncompleteCategories(category));
            }
            *slot = &pool[rng.gen_range(0..pool.len())].identifier;
        }
        Ok(CompositeId::from_segments(
            segments[0],
            segments[1],
            segments[2],
        ))
    }

    /// Draw one video uniformly and derive its identifier.
    pub fn random_video_identifier<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<String, QueryError> {
        if self.videos.is_empty() {
            return Err(QueryError::NoVideos);
        }
        let path = &self.videos[rng.gen_range(0..self.videos.len())];
        video_identifier(path).ok_or(QueryError::NoVideos)
    }
}
