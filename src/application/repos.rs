//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::stories::{NewStory, Story};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait StoriesRepo: Send + Sync {
    /// Insert a story and return its generated id.
    async fn insert_story(&self, story: NewStory) -> Result<i64, RepoError>;

    /// Newest stories first, at most `limit`.
    async fn list_recent(&self, limit: u32) -> Result<Vec<Story>, RepoError>;

    /// All stories for one composite identifier, newest first.
    async fn list_for_image(&self, image_id: &str) -> Result<Vec<Story>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Story>, RepoError>;
}
