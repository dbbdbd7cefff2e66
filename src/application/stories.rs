use std::sync::Arc;

use axum::http::StatusCode;

use crate::application::error::HttpError;
use crate::application::repos::{RepoError, StoriesRepo};
use crate::domain::assets::CompositeId;
use crate::domain::stories::{NewStory, Story};

const SOURCE: &str = "application::stories::StoryService";

/// Number of stories shown on the index page.
pub const RECENT_STORY_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct StoryService {
    stories: Arc<dyn StoriesRepo>,
}

impl StoryService {
    pub fn new(stories: Arc<dyn StoriesRepo>) -> Self {
        Self { stories }
    }

    /// Validate and persist a caption for a composite identifier.
    pub async fn create(
        &self,
        image_id: &CompositeId,
        body: &str,
        language: &str,
        remote_addr: Option<String>,
    ) -> Result<i64, HttpError> {
        let body = crate::domain::stories::validate_body(body).map_err(|err| {
            HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Story could not be accepted",
                &err,
            )
        })?;

        let story = NewStory {
            image_id: image_id.as_str().to_string(),
            body,
            language: language.to_string(),
            remote_addr,
        };

        self.stories
            .insert_story(story)
            .await
            .map_err(|err| repo_failure("insert_story", err))
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<Story>, HttpError> {
        self.stories
            .list_recent(limit)
            .await
            .map_err(|err| repo_failure("list_recent", err))
    }

    pub async fn for_image(&self, image_id: &CompositeId) -> Result<Vec<Story>, HttpError> {
        self.stories
            .list_for_image(image_id.as_str())
            .await
            .map_err(|err| repo_failure("list_for_image", err))
    }

    pub async fn by_id(&self, id: i64) -> Result<Option<Story>, HttpError> {
        self.stories
            .find_by_id(id)
            .await
            .map_err(|err| repo_failure("find_by_id", err))
    }
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load stories",
        format!("{operation} failed: {err}"),
    )
}
