//! Reader-submitted captions ("stories") attached to composite images.

use time::OffsetDateTime;

use super::error::DomainError;

/// Upper bound on a story body, in characters.
pub const MAX_STORY_CHARS: usize = 10_000;

/// A persisted story. `image_id` is the composite identifier the story was
/// written for.
#[derive(Debug, Clone)]
pub struct Story {
    pub id: i64,
    pub image_id: String,
    pub body: String,
    pub language: String,
    pub created_at: OffsetDateTime,
}

/// A story submission before persistence.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub image_id: String,
    pub body: String,
    pub language: String,
    pub remote_addr: Option<String>,
}

/// Validate and normalize a submitted story body.
///
/// Leading and trailing whitespace is not part of the story.
pub fn validate_body(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("story body is empty"));
    }
    if trimmed.chars().count() > MAX_STORY_CHARS {
        return Err(DomainError::validation(format!(
            "story body exceeds {MAX_STORY_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}
