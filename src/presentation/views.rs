use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, macros::format_description};

use crate::application::error::{ErrorReport, HttpError};
use crate::domain::stories::{MAX_STORY_CHARS, Story};

/// Characters of a story body shown in list teasers.
const TEASER_CHARS: usize = 50;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response() -> Response {
    let view = ErrorPageView::not_found();
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct StoryView {
    pub id: i64,
    pub image_id: String,
    pub body: String,
    pub teaser: String,
    pub written: String,
}

impl From<Story> for StoryView {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            image_id: story.image_id,
            teaser: teaser(&story.body),
            written: format_written(story.created_at),
            body: story.body,
        }
    }
}

pub struct IndexContext {
    pub stories: Vec<StoryView>,
    pub video_id: String,
    pub image_id: String,
    pub fallback_image_id: Option<String>,
}

pub struct ReadContext {
    pub image_id: String,
    pub stories: Vec<StoryView>,
}

pub struct WriteContext {
    pub image_id: String,
    pub max_chars: usize,
}

impl WriteContext {
    pub fn new(image_id: String) -> Self {
        Self {
            image_id,
            max_chars: MAX_STORY_CHARS,
        }
    }
}

pub struct StoryContext {
    pub story: StoryView,
}

pub struct AboutContext {
    pub video_id: String,
    pub image_id: String,
}

pub struct ErrorPageView {
    pub heading: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            heading: "Not found".to_string(),
            message: "The page you were looking for does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: IndexContext,
}

#[derive(Template)]
#[template(path = "read.html")]
pub struct ReadTemplate {
    pub view: ReadContext,
}

#[derive(Template)]
#[template(path = "write.html")]
pub struct WriteTemplate {
    pub view: WriteContext,
}

#[derive(Template)]
#[template(path = "story.html")]
pub struct StoryTemplate {
    pub view: StoryContext,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub view: AboutContext,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: ErrorPageView,
}

fn format_written(at: OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] [hour]:[minute]");
    at.format(&format)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

fn teaser(body: &str) -> String {
    let mut chars = body.chars();
    let clipped: String = chars.by_ref().take(TEASER_CHARS).collect();
    if chars.next().is_some() {
        format!("{clipped}…")
    } else {
        clipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn teaser_clips_on_character_boundaries() {
        assert_eq!(teaser("short"), "short");

        let long: String = "å".repeat(60);
        let clipped = teaser(&long);
        assert_eq!(clipped.chars().count(), TEASER_CHARS + 1);
        assert!(clipped.ends_with('…'));
    }

    #[test]
    fn written_uses_day_first_format() {
        let view = StoryView::from(Story {
            id: 1,
            image_id: "011020".to_string(),
            body: "caption".to_string(),
            language: "en".to_string(),
            created_at: datetime!(2024-03-07 09:05 UTC),
        });
        assert_eq!(view.written, "07.03.2024 09:05");
    }
}
