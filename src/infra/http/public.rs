use std::{io::ErrorKind, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{Form, Path, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use bytes::Bytes;
use rand::Rng;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::{
        error::HttpError,
        stories::{RECENT_STORY_LIMIT, StoryService},
    },
    compose::CompositeCache,
    domain::assets::CompositeId,
    infra::{
        db::SqliteRepositories,
        media::{MediaStore, MediaStoreError},
    },
    inventory::{Inventory, QueryError},
    presentation::views::{
        AboutContext, AboutTemplate, IndexContext, IndexTemplate, ReadContext, ReadTemplate,
        StoryContext, StoryTemplate, StoryView, WriteContext, WriteTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
    resolve_error_to_http,
};

#[derive(Clone)]
pub struct HttpState {
    pub stories: Arc<StoryService>,
    pub inventory: Arc<Inventory>,
    pub composites: Arc<CompositeCache>,
    pub media: Arc<MediaStore>,
    pub db: Arc<SqliteRepositories>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/rand", get(random_read))
        .route("/r/{iid}", get(read_stories))
        .route("/w/{iid}", get(write_form).post(create_story))
        .route("/s/{id}", get(story_detail))
        .route("/c/{file}", get(composite_redirect))
        .route("/media/videos/{*path}", get(serve_video))
        .route("/media/cache/{*path}", get(serve_cached))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .route("/robots.txt", get(crate::infra::assets::serve_robots))
        .route("/humans.txt", get(crate::infra::assets::serve_humans))
        .route("/_health/db", get(public_health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Deserialize)]
struct StoryForm {
    story: String,
    #[serde(default)]
    language: Option<String>,
}

async fn index(State(state): State<HttpState>) -> Response {
    let stories = match state.stories.recent(RECENT_STORY_LIMIT).await {
        Ok(stories) => stories,
        Err(err) => return err.into_response(),
    };

    // The RNG must not live across an await.
    let picks = {
        let mut rng = rand::thread_rng();
        let video = state.inventory.random_video_identifier(&mut rng);
        let image = state.inventory.random_image_identifier(&mut rng);
        let fallback = if stories.is_empty() {
            None
        } else {
            Some(stories[rng.gen_range(0..stories.len())].image_id.clone())
        };
        video.and_then(|video| image.map(|image| (video, image, fallback)))
    };

    match picks {
        Ok((video_id, image_id, fallback_image_id)) => {
            let view = IndexContext {
                stories: stories.into_iter().map(StoryView::from).collect(),
                video_id,
                image_id: image_id.to_string(),
                fallback_image_id,
            };
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => inventory_failure("infra::http::public::index", err).into_response(),
    }
}

async fn about(State(state): State<HttpState>) -> Response {
    let picks = {
        let mut rng = rand::thread_rng();
        let video = state.inventory.random_video_identifier(&mut rng);
        video.and_then(|video| {
            state
                .inventory
                .random_image_identifier(&mut rng)
                .map(|image| (video, image))
        })
    };

    match picks {
        Ok((video_id, image_id)) => {
            let view = AboutContext {
                video_id,
                image_id: image_id.to_string(),
            };
            render_template_response(AboutTemplate { view }, StatusCode::OK)
        }
        Err(err) => inventory_failure("infra::http::public::about", err).into_response(),
    }
}

async fn random_read(State(state): State<HttpState>) -> Response {
    let picked = {
        let mut rng = rand::thread_rng();
        state.inventory.random_image_identifier(&mut rng)
    };

    match picked {
        Ok(id) => Redirect::to(&format!("/r/{id}")).into_response(),
        Err(err) => inventory_failure("infra::http::public::random_read", err).into_response(),
    }
}

async fn read_stories(State(state): State<HttpState>, Path(iid): Path<String>) -> Response {
    let id = match parse_composite_id("infra::http::public::read_stories", &iid) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match state.stories.for_image(&id).await {
        Ok(stories) => {
            let view = ReadContext {
                image_id: id.to_string(),
                stories: stories.into_iter().map(StoryView::from).collect(),
            };
            render_template_response(ReadTemplate { view }, StatusCode::OK)
        }
        Err(err) => err.into_response(),
    }
}

async fn write_form(Path(iid): Path<String>) -> Response {
    match parse_composite_id("infra::http::public::write_form", &iid) {
        Ok(id) => {
            let view = WriteContext::new(id.to_string());
            render_template_response(WriteTemplate { view }, StatusCode::OK)
        }
        Err(err) => err.into_response(),
    }
}

async fn create_story(
    State(state): State<HttpState>,
    Path(iid): Path<String>,
    headers: HeaderMap,
    Form(form): Form<StoryForm>,
) -> Response {
    let id = match parse_composite_id("infra::http::public::create_story", &iid) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    let language = form
        .language
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("en");
    let remote_addr = forwarded_for(&headers);

    match state
        .stories
        .create(&id, &form.story, language, remote_addr)
        .await
    {
        Ok(_) => Redirect::to(&format!("/r/{id}")).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn story_detail(State(state): State<HttpState>, Path(id): Path<i64>) -> Response {
    match state.stories.by_id(id).await {
        Ok(Some(story)) => {
            let view = StoryContext {
                story: StoryView::from(story),
            };
            render_template_response(StoryTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(),
        Err(err) => err.into_response(),
    }
}

async fn composite_redirect(State(state): State<HttpState>, Path(file): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::composite_redirect";

    let raw = file.strip_suffix(".jpg").unwrap_or(&file).to_string();
    let composites = Arc::clone(&state.composites);

    // Rendering opens and resamples three images; keep it off the runtime.
    let resolved = tokio::task::spawn_blocking(move || composites.resolve(&raw)).await;

    match resolved {
        Ok(Ok(path)) => {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            Redirect::to(&format!("/media/cache/{file_name}")).into_response()
        }
        Ok(Err(err)) => resolve_error_to_http(SOURCE, err).into_response(),
        Err(err) => HttpError::new(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to render composite",
            format!("render task failed: {err}"),
        )
        .into_response(),
    }
}

async fn serve_video(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    media_response(
        "infra::http::public::serve_video",
        &path,
        state.media.read_video(&path).await,
    )
}

async fn serve_cached(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    media_response(
        "infra::http::public::serve_cached",
        &path,
        state.media.read_cached(&path).await,
    )
}

fn media_response(
    source: &'static str,
    path: &str,
    result: Result<Bytes, MediaStoreError>,
) -> Response {
    match result {
        Ok(bytes) => build_media_response(path, bytes),
        Err(MediaStoreError::InvalidPath) => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested media file is not available",
        )
        .into_response(),
        Err(MediaStoreError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested media file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = source,
                path = %path,
                error = %err,
                "failed to read media file"
            );
            HttpError::new(
                source,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read media file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let mut response = Response::new(Body::from(bytes.clone()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&bytes.len().to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn fallback() -> Response {
    render_not_found_response()
}

fn parse_composite_id(source: &'static str, raw: &str) -> Result<CompositeId, HttpError> {
    CompositeId::parse(raw).map_err(|err| {
        HttpError::from_error(
            source,
            StatusCode::BAD_REQUEST,
            "Invalid composite identifier",
            &err,
        )
    })
}

fn inventory_failure(source: &'static str, err: QueryError) -> HttpError {
    // The inventory was validated at startup, so an empty pool here means
    // the invariant broke at runtime.
    HttpError::from_error(
        source,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Inventory unavailable",
        &err,
    )
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
