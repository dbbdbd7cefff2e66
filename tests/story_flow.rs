//! End-to-end story submission and reading through the public router.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use image::{Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use trittico::application::repos::StoriesRepo;
use trittico::application::stories::StoryService;
use trittico::compose::CompositeCache;
use trittico::infra::db::SqliteRepositories;
use trittico::infra::http::{HttpState, build_router};
use trittico::infra::media::MediaStore;
use trittico::inventory::AssetIndexer;

fn write_jpeg(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(path)
        .expect("write fixture jpeg");
}

async fn build_app(root: &TempDir) -> Router {
    let images = root.path().join("images");
    for (category, ids) in [
        ("artifacts", ["01", "02", "03", "04"]),
        ("people", ["10", "11", "12", "13"]),
        ("landscapes", ["20", "21", "22", "23"]),
    ] {
        let dir = images.join(category);
        fs::create_dir_all(&dir).expect("category dir");
        for id in ids {
            write_jpeg(&dir.join(format!("{id}.jpg")), 320, 300, [90, 90, 90]);
        }
    }
    let videos = root.path().join("videos");
    fs::create_dir_all(&videos).expect("videos dir");
    fs::write(videos.join("video-0001.mp4"), b"stub").expect("video stub");
    let cache_dir = root.path().join("cache");

    let inventory = Arc::new(
        AssetIndexer::new(&images, &videos)
            .scan()
            .expect("usable inventory"),
    );

    let pool = SqliteRepositories::connect("sqlite::memory:", 1)
        .await
        .expect("pool");
    SqliteRepositories::run_migrations(&pool)
        .await
        .expect("migrations");
    let repositories = Arc::new(SqliteRepositories::new(pool));
    let stories_repo: Arc<dyn StoriesRepo> = repositories.clone();

    build_router(HttpState {
        stories: Arc::new(StoryService::new(stories_repo)),
        composites: Arc::new(CompositeCache::new(Arc::clone(&inventory), &cache_dir)),
        media: Arc::new(MediaStore::new(videos.clone(), cache_dir.clone())),
        inventory,
        db: repositories,
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn html(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 page")
}

#[tokio::test]
async fn write_form_renders_for_a_valid_identifier() {
    let root = TempDir::new().expect("temp dir");
    let app = build_app(&root).await;

    let response = app.oneshot(get("/w/011020")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let page = html(response).await;
    assert!(page.contains(r#"action="/w/011020""#));
    assert!(page.contains(r#"name="story""#));
}

#[tokio::test]
async fn write_form_rejects_a_malformed_identifier() {
    let root = TempDir::new().expect("temp dir");
    let app = build_app(&root).await;

    let response = app.oneshot(get("/w/01_020")).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submitted_story_appears_on_the_read_page() {
    let root = TempDir::new().expect("temp dir");
    let app = build_app(&root).await;

    let response = app
        .clone()
        .oneshot(post_form(
            "/w/011020",
            "story=Three+rooms%2C+one+evening.&language=en",
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("redirect location");
    assert_eq!(location, "/r/011020");

    let read = app.oneshot(get("/r/011020")).await.expect("response");
    assert_eq!(read.status(), StatusCode::OK);
    assert!(html(read).await.contains("Three rooms, one evening."));
}

#[tokio::test]
async fn blank_story_is_rejected() {
    let root = TempDir::new().expect("temp dir");
    let app = build_app(&root).await;

    for body in ["story=", "story=+++%0A+"] {
        let response = app
            .clone()
            .oneshot(post_form("/w/011020", body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body:?}");
    }
}

#[tokio::test]
async fn oversized_story_is_rejected() {
    let root = TempDir::new().expect("temp dir");
    let app = build_app(&root).await;

    let long = "x".repeat(10_001);
    let response = app
        .oneshot(post_form("/w/011020", &format!("story={long}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn story_detail_shows_the_full_body() {
    let root = TempDir::new().expect("temp dir");
    let app = build_app(&root).await;

    let created = app
        .clone()
        .oneshot(post_form("/w/021121", "story=A+longer+account."))
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::SEE_OTHER);

    // First story in an empty database.
    let detail = app.oneshot(get("/s/1")).await.expect("response");
    assert_eq!(detail.status(), StatusCode::OK);
    let page = html(detail).await;
    assert!(page.contains("A longer account."));
    assert!(page.contains("/r/021121"));
}

#[tokio::test]
async fn unknown_story_id_is_not_found() {
    let root = TempDir::new().expect("temp dir");
    let app = build_app(&root).await;

    let response = app.oneshot(get("/s/4242")).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn front_page_lists_recent_stories() {
    let root = TempDir::new().expect("temp dir");
    let app = build_app(&root).await;

    for body in ["story=First.", "story=Second."] {
        let response = app
            .clone()
            .oneshot(post_form("/w/011020", body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let index = app.oneshot(get("/")).await.expect("response");
    assert_eq!(index.status(), StatusCode::OK);
    let page = html(index).await;
    assert!(page.contains("First."));
    assert!(page.contains("Second."));
    assert!(page.contains("/s/1"));
    assert!(page.contains("/s/2"));
}
