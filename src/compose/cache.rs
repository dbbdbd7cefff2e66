//! Identifier-addressed composite-image cache.
//!
//! A composite identifier resolves to a file at a deterministic path under
//! the cache directory. Existence of that file IS the memoization signal:
//! no index is kept, entries survive restarts, and nothing here ever
//! mutates or deletes an entry.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use dashmap::DashMap;
use image::ImageFormat;
use metrics::counter;
use thiserror::Error;
use tracing::info;

use crate::domain::assets::{Category, CompositeId, IdentifierError};
use crate::inventory::{Inventory, QueryError};

use super::lock::mutex_lock;
use super::renderer::{self, RenderError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid composite identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),
    #[error("no {category} image with identifier `{identifier}`")]
    AssetNotFound {
        category: Category,
        identifier: String,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to prepare cache directory `{path}`: {source}")]
    CacheInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode composite `{id}`: {source}")]
    Encode {
        id: CompositeId,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to publish composite `{id}`: {source}")]
    Persist {
        id: CompositeId,
        #[source]
        source: std::io::Error,
    },
}

/// Lazily renders and persists composite images, memoized by filesystem
/// presence.
///
/// `resolve` is synchronous blocking IO; callers on an async runtime should
/// wrap it in `spawn_blocking`. Concurrent resolutions of the same
/// identifier are harmless by construction (the output is a deterministic
/// function of identifier + inventory, published atomically); the keyed
/// guard below only exists to avoid paying for the same render twice.
pub struct CompositeCache {
    inventory: Arc<Inventory>,
    cache_dir: PathBuf,
    in_flight: DashMap<CompositeId, Arc<Mutex<()>>>,
}

impl CompositeCache {
    pub fn new(inventory: Arc<Inventory>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            inventory,
            cache_dir: cache_dir.into(),
            in_flight: DashMap::new(),
        }
    }

    /// Deterministic cache path for an identifier.
    pub fn cache_path(&self, id: &CompositeId) -> PathBuf {
        self.cache_dir.join(id.cache_file_name())
    }

    /// Resolve a raw identifier to the path of its cached composite,
    /// rendering and persisting it first if this identifier has never been
    /// seen. Failed resolutions cache nothing and re-run from scratch on
    /// the next call.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, ResolveError> {
        let started_at = Instant::now();
        let id = CompositeId::parse(raw)?;
        let cache_path = self.cache_path(&id);

        if cache_path.exists() {
            counter!("trittico_composite_cache_hit_total").increment(1);
            info!(
                target = "trittico::compose",
                op = "cache::resolve",
                result = "cache_hit",
                id = %id,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                cache_path = %cache_path.display(),
                "Composite served from cache"
            );
            return Ok(cache_path);
        }

        // Per-identifier guard: waiters on the SAME identifier queue here
        // while unrelated identifiers proceed untouched. Held only across
        // one render-and-publish.
        let guard_cell = self
            .in_flight
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = mutex_lock(&guard_cell, "trittico::compose", "cache::resolve");
            if cache_path.exists() {
                // A concurrent builder finished while this caller waited.
                counter!("trittico_composite_cache_hit_total").increment(1);
                Ok(cache_path.clone())
            } else {
                self.build(&id, &cache_path)
            }
        };
        self.in_flight.remove(&id);

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        match &result {
            Ok(path) => {
                info!(
                    target = "trittico::compose",
                    op = "cache::resolve",
                    result = "cache_miss",
                    id = %id,
                    elapsed_ms,
                    cache_path = %path.display(),
                    "Composite rendered and published"
                );
            }
            Err(err) => {
                info!(
                    target = "trittico::compose",
                    op = "cache::resolve",
                    result = "error",
                    id = %id,
                    elapsed_ms,
                    error = %err,
                    "Composite resolution failed"
                );
            }
        }
        result
    }

    /// The miss path: decompose, resolve all three assets, compose, publish.
    fn build(&self, id: &CompositeId, cache_path: &PathBuf) -> Result<PathBuf, ResolveError> {
        counter!("trittico_composite_cache_miss_total").increment(1);

        let mut sources = Vec::with_capacity(Category::ALL.len());
        for (category, segment) in id.segments() {
            let img = self
                .inventory
                .by_category_and_identifier(category, segment)
                .map_err(|err| match err {
                    QueryError::AssetNotFound {
                        category,
                        identifier,
                    } => ResolveError::AssetNotFound {
                        category,
                        identifier,
                    },
                    // Exact lookup only ever misses.
                    other => ResolveError::AssetNotFound {
                        category,
                        identifier: other.to_string(),
                    },
                })?;
            sources.push(img.path.as_path());
        }

        let render_started_at = Instant::now();
        let composed = renderer::compose([sources[0], sources[1], sources[2]])?;
        metrics::histogram!("trittico_composite_render_ms")
            .record(render_started_at.elapsed().as_millis() as f64);

        std::fs::create_dir_all(&self.cache_dir).map_err(|source| ResolveError::CacheInit {
            path: self.cache_dir.clone(),
            source,
        })?;

        // Write-then-publish: the composite becomes visible under its final
        // name only once fully written, so a concurrent reader never
        // observes a partial file.
        let staged = tempfile::Builder::new()
            .suffix(".jpg")
            .tempfile_in(&self.cache_dir)
            .map_err(|source| ResolveError::Persist {
                id: id.clone(),
                source,
            })?;
        composed
            .save_with_format(staged.path(), ImageFormat::Jpeg)
            .map_err(|source| ResolveError::Encode {
                id: id.clone(),
                source,
            })?;
        match staged.persist(cache_path) {
            Ok(_) => {}
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                // Another builder published the same identifier concurrently;
                // its bytes are equivalent.
            }
            Err(err) => {
                return Err(ResolveError::Persist {
                    id: id.clone(),
                    source: err.error,
                });
            }
        }

        Ok(cache_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::AssetIndexer;
    use image::{Rgb, RgbImage};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_jpeg(path: &Path, width: u32, height: u32, color: [u8; 3]) {
        RgbImage::from_pixel(width, height, Rgb(color))
            .save(path)
            .expect("write fixture jpeg");
    }

    /// A usable inventory: 4 images per category, one video.
    fn fixture(root: &TempDir) -> Arc<Inventory> {
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

        let inventory = AssetIndexer::new(images, videos)
            .scan()
            .expect("usable inventory");
        Arc::new(inventory)
    }

    #[test]
    fn resolve_renders_and_persists_on_first_call() {
        let root = TempDir::new().expect("temp dir");
        let cache = CompositeCache::new(fixture(&root), root.path().join("cache"));

        let path = cache.resolve("011020").expect("resolved");
        assert!(path.exists());
        assert_eq!(path, root.path().join("cache/011020.jpg"));

        let composed = image::open(&path).expect("readable composite");
        assert_eq!(composed.width(), renderer::CANVAS_WIDTH);
        assert_eq!(composed.height(), renderer::CANVAS_HEIGHT);
    }

    #[test]
    fn resolve_is_idempotent_and_hits_skip_source_io() {
        let root = TempDir::new().expect("temp dir");
        let inventory = fixture(&root);
        let cache = CompositeCache::new(inventory, root.path().join("cache"));

        let first = cache.resolve("021121").expect("first resolution");
        // With every source gone, only the existence-check fast path can
        // satisfy the second call.
        fs::remove_dir_all(root.path().join("images")).expect("drop sources");
        let second = cache.resolve("021121").expect("second resolution");
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_identifiers_create_no_cache_file() {
        let root = TempDir::new().expect("temp dir");
        let cache_dir = root.path().join("cache");
        let cache = CompositeCache::new(fixture(&root), &cache_dir);

        for raw in ["", "0110", "01102031", "01-020"] {
            assert!(matches!(
                cache.resolve(raw),
                Err(ResolveError::InvalidIdentifier(_))
            ));
        }
        assert!(!cache_dir.exists());
    }

    #[test]
    fn missing_segment_aborts_without_partial_cache() {
        let root = TempDir::new().expect("temp dir");
        let cache_dir = root.path().join("cache");
        let cache = CompositeCache::new(fixture(&root), &cache_dir);

        // People segment "99" does not exist; the failure must repeat.
        for _ in 0..3 {
            match cache.resolve("019921") {
                Err(ResolveError::AssetNotFound {
                    category,
                    identifier,
                }) => {
                    assert_eq!(category, Category::People);
                    assert_eq!(identifier, "99");
                }
                other => panic!("expected AssetNotFound, got {other:?}"),
            }
        }
        assert!(!cache_dir.join("019921.jpg").exists());
    }

    #[test]
    fn unreadable_source_aborts_without_partial_cache() {
        let root = TempDir::new().expect("temp dir");
        let cache_dir = root.path().join("cache");
        let inventory = fixture(&root);
        // Corrupt one indexed source after the scan.
        fs::write(root.path().join("images/people/10.jpg"), b"not a jpeg")
            .expect("corrupt source");
        let cache = CompositeCache::new(inventory, &cache_dir);

        assert!(matches!(
            cache.resolve("011020"),
            Err(ResolveError::Render(RenderError::Open { .. }))
        ));
        assert!(!cache_dir.join("011020.jpg").exists());
        // No stray staging files either.
        if cache_dir.exists() {
            assert_eq!(fs::read_dir(&cache_dir).expect("read cache dir").count(), 0);
        }
    }

    #[test]
    fn concurrent_distinct_identifiers_all_resolve() {
        let root = TempDir::new().expect("temp dir");
        let cache = Arc::new(CompositeCache::new(fixture(&root), root.path().join("cache")));

        let identifiers = ["011020", "021121", "031222", "041323"];
        let handles: Vec<_> = identifiers
            .iter()
            .map(|raw| {
                let cache = Arc::clone(&cache);
                let raw = raw.to_string();
                std::thread::spawn(move || cache.resolve(&raw))
            })
            .collect();

        for (handle, raw) in handles.into_iter().zip(identifiers) {
            let path = handle
                .join()
                .expect("no panic")
                .unwrap_or_else(|err| panic!("resolve {raw} failed: {err}"));
            assert!(path.exists(), "missing composite for {raw}");
        }
    }

    #[test]
    fn concurrent_same_identifier_converges() {
        let root = TempDir::new().expect("temp dir");
        let cache = Arc::new(CompositeCache::new(fixture(&root), root.path().join("cache")));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.resolve("011020"))
            })
            .collect();
        let mut paths = Vec::new();
        for handle in handles {
            paths.push(handle.join().expect("no panic").expect("resolved"));
        }
        paths.dedup();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].exists());
    }
}
