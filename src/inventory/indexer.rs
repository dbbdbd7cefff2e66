//! Filesystem scan that produces the [`Inventory`].

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::assets::{CategorizedImage, Category};

use super::Inventory;

/// An inventory is usable only with strictly more than this many images.
pub const MIN_IMAGE_COUNT: usize = 10;

const IMAGE_EXTENSION: &str = "jpg";
const VIDEO_EXTENSION: &str = "mp4";

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to scan `{path}`: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "incomplete inventory: {images} images across {categories} of {expected} categories, {videos} videos"
    )]
    IncompleteInventory {
        images: usize,
        categories: usize,
        expected: usize,
        videos: usize,
    },
}

/// Builds an [`Inventory`] from the image and video roots.
///
/// Pure filesystem reads; runs once, synchronously, before the cache is
/// reachable. A failed or incomplete scan is fatal: the caller must not
/// start serving.
#[derive(Debug, Clone)]
pub struct AssetIndexer {
    images_dir: PathBuf,
    videos_dir: PathBuf,
}

impl AssetIndexer {
    pub fn new(images_dir: impl Into<PathBuf>, videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            videos_dir: videos_dir.into(),
        }
    }

    pub fn scan(&self) -> Result<Inventory, IndexError> {
        let mut images = Vec::new();
        for name in subdir_names(&self.images_dir)? {
            let Some(category) = Category::from_dir_name(&name) else {
                warn!(
                    target = "trittico::inventory",
                    op = "indexer::scan",
                    directory = %name,
                    "Skipping unrecognized category directory"
                );
                continue;
            };
            let category_dir = self.images_dir.join(&name);
            for path in files_with_extension(&category_dir, IMAGE_EXTENSION)? {
                let Some(identifier) = file_stem(&path) else {
                    continue;
                };
                debug!(
                    target = "trittico::inventory",
                    op = "indexer::scan",
                    category = %category,
                    identifier = %identifier,
                    "Indexed image"
                );
                images.push(CategorizedImage {
                    identifier,
                    category,
                    path,
                });
            }
        }

        let videos = files_with_extension(&self.videos_dir, VIDEO_EXTENSION)?;

        let inventory = Inventory { images, videos };
        validate(&inventory)?;

        info!(
            target = "trittico::inventory",
            op = "indexer::scan",
            images = inventory.num_images(),
            categories = inventory.categories().len(),
            videos = inventory.num_videos(),
            "Inventory built"
        );
        Ok(inventory)
    }
}

/// Usability invariant: enough images, every fixed category populated, and
/// at least one video. Anything less must keep the process from serving.
fn validate(inventory: &Inventory) -> Result<(), IndexError> {
    let categories = inventory.categories();
    let usable = inventory.num_images() > MIN_IMAGE_COUNT
        && categories.len() == Category::ALL.len()
        && inventory.num_videos() >= 1;
    if usable {
        return Ok(());
    }
    Err(IndexError::IncompleteInventory {
        images: inventory.num_images(),
        categories: categories.len(),
        expected: Category::ALL.len(),
        videos: inventory.num_videos(),
    })
}

/// Names of the immediate subdirectories of `dir`, in filename order.
fn subdir_names(dir: &Path) -> Result<Vec<String>, IndexError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| scan_error(dir, err))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Immediate files of `dir` carrying the given extension, in filename order.
fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, IndexError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| scan_error(dir, err))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if path.extension().and_then(|ext| ext.to_str()) == Some(extension) {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
}

fn scan_error(dir: &Path, err: walkdir::Error) -> IndexError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.to_path_buf());
    IndexError::Scan {
        path,
        source: err
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("directory walk failed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, b"stub").expect("write fixture file");
    }

    /// Lay out `images/<category>/<id>.jpg` fixtures plus `videos/`.
    fn fixture_roots(per_category: &[(&str, &[&str])], videos: &[&str]) -> TempDir {
        let root = TempDir::new().expect("temp dir");
        let images = root.path().join("images");
        for (category, identifiers) in per_category {
            let dir = images.join(category);
            fs::create_dir_all(&dir).expect("category dir");
            for id in *identifiers {
                touch(&dir.join(format!("{id}.jpg")));
            }
        }
        let videos_dir = root.path().join("videos");
        fs::create_dir_all(&videos_dir).expect("videos dir");
        for name in videos {
            touch(&videos_dir.join(name));
        }
        root
    }

    fn indexer(root: &TempDir) -> AssetIndexer {
        AssetIndexer::new(root.path().join("images"), root.path().join("videos"))
    }

    #[test]
    fn scan_indexes_categorized_images_and_videos() {
        let root = fixture_roots(
            &[
                ("artifacts", &["01", "02", "03", "04"]),
                ("people", &["10", "11", "12", "13"]),
                ("landscapes", &["20", "21", "22", "23"]),
            ],
            &["video-0001.mp4", "video-0002.mp4"],
        );

        let inventory = indexer(&root).scan().expect("usable inventory");
        assert_eq!(inventory.num_images(), 12);
        assert_eq!(inventory.num_videos(), 2);
        assert_eq!(inventory.categories(), Category::ALL.to_vec());

        let people: Vec<_> = inventory
            .by_category(Category::People)
            .map(|img| img.identifier.clone())
            .collect();
        assert_eq!(people, vec!["10", "11", "12", "13"]);
    }

    #[test]
    fn scan_ignores_foreign_extensions_and_directories() {
        let root = fixture_roots(
            &[
                ("artifacts", &["01", "02", "03", "04"]),
                ("people", &["10", "11", "12", "13"]),
                ("landscapes", &["20", "21", "22", "23"]),
            ],
            &["video-0001.mp4"],
        );
        touch(&root.path().join("images/artifacts/readme.txt"));
        touch(&root.path().join("videos/notes.txt"));
        fs::create_dir_all(root.path().join("images/artifacts/nested")).expect("nested dir");

        let inventory = indexer(&root).scan().expect("usable inventory");
        assert_eq!(inventory.num_images(), 12);
        assert_eq!(inventory.num_videos(), 1);
    }

    #[test]
    fn too_few_images_is_incomplete() {
        let root = fixture_roots(
            &[
                ("artifacts", &["01"]),
                ("people", &["10"]),
                ("landscapes", &["20"]),
            ],
            &["video-0001.mp4"],
        );
        assert!(matches!(
            indexer(&root).scan(),
            Err(IndexError::IncompleteInventory { images: 3, .. })
        ));
    }

    #[test]
    fn missing_category_is_incomplete() {
        let root = fixture_roots(
            &[
                ("artifacts", &["01", "02", "03", "04", "05", "06"]),
                ("people", &["10", "11", "12", "13", "14", "15"]),
            ],
            &["video-0001.mp4"],
        );
        assert!(matches!(
            indexer(&root).scan(),
            Err(IndexError::IncompleteInventory { categories: 2, .. })
        ));
    }

    #[test]
    fn missing_videos_is_incomplete() {
        let root = fixture_roots(
            &[
                ("artifacts", &["01", "02", "03", "04"]),
                ("people", &["10", "11", "12", "13"]),
                ("landscapes", &["20", "21", "22", "23"]),
            ],
            &[],
        );
        assert!(matches!(
            indexer(&root).scan(),
            Err(IndexError::IncompleteInventory { videos: 0, .. })
        ));
    }

    #[test]
    fn unknown_category_directories_are_skipped() {
        let root = fixture_roots(
            &[
                ("artifacts", &["01", "02", "03", "04"]),
                ("people", &["10", "11", "12", "13"]),
                ("landscapes", &["20", "21", "22", "23"]),
                ("portraits", &["90", "91"]),
            ],
            &["video-0001.mp4"],
        );
        let inventory = indexer(&root).scan().expect("usable inventory");
        assert_eq!(inventory.num_images(), 12);
    }

    #[test]
    fn missing_root_is_a_scan_error() {
        let root = TempDir::new().expect("temp dir");
        let indexer = AssetIndexer::new(root.path().join("absent"), root.path().join("videos"));
        assert!(matches!(indexer.scan(), Err(IndexError::Scan { .. })));
    }
}
