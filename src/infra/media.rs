//! Disk-backed media retrieval for videos and cached composites.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum MediaStoreError {
    #[error("invalid media path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read-only view over the two on-disk media roots. Composites are written
/// by the cache; this store only ever reads.
#[derive(Debug)]
pub struct MediaStore {
    videos_dir: PathBuf,
    cache_dir: PathBuf,
}

impl MediaStore {
    pub fn new(videos_dir: PathBuf, cache_dir: PathBuf) -> Self {
        Self {
            videos_dir,
            cache_dir,
        }
    }

    pub async fn read_video(&self, relative: &str) -> Result<Bytes, MediaStoreError> {
        let absolute = resolve(&self.videos_dir, relative)?;
        Ok(Bytes::from(fs::read(absolute).await?))
    }

    pub async fn read_cached(&self, relative: &str) -> Result<Bytes, MediaStoreError> {
        let absolute = resolve(&self.cache_dir, relative)?;
        Ok(Bytes::from(fs::read(absolute).await?))
    }
}

/// Reject absolute paths and any parent-directory component.
fn resolve(root: &Path, relative: &str) -> Result<PathBuf, MediaStoreError> {
    let candidate = Path::new(relative);
    if candidate.is_absolute()
        || candidate
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(MediaStoreError::InvalidPath);
    }

    Ok(root.join(candidate))
}
