//! Asset loading for pet photos.
//!
//! Photo bytes come from an external picker or the filesystem. Loading is
//! async and happens before the store takes its writer lock, so a slow or
//! cancelled load never holds up other writers.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use moch_core::error::{MochError, MochResult};

/// Default upper bound for a single photo.
pub const DEFAULT_MAX_PHOTO_BYTES: u64 = 10 * 1024 * 1024;

/// Source of raw asset bytes.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Load the asset identified by `source`. Failures are `AssetLoad` errors.
    async fn load(&self, source: &str) -> MochResult<Vec<u8>>;
}

/// Loads assets from the local filesystem. Relative sources resolve against
/// `base_dir` when one is set.
#[derive(Debug, Clone)]
pub struct FileAssetLoader {
    base_dir: Option<PathBuf>,
    max_bytes: u64,
}

impl Default for FileAssetLoader {
    fn default() -> Self {
        Self {
            base_dir: None,
            max_bytes: DEFAULT_MAX_PHOTO_BYTES,
        }
    }
}

impl FileAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn resolve(&self, source: &str) -> PathBuf {
        let path = PathBuf::from(source);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

#[async_trait]
impl AssetLoader for FileAssetLoader {
    async fn load(&self, source: &str) -> MochResult<Vec<u8>> {
        let path = self.resolve(source);

        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            warn!("asset {} unavailable: {e}", path.display());
            MochError::AssetLoad(format!("{}: {e}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(MochError::AssetLoad(format!(
                "{} is not a file",
                path.display()
            )));
        }
        if metadata.len() > self.max_bytes {
            return Err(MochError::AssetLoad(format!(
                "{} is {} bytes, limit is {}",
                path.display(),
                metadata.len(),
                self.max_bytes
            )));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| MochError::AssetLoad(format!("{}: {e}", path.display())))?;
        if bytes.is_empty() {
            return Err(MochError::AssetLoad(format!("{} is empty", path.display())));
        }

        debug!("loaded asset {} ({} bytes)", path.display(), bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loads_relative_to_base_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mochi.jpg"), [0xFF, 0xD8, 0xFF, 0x00]).unwrap();

        let loader = FileAssetLoader::new().with_base_dir(dir.path());
        let bytes = loader.load("mochi.jpg").await.unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0x00]);
    }

    #[tokio::test]
    async fn test_missing_file_is_asset_error() {
        let dir = TempDir::new().unwrap();
        let loader = FileAssetLoader::new().with_base_dir(dir.path());
        let err = loader.load("nope.png").await.unwrap_err();
        assert!(matches!(err, MochError::AssetLoad(_)));
    }

    #[tokio::test]
    async fn test_size_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, vec![1u8; 64]).unwrap();

        let loader = FileAssetLoader::new().with_max_bytes(16);
        let err = loader.load(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, MochError::AssetLoad(_)));
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("empty.png"), []).unwrap();
        let loader = FileAssetLoader::new().with_base_dir(dir.path());
        assert!(loader.load("empty.png").await.is_err());
    }
}
