//! Blob-storage capability for ingested preview images.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Durable byte storage with collision-avoiding names.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Persist `bytes` under a name derived from `suggested_name`,
    /// returning the stored asset's URI.
    ///
    /// Implementations must never overwrite an existing blob when two
    /// saves suggest the same name.
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<String>;
}

/// Filesystem-backed blob storage.
///
/// Collision avoidance: every destination name is prefixed with a random
/// hex token, so identical suggested names land in distinct files.
pub struct FileBlobStorage {
    root: PathBuf,
}

impl FileBlobStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStorage for FileBlobStorage {
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .context("Failed to create blob storage directory")?;

        let token: [u8; 8] = rand::random();
        let name = format!("{}-{}", hex::encode(token), suggested_name);
        let path = self.root.join(&name);

        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write blob {}", path.display()))?;

        Ok(path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_bytes_and_returns_uri() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileBlobStorage::new(dir.path());
        let uri = storage.save(b"png-bytes", "cover.png").await.expect("save");
        assert!(uri.ends_with("cover.png"));
        let stored = std::fs::read(&uri).expect("read back");
        assert_eq!(stored, b"png-bytes");
    }

    #[tokio::test]
    async fn same_suggested_name_never_collides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileBlobStorage::new(dir.path());
        let a = storage.save(b"one", "img.png").await.expect("save a");
        let b = storage.save(b"two", "img.png").await.expect("save b");
        assert_ne!(a, b);
        assert_eq!(std::fs::read(&a).expect("a"), b"one");
        assert_eq!(std::fs::read(&b).expect("b"), b"two");
    }
}
