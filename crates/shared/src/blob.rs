//! Blob storage for uploaded images
//!
//! The server only ever needs two operations from an object store: put a
//! named blob and read it back. `BlobStore` captures that; `FsBlobStore`
//! keeps blobs as flat files under a root directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Error type for blob operations
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),
}

/// A stored object and its media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Abstract object store
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing blob
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError>;

    /// Fetch a blob. Returns `None` if nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Blob>, BlobError>;
}

/// Filesystem-backed blob store
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create the store, creating the root directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        tracing::info!(root = %root.display(), "Blob store ready");
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let path = self.path_for(key)?;

        // Write to a temp file and rename so readers never see a partial blob
        let temp_path = self.root.join(format!("{key}.part"));
        if let Err(e) = write_synced(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        fs::rename(&temp_path, &path).await?;

        tracing::debug!(key, size = bytes.len(), "Blob written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Blob>, BlobError> {
        let path = self.path_for(key)?;

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(Blob {
                bytes,
                content_type: content_type_for(&path).to_string(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BlobError::Io(e)),
        }
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

/// Keys are flat file names: no separators, no parent references
fn validate_key(key: &str) -> Result<(), BlobError> {
    if key.is_empty() {
        return Err(BlobError::InvalidKey("key must not be empty".to_string()));
    }
    if key.contains('/') || key.contains('\\') || key.contains("..") || key.starts_with('.') {
        return Err(BlobError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Media type inferred from the file extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        store.put("1700000000000-cat.png", b"\x89PNG").await.unwrap();
        let blob = store.get("1700000000000-cat.png").await.unwrap().unwrap();

        assert_eq!(blob.bytes, b"\x89PNG");
        assert_eq!(blob.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        assert!(store.get("nope.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        store.put("a.gif", b"one").await.unwrap();
        store.put("a.gif", b"two").await.unwrap();

        let blob = store.get("a.gif").await.unwrap().unwrap();
        assert_eq!(blob.bytes, b"two");
    }

    #[tokio::test]
    async fn test_put_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        store.put("a.png", b"png").await.unwrap();
        store.put("a.jpg", b"jpg").await.unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.jpg", "a.png"]);
        assert_eq!(store.get("a.png").await.unwrap().unwrap().bytes, b"png");
    }

    #[tokio::test]
    async fn test_failed_write_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        // A directory in the temp file's place makes the write fail
        std::fs::create_dir(dir.path().join("b.png.part")).unwrap();
        assert!(matches!(store.put("b.png", b"x").await, Err(BlobError::Io(_))));
        assert!(store.get("b.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        for key in ["", "../etc/passwd", "a/b.png", "a\\b.png", ".hidden"] {
            assert!(
                matches!(store.put(key, b"x").await, Err(BlobError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
            assert!(matches!(store.get(key).await, Err(BlobError::InvalidKey(_))));
        }
    }

    #[test]
    fn test_content_type_is_case_insensitive() {
        assert_eq!(content_type_for(Path::new("x.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("x.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("x")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("x.exe")), "application/octet-stream");
    }
}
