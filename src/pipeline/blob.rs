//! Blob store implementations.
//!
//! `FsBlobStore` keeps objects as files under `root/bucket/path`.
//! `MemoryBlobStore` is the in-memory fake used by pipeline tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

use super::traits::BlobStore;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Object not found: {bucket}/{path}")]
    NotFound { bucket: String, path: String },

    #[error("Invalid object path: {bucket}/{path}")]
    InvalidPath { bucket: String, path: String },

    #[error("Blob I/O error for {bucket}/{path}: {reason}")]
    Io {
        bucket: String,
        path: String,
        reason: String,
    },
}

/// Object references must stay relative to the store root: every
/// `/`-separated component must be a plain name, never `..`, `.`, empty,
/// or carrying a backslash. The bucket is a single component.
fn validate_ref(bucket: &str, path: &str) -> Result<(), BlobError> {
    let component_ok =
        |c: &str| !c.is_empty() && c != "." && c != ".." && !c.contains('\\');
    if bucket.contains('/') || !component_ok(bucket) || !path.split('/').all(component_ok) {
        return Err(BlobError::InvalidPath {
            bucket: bucket.to_string(),
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Filesystem-backed blob store rooted at a directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, path: &str) -> PathBuf {
        self.root.join(bucket).join(path)
    }

    /// Write an object, creating parent directories. Used by the enqueue
    /// flow; the pipeline itself only reads.
    pub fn store(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<(), BlobError> {
        validate_ref(bucket, path)?;
        let full = self.object_path(bucket, path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BlobError::Io {
                bucket: bucket.to_string(),
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        }
        std::fs::write(&full, bytes).map_err(|e| BlobError::Io {
            bucket: bucket.to_string(),
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

impl BlobStore for FsBlobStore {
    fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, BlobError> {
        validate_ref(bucket, path)?;
        let full = self.object_path(bucket, path);
        match std::fs::read(&full) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            }),
            Err(e) => Err(BlobError::Io {
                bucket: bucket.to_string(),
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// In-memory blob store for tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, path: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .expect("blob store lock poisoned")
            .insert((bucket.to_string(), path.to_string()), bytes);
    }
}

impl BlobStore for MemoryBlobStore {
    fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, BlobError> {
        self.objects
            .lock()
            .expect("blob store lock poisoned")
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| BlobError::NotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        store.insert("contracts", "u1/a.pdf", b"%PDF-1.7".to_vec());
        let bytes = store.download("contracts", "u1/a.pdf").unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
    }

    #[test]
    fn memory_store_missing_is_not_found() {
        let store = MemoryBlobStore::new();
        let err = store.download("contracts", "nope.pdf").unwrap_err();
        assert!(matches!(err, BlobError::NotFound { .. }));
    }

    #[test]
    fn fs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.store("contracts", "u1/deep/a.pdf", b"%PDF-1.7").unwrap();
        let bytes = store.download("contracts", "u1/deep/a.pdf").unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
    }

    #[test]
    fn fs_store_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let err = store.download("contracts", "missing.pdf").unwrap_err();
        assert!(matches!(err, BlobError::NotFound { .. }));
    }

    #[test]
    fn fs_store_rejects_parent_directory_components() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("blobs");
        let store = FsBlobStore::new(&root);

        let err = store
            .store("contracts", "o1/abc-../../../../../escape.txt", b"owned")
            .unwrap_err();
        assert!(matches!(err, BlobError::InvalidPath { .. }));
        assert!(!dir.path().join("escape.txt").exists());

        let err = store.download("contracts", "../secrets.db").unwrap_err();
        assert!(matches!(err, BlobError::InvalidPath { .. }));
    }

    #[test]
    fn fs_store_rejects_traversal_bucket_and_empty_components() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        for (bucket, path) in [
            ("..", "a.pdf"),
            ("con/tracts", "a.pdf"),
            ("contracts", "o1//a.pdf"),
            ("contracts", "o1\\..\\a.pdf"),
            ("contracts", "."),
        ] {
            let err = store.store(bucket, path, b"x").unwrap_err();
            assert!(matches!(err, BlobError::InvalidPath { .. }), "{bucket}/{path}");
        }
    }
}
