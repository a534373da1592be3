//! On-device persistence capabilities: key-value metadata and blob files
//!
//! The key-value store has no transactions and no partial-write guarantees
//! beyond the platform filesystem; last writer wins per key. Callers that
//! need read-modify-write consistency must serialize their own writes.

use crate::error::StoreError;
use async_trait::async_trait;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StoreError>;

/// Key-value store for JSON metadata documents.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Read the value for a key; `None` when the key has never been written
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replace the value for a key
    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<()>;
}

/// Blob store for book and cover files.
///
/// Blob paths are relative, derived from record ids, and each blob is
/// exclusively owned by a single record.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()>;

    async fn delete(&self, path: &str) -> StorageResult<()>;

    async fn exists(&self, path: &str) -> StorageResult<bool>;
}

/// Filesystem-backed store rooted at a single directory.
///
/// Implements both capabilities; metadata keys and blob paths share the
/// same namespace under the root.
pub struct LocalStorage {
    root: std::path::PathBuf,
}

impl LocalStorage {
    /// Create a local store with the given root directory
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Safely resolve a path, preventing escape from the root
    fn full_path(&self, path: &str) -> StorageResult<std::path::PathBuf> {
        use std::path::Component;

        let mut normalized = std::path::PathBuf::new();
        for component in std::path::Path::new(path).components() {
            match component {
                Component::Normal(c) => normalized.push(c),
                Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                    return Err(StoreError::Persistence(format!(
                        "path escapes storage root: {path}"
                    )));
                }
            }
        }

        Ok(self.root.join(normalized))
    }

    async fn write_bytes(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Persistence(e.to_string()))?;
        }
        tokio::fs::write(full_path, data)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))
    }
}

#[async_trait]
impl MetadataStore for LocalStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let full_path = self.full_path(key)?;
        match tokio::fs::read(full_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Persistence(e.to_string())),
        }
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        self.write_bytes(key, data).await
    }
}

#[async_trait]
impl BlobStore for LocalStorage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.full_path(path)?;
        match tokio::fs::read(full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::BlobMissing(path.to_string()))
            }
            Err(e) => Err(StoreError::Persistence(e.to_string())),
        }
    }

    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        self.write_bytes(path, data).await
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        match tokio::fs::remove_file(full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::BlobMissing(path.to_string()))
            }
            Err(e) => Err(StoreError::Persistence(e.to_string())),
        }
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let full_path = self.full_path(path)?;
        tokio::fs::try_exists(full_path)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))
    }
}

/// In-memory store (for testing)
#[derive(Default)]
pub struct MemoryStorage {
    entries: std::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        self.entries.write().unwrap().insert(key.to_string(), data);
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryStorage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.entries
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::BlobMissing(path.to_string()))
    }

    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        self.entries.write().unwrap().insert(path.to_string(), data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.entries
            .write()
            .unwrap()
            .remove(path)
            .ok_or_else(|| StoreError::BlobMissing(path.to_string()))?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.entries.read().unwrap().contains_key(path))
    }
}
