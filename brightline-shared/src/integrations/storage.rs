/// Object storage collaborator
///
/// Upload bytes are kept outside the database under a storage key of the form
/// `{user_id}/{upload_id}/{filename}`. [`LocalStorage`] writes them below a
/// directory on disk.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

/// Error type for object storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Key is empty, absolute or walks out of the storage root
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores and removes uploaded objects
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Removes an object; removing a missing object is not an error
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Builds the storage key for an upload
pub fn upload_key(user_id: uuid::Uuid, upload_id: uuid::Uuid, filename: &str) -> String {
    format!("{user_id}/{upload_id}/{filename}")
}

/// Filesystem-backed storage rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let clean = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !clean {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, &data).await?;
        debug!(key, content_type, size = data.len(), "Stored object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_put_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let key = upload_key(Uuid::new_v4(), Uuid::new_v4(), "brief.pdf");

        storage
            .put(&key, Bytes::from_static(b"%PDF-1.7"), "application/pdf")
            .await
            .unwrap();
        let path = dir.path().join(&key);
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");

        storage.delete(&key).await.unwrap();
        assert!(!path.exists());

        // Deleting again is fine
        storage.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        for key in ["", "../outside.txt", "/etc/passwd", "a/../../b"] {
            assert!(
                matches!(
                    storage.put(key, Bytes::new(), "text/plain").await,
                    Err(StorageError::InvalidKey(_))
                ),
                "{key:?}"
            );
        }
    }
}
