use crate::{domain::KeyValueStore, errors::StorageError};
use anyhow::Context;
use async_trait::async_trait;
use std::{
    collections::HashMap,
    io::ErrorKind,
    path::PathBuf,
};
use tokio::sync::RwLock;
use tracing;

/// Stores every key as `<root>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        tracing::info!(root = %root.display(), "Initializing FileKeyValueStore");
        Self { root }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => {
                tracing::debug!(%key, bytes = value.len(), "File store: read key");
                Ok(Some(value))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::BackendError(
                anyhow::Error::new(e).context(format!("Failed to read '{}'", path.display())),
            )),
        }
    }

    /// Writes to a sibling temp file first and renames it over the target, so a
    /// key is either fully replaced or left as it was.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp_path = self.root.join(format!(".{}.json.tmp", key));

        tokio::fs::write(&tmp_path, value.as_bytes())
            .await
            .context(format!("Failed to write '{}'", tmp_path.display()))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                tracing::warn!(tmp = %tmp_path.display(), error = %cleanup, "File store: failed to remove temp file");
            }
            return Err(StorageError::BackendError(
                anyhow::Error::new(e).context(format!("Failed to replace '{}'", path.display())),
            ));
        }

        tracing::debug!(%key, bytes = value.len(), "File store: wrote key");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(%key, "File store: removed key");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::BackendError(
                anyhow::Error::new(e).context(format!("Failed to remove '{}'", path.display())),
            )),
        }
    }
}

/// Volatile store, used by tests and for throwaway boards.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_get_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        assert_eq!(store.get("nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_set_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        store.set("memes", "[1]".into()).await.unwrap();
        store.set("memes", "[2]".into()).await.unwrap();

        assert_eq!(store.get("memes").await.unwrap().as_deref(), Some("[2]"));
        assert!(dir.path().join("memes.json").exists());
        assert!(!dir.path().join(".memes.json.tmp").exists());
    }

    #[tokio::test]
    async fn failed_replace_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        // A non-empty directory where the key's file should go makes the rename fail.
        let blocker = dir.path().join("blocked.json");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("inner"), b"x").unwrap();

        assert!(store.set("blocked", "[]".into()).await.is_err());
        assert!(!dir.path().join(".blocked.json.tmp").exists());
        assert!(blocker.is_dir());
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileKeyValueStore::new(dir.path())
            .set("currentProfileId", "42".into())
            .await
            .unwrap();

        let reopened = FileKeyValueStore::new(dir.path());
        assert_eq!(
            reopened.get("currentProfileId").await.unwrap().as_deref(),
            Some("42")
        );
    }

    #[tokio::test]
    async fn file_store_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        store.set("k", "v".into()).await.unwrap();
        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryKeyValueStore::new();
        store.set("k", "v".into()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
