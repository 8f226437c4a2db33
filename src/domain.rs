use crate::errors::StorageError;
use async_trait::async_trait;

/// Trait defining a flat string key-value store, the persistence backend for
/// every collection and for the session pointer.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Returns the value stored under `key`, or `Ok(None)` if the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the value stored under `key`.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
