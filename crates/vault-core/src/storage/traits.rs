//! Storage trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// Opaque string key-value medium the vault persists into
///
/// Values are already-encoded text (base64 key material, encrypted blobs);
/// backends store them verbatim.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value under the given key, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value by key (absent keys are not an error)
    async fn remove(&self, key: &str) -> Result<()>;

    /// Get a human-readable name for this storage backend
    fn backend_name(&self) -> &'static str;
}
