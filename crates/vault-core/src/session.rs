//! Session key cache
//!
//! Persists the derived key material (never the password) so a returning
//! session can rebuild its key without re-running key stretching. The material
//! is stored unencrypted: anyone who can read the key-value medium can open the
//! vault, which matches the trust placed in the medium itself.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;
use tracing::debug;

use crate::crypto::MasterSecret;
use crate::error::{Result, VaultError};
use crate::storage::KeyValueStore;

/// Storage key for the persisted key material
pub const CRYPTO_KEY_STORAGE_KEY: &str = "crypto-key";

/// Reads and writes `PersistedKeyMaterial` in the key-value medium
#[derive(Clone)]
pub struct SessionKeyCache {
    store: Arc<dyn KeyValueStore>,
}

impl SessionKeyCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Save key material for the next session
    pub async fn save(&self, material: &MasterSecret) -> Result<()> {
        self.store
            .set(CRYPTO_KEY_STORAGE_KEY, &STANDARD.encode(material.as_bytes()))
            .await?;

        debug!("Saved session key material");
        Ok(())
    }

    /// Load key material left by a previous session
    pub async fn load(&self) -> Result<Option<MasterSecret>> {
        let Some(encoded) = self.store.get(CRYPTO_KEY_STORAGE_KEY).await? else {
            return Ok(None);
        };

        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| VaultError::Decode(format!("Invalid stored key material: {}", e)))?;

        MasterSecret::from_slice(&bytes).map(Some).ok_or_else(|| {
            VaultError::KeyImport(format!(
                "Invalid stored key material length: {}",
                bytes.len()
            ))
        })
    }

    /// Name of the medium holding the key material
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Remove stored key material (called on logout)
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(CRYPTO_KEY_STORAGE_KEY).await?;
        debug!("Cleared session key material");
        Ok(())
    }
}
