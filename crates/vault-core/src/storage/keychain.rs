//! OS Keychain storage backend
//!
//! Uses the system keychain for storage:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::error::{Result, VaultError};

/// Service name used for keychain entries
const SERVICE_NAME: &str = "password-vault";

/// OS Keychain storage backend, one keychain entry per key
pub struct KeychainStore {
    /// Prefix for all keys (for namespacing)
    prefix: String,
    /// Whether keychain is available
    available: bool,
}

impl KeychainStore {
    /// Create a new keychain store with optional prefix
    pub fn new(prefix: Option<&str>) -> Self {
        let prefix = prefix.map(|p| format!("{}-", p)).unwrap_or_default();

        let available = Self::test_availability();

        if available {
            debug!("Keychain storage is available");
        } else {
            warn!("Keychain storage is not available");
        }

        Self { prefix, available }
    }

    /// Create a keychain store, failing when no keychain is reachable
    pub fn connect(prefix: Option<&str>) -> Result<Self> {
        let store = Self::new(prefix);
        store.ensure_available()?;
        Ok(store)
    }

    /// Test if the keychain is available
    fn test_availability() -> bool {
        match Entry::new(SERVICE_NAME, "__test_availability__") {
            Ok(entry) => {
                if entry.set_password("test").is_ok() {
                    let _ = entry.delete_password();
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        }
    }

    fn ensure_available(&self) -> Result<()> {
        if !self.available {
            return Err(VaultError::Keychain("Keychain not available".to_string()));
        }
        Ok(())
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        self.ensure_available()?;

        let full_key = format!("{}{}", self.prefix, key);
        Entry::new(SERVICE_NAME, &full_key).map_err(|e| VaultError::Keychain(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for KeychainStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => {
                debug!("Retrieved key from keychain: {}", key);
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("Key not found in keychain: {}", key);
                Ok(None)
            }
            Err(e) => Err(VaultError::Keychain(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| VaultError::Keychain(e.to_string()))?;

        debug!("Stored key in keychain: {}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) => {
                debug!("Removed key from keychain: {}", key);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(VaultError::Keychain(e.to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        #[cfg(target_os = "macos")]
        return "macOS Keychain";

        #[cfg(target_os = "windows")]
        return "Windows Credential Manager";

        #[cfg(target_os = "linux")]
        return "Linux Secret Service";

        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        return "System Keychain";
    }
}
