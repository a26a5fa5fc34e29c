//! JSON file storage backend
//!
//! Stores every entry in a single `vault.json` file in the user's data
//! directory. Values are written verbatim; the vault only ever hands this
//! backend base64 key material and encrypted blobs.

use async_trait::async_trait;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

use super::KeyValueStore;
use crate::error::{Result, VaultError};

/// Current on-disk format version
const FILE_VERSION: u32 = 1;

/// File-backed key-value store
pub struct FileStore {
    /// Directory for storage files
    storage_dir: PathBuf,
    /// In-memory copy of the file, loaded on first access
    cache: RwLock<StorageCache>,
}

#[derive(Debug, Default)]
struct StorageCache {
    entries: HashMap<String, String>,
    loaded: bool,
}

/// File format for persistent storage
#[derive(Debug, Serialize, Deserialize)]
struct StorageFile {
    version: u32,
    entries: HashMap<String, String>,
}

impl FileStore {
    /// Create with a custom storage directory
    pub fn with_dir(storage_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&storage_dir)?;

        debug!("File storage initialized at: {:?}", storage_dir);

        Ok(Self {
            storage_dir,
            cache: RwLock::new(StorageCache::default()),
        })
    }

    /// Get the default storage directory
    pub fn default_dir() -> Result<PathBuf> {
        ProjectDirs::from("org", "password-vault", "password-vault")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| VaultError::Storage("Could not determine data directory".to_string()))
    }

    fn storage_file_path(&self) -> PathBuf {
        self.storage_dir.join("vault.json")
    }

    async fn read_file(&self) -> Result<HashMap<String, String>> {
        let path = self.storage_file_path();

        if !path.exists() {
            debug!("No existing storage file found");
            return Ok(HashMap::new());
        }

        let contents = tokio::fs::read_to_string(&path).await?;
        let file: StorageFile = serde_json::from_str(&contents)?;

        if file.version != FILE_VERSION {
            return Err(VaultError::Storage(format!(
                "Unsupported storage file version: {}",
                file.version
            )));
        }

        debug!("Loaded {} entries from storage", file.entries.len());
        Ok(file.entries)
    }

    async fn ensure_loaded(&self, cache: &mut StorageCache) -> Result<()> {
        if !cache.loaded {
            cache.entries = self.read_file().await?;
            cache.loaded = true;
        }
        Ok(())
    }

    /// Write the cache to disk atomically using a temp file
    async fn write_file(&self, entries: &HashMap<String, String>) -> Result<()> {
        let file = StorageFile {
            version: FILE_VERSION,
            entries: entries.clone(),
        };

        let contents = serde_json::to_string_pretty(&file)?;
        let path = self.storage_file_path();

        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!("Saved {} entries to storage", entries.len());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let cache = self.cache.read().await;
            if cache.loaded {
                return Ok(cache.entries.get(key).cloned());
            }
        }

        let mut cache = self.cache.write().await;
        self.ensure_loaded(&mut cache).await?;
        Ok(cache.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut cache = self.cache.write().await;
        self.ensure_loaded(&mut cache).await?;

        let previous = cache.entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.write_file(&cache.entries).await {
            // Keep the cache in line with what is on disk
            match previous {
                Some(old) => cache.entries.insert(key.to_string(), old),
                None => cache.entries.remove(key),
            };
            return Err(e);
        }

        debug!("Stored key: {}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut cache = self.cache.write().await;
        self.ensure_loaded(&mut cache).await?;

        if let Some(old) = cache.entries.remove(key) {
            if let Err(e) = self.write_file(&cache.entries).await {
                cache.entries.insert(key.to_string(), old);
                return Err(e);
            }
            debug!("Removed key: {}", key);
        }

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "File Storage"
    }
}
