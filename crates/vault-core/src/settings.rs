//! Vault settings management
//!
//! Stores non-secret configuration in a plain JSON file next to the vault:
//! the key-stretching round count and the validation canary. Neither needs
//! protecting - the canary only confirms a key, it cannot produce one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::crypto::{ValidationCanary, DEFAULT_ITERATIONS};
use crate::error::Result;

/// Vault settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// PBKDF2 round count used to derive the master secret
    pub kdf_iterations: u32,
    /// Canary sealed under the master key; absent until the vault is provisioned
    pub canary: Option<ValidationCanary>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            kdf_iterations: DEFAULT_ITERATIONS,
            canary: None,
        }
    }
}

impl Settings {
    /// Whether a canary has been provisioned
    pub fn is_provisioned(&self) -> bool {
        self.canary.is_some()
    }
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Create a new settings manager, loading `settings.json` from `storage_dir`
    pub fn new(storage_dir: &Path) -> Result<Self> {
        let settings_file = storage_dir.join("settings.json");
        let settings = Self::load_from_file(&settings_file)?;

        Ok(Self {
            settings_file,
            settings,
        })
    }

    /// Load settings from file
    fn load_from_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub async fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.settings)?;

        // Write atomically using temp file
        let temp_path = self.settings_file.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.settings_file).await?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Store a freshly provisioned canary and save
    pub async fn set_canary(&mut self, canary: ValidationCanary) -> Result<()> {
        self.settings.canary = Some(canary);
        self.save().await
    }

    /// Set the PBKDF2 round count and save
    pub async fn set_kdf_iterations(&mut self, iterations: u32) -> Result<()> {
        self.settings.kdf_iterations = iterations;
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultError;
    use tempfile::TempDir;

    fn test_canary() -> ValidationCanary {
        ValidationCanary {
            iv: "ky58FdhKC/ZhyTin".to_string(),
            cipher: "ZY4LJdev9pPZxyaf+eMRWZ13".to_string(),
        }
    }

    #[tokio::test]
    async fn test_settings_default() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path()).unwrap();

        let settings = manager.get();
        assert_eq!(settings.kdf_iterations, 339_616);
        assert!(!settings.is_provisioned());
    }

    #[tokio::test]
    async fn test_settings_persistence() {
        let temp_dir = TempDir::new().unwrap();

        {
            let mut manager = SettingsManager::new(temp_dir.path()).unwrap();
            manager.set_kdf_iterations(1000).await.unwrap();
            manager.set_canary(test_canary()).await.unwrap();
        }

        {
            let manager = SettingsManager::new(temp_dir.path()).unwrap();
            assert_eq!(manager.get().kdf_iterations, 1000);
            assert_eq!(manager.get().canary, Some(test_canary()));
        }
    }

    #[tokio::test]
    async fn test_settings_file_shape() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SettingsManager::new(temp_dir.path()).unwrap();
        manager.set_canary(test_canary()).await.unwrap();

        let raw = std::fs::read_to_string(temp_dir.path().join("settings.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["kdfIterations"], 339_616);
        assert_eq!(json["canary"]["iv"], "ky58FdhKC/ZhyTin");
    }

    #[tokio::test]
    async fn test_malformed_settings_rejected() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("settings.json"), "{ not json").unwrap();

        let result = SettingsManager::new(temp_dir.path());
        assert!(matches!(result, Err(VaultError::Serialization(_))));
    }
}
