//! Main vault orchestration
//!
//! The vault owns one session at a time: the imported key plus the decrypted
//! record collection. Every mutation re-encrypts the whole collection under the
//! session key and overwrites the stored blob before the change becomes
//! visible in memory, so each write costs O(collection size).

use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{
    decrypt, derive_master_secret, encrypt, import_key, validate, DerivedKey, EncryptedBlob,
    MasterSecret, ValidationCanary, DEFAULT_ITERATIONS,
};
use crate::error::{Result, VaultError};
use crate::record::{duplicate_urls, DuplicateUrls, Record, VaultCollection};
use crate::session::SessionKeyCache;
use crate::settings::{Settings, SettingsManager};
use crate::storage::{FileStore, KeyValueStore};

/// Storage key for the encrypted record collection
pub const RECORDS_STORAGE_KEY: &str = "passwords";

/// Vault state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// No key held
    Locked,
    /// Key derivation or hydration in flight
    Unlocking,
    /// Key held and records loaded
    Unlocked,
}

/// How the record collection was loaded on unlock
#[derive(Debug)]
pub enum Hydration {
    /// Nothing stored yet
    Empty,
    /// Stored blob decrypted into this many records
    Restored { records: usize },
    /// Stored blob could not be read; the session starts with an empty
    /// collection and the next mutation overwrites the unreadable blob
    Corrupted(VaultError),
}

impl Hydration {
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Hydration::Corrupted(_))
    }

    pub fn record_count(&self) -> usize {
        match self {
            Hydration::Restored { records } => *records,
            _ => 0,
        }
    }
}

/// Parameters the vault needs to check a password
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// PBKDF2 round count
    pub iterations: u32,
    /// Canary to validate derived keys against
    pub canary: Option<ValidationCanary>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            canary: None,
        }
    }
}

impl From<&Settings> for VaultConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            iterations: settings.kdf_iterations,
            canary: settings.canary.clone(),
        }
    }
}

/// Key and records of the active session
struct Session {
    key: DerivedKey,
    records: VaultCollection,
}

/// Main vault struct that orchestrates unlock, sync and logout
pub struct Vault {
    /// Key-value medium holding the blob and the key material
    store: Arc<dyn KeyValueStore>,
    /// Persisted key material for resumed sessions
    key_cache: SessionKeyCache,
    config: VaultConfig,
    /// Held for the whole of a password unlock or a resume
    unlock_gate: Mutex<()>,
    /// Held across each mutation's encrypt + persist
    session: Mutex<Option<Session>>,
    state: RwLock<VaultState>,
}

impl Vault {
    /// Create a vault over any key-value medium
    pub fn new(store: Arc<dyn KeyValueStore>, config: VaultConfig) -> Self {
        Self::with_key_store(store.clone(), store, config)
    }

    /// Create a vault that keeps its key material apart from the blob
    pub fn with_key_store(
        store: Arc<dyn KeyValueStore>,
        key_store: Arc<dyn KeyValueStore>,
        config: VaultConfig,
    ) -> Self {
        Self {
            key_cache: SessionKeyCache::new(key_store),
            store,
            config,
            unlock_gate: Mutex::new(()),
            session: Mutex::new(None),
            state: RwLock::new(VaultState::Locked),
        }
    }

    /// Open the file-backed vault and its settings in `storage_dir`
    pub fn open(storage_dir: &Path) -> Result<Self> {
        let settings = SettingsManager::new(storage_dir)?;
        let store = Arc::new(FileStore::with_dir(storage_dir.to_path_buf())?);

        Ok(Self::new(store, VaultConfig::from(settings.get())))
    }

    /// Open the file-backed vault in `storage_dir`, keeping key material in
    /// `key_store` (usually the OS keychain)
    pub fn open_with_key_store(
        storage_dir: &Path,
        key_store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let settings = SettingsManager::new(storage_dir)?;
        let store = Arc::new(FileStore::with_dir(storage_dir.to_path_buf())?);

        Ok(Self::with_key_store(
            store,
            key_store,
            VaultConfig::from(settings.get()),
        ))
    }

    /// Derive a key from `password` and seal a new canary under it
    pub async fn provision(password: &str, iterations: u32) -> Result<ValidationCanary> {
        let secret = derive_in_background(password, iterations).await?;
        let key = import_key(secret.as_bytes())?;

        info!("Provisioned new validation canary");
        ValidationCanary::provision(&key)
    }

    /// Get the current vault state
    pub async fn state(&self) -> VaultState {
        *self.state.read().await
    }

    /// Check if the vault is unlocked
    pub async fn is_unlocked(&self) -> bool {
        self.state().await == VaultState::Unlocked
    }

    /// Get the backing store's name
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Get the name of the store holding the session key material
    pub fn key_backend_name(&self) -> &'static str {
        self.key_cache.backend_name()
    }

    async fn set_state(&self, state: VaultState) {
        *self.state.write().await = state;
    }

    /// Unlock the vault with the master password
    ///
    /// On success the stored collection is decrypted and the derived key
    /// material is saved for `resume`. A wrong password returns the vault to
    /// `Locked` with `InvalidPassword`.
    pub async fn unlock(&self, password: &str) -> Result<Hydration> {
        let _gate = self
            .unlock_gate
            .try_lock()
            .map_err(|_| VaultError::UnlockInProgress)?;

        if let Some(session) = self.session.lock().await.as_ref() {
            debug!("Vault already unlocked");
            return Ok(Hydration::Restored {
                records: session.records.len(),
            });
        }

        let canary = self
            .config
            .canary
            .as_ref()
            .ok_or(VaultError::NotProvisioned)?;

        self.set_state(VaultState::Unlocking).await;

        let result = self.unlock_with_password(password, canary).await;
        if result.is_err() {
            self.set_state(VaultState::Locked).await;
        }
        result
    }

    async fn unlock_with_password(
        &self,
        password: &str,
        canary: &ValidationCanary,
    ) -> Result<Hydration> {
        let secret = derive_in_background(password, self.config.iterations).await?;
        let key = import_key(secret.as_bytes())?;

        if !validate(&key, canary) {
            info!("Unlock rejected: invalid password");
            return Err(VaultError::InvalidPassword);
        }

        let (records, hydration) = self.load_collection(&key).await?;
        self.key_cache.save(&secret).await?;

        self.start_session(key, records).await;
        info!("Vault unlocked successfully");
        Ok(hydration)
    }

    /// Unlock with key material saved by an earlier session
    ///
    /// The stored material was validated when it was saved, so the canary is
    /// not checked again. Returns `None` when no material is stored.
    pub async fn resume(&self) -> Result<Option<Hydration>> {
        let _gate = self
            .unlock_gate
            .try_lock()
            .map_err(|_| VaultError::UnlockInProgress)?;

        if let Some(session) = self.session.lock().await.as_ref() {
            debug!("Vault already unlocked");
            return Ok(Some(Hydration::Restored {
                records: session.records.len(),
            }));
        }

        let Some(material) = self.key_cache.load().await? else {
            debug!("No stored key material to resume from");
            return Ok(None);
        };

        self.set_state(VaultState::Unlocking).await;

        let result = self.resume_with(&material).await;
        if result.is_err() {
            self.set_state(VaultState::Locked).await;
        }
        result.map(Some)
    }

    async fn resume_with(&self, material: &MasterSecret) -> Result<Hydration> {
        let key = import_key(material.as_bytes())?;
        let (records, hydration) = self.load_collection(&key).await?;

        self.start_session(key, records).await;

        info!("Vault unlocked via stored key material");
        Ok(hydration)
    }

    /// Read and decrypt the stored collection
    async fn load_collection(&self, key: &DerivedKey) -> Result<(VaultCollection, Hydration)> {
        let loaded = match self.store.get(RECORDS_STORAGE_KEY).await? {
            None => (VaultCollection::new(), Hydration::Empty),
            Some(encoded) => match open_collection(key, &EncryptedBlob::new(encoded)) {
                Ok(records) => {
                    let count = records.len();
                    (records, Hydration::Restored { records: count })
                }
                Err(e) => {
                    warn!("Stored vault is unreadable, starting empty: {}", e);
                    (VaultCollection::new(), Hydration::Corrupted(e))
                }
            },
        };

        Ok(loaded)
    }

    async fn start_session(&self, key: DerivedKey, records: VaultCollection) {
        debug!("Hydrated {} records", records.len());
        *self.session.lock().await = Some(Session { key, records });
        self.set_state(VaultState::Unlocked).await;
    }

    /// Lock the vault
    ///
    /// Drops the key from memory and removes the stored key material. The
    /// encrypted collection stays in storage for the next unlock. An unlock
    /// or resume in flight is allowed to finish first and is then undone.
    pub async fn logout(&self) -> Result<()> {
        let _gate = self.unlock_gate.lock().await;

        {
            let mut session = self.session.lock().await;
            *session = None;
            self.set_state(VaultState::Locked).await;
        }

        self.key_cache.clear().await?;

        info!("Vault locked");
        Ok(())
    }

    /// Add a record; an existing record with the same id is replaced
    pub async fn create(&self, record: Record) -> Result<()> {
        let record = record.normalized();

        self.mutate(move |records| {
            if records.upsert(record).is_some() {
                debug!("Create replaced an existing record");
            }
        })
        .await
    }

    /// Replace a record (inserting it if absent) and stamp its modification
    /// time
    ///
    /// Returns the URLs the updated collection shares between records so the
    /// caller can warn about them; the update is committed either way.
    pub async fn update(&self, record: Record) -> Result<DuplicateUrls> {
        let record = record.touched();

        self.mutate(move |records| {
            records.upsert(record);
            duplicate_urls(records)
        })
        .await
    }

    /// Remove a record; returns whether it was present
    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.mutate(|records| records.remove(id).is_some()).await
    }

    /// Preview the duplicate URLs `update(record)` would produce
    pub async fn check_update(&self, record: &Record) -> Result<DuplicateUrls> {
        let session = self.session.lock().await;
        let session = session.as_ref().ok_or(VaultError::VaultLocked)?;

        let mut candidate = session.records.clone();
        candidate.upsert(record.clone());
        Ok(duplicate_urls(&candidate))
    }

    /// Snapshot of the current records
    pub async fn list(&self) -> Result<VaultCollection> {
        let session = self.session.lock().await;
        let session = session.as_ref().ok_or(VaultError::VaultLocked)?;
        Ok(session.records.clone())
    }

    /// Get a single record by id
    pub async fn get(&self, id: &str) -> Result<Option<Record>> {
        let session = self.session.lock().await;
        let session = session.as_ref().ok_or(VaultError::VaultLocked)?;
        Ok(session.records.get(id).cloned())
    }

    /// Apply `op` to a copy of the collection, persist the copy, then commit it
    ///
    /// The session lock is held until the write finishes, so mutations run one
    /// at a time and a failed write leaves the in-memory collection untouched.
    async fn mutate<T>(&self, op: impl FnOnce(&mut VaultCollection) -> T) -> Result<T> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(VaultError::VaultLocked)?;

        let mut next = session.records.clone();
        let output = op(&mut next);

        self.persist(&session.key, &next).await?;
        session.records = next;

        Ok(output)
    }

    async fn persist(&self, key: &DerivedKey, records: &VaultCollection) -> Result<()> {
        let json = records.to_json()?;
        let blob = encrypt(key, &json)?;

        self.store.set(RECORDS_STORAGE_KEY, blob.as_str()).await?;

        debug!("Persisted {} records", records.len());
        Ok(())
    }
}

/// Run key stretching on the blocking pool so callers stay responsive
async fn derive_in_background(password: &str, iterations: u32) -> Result<MasterSecret> {
    let password = Zeroizing::new(password.to_owned());

    tokio::task::spawn_blocking(move || derive_master_secret(&password, iterations))
        .await
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?
}

fn open_collection(key: &DerivedKey, blob: &EncryptedBlob) -> Result<VaultCollection> {
    let json = decrypt(key, blob)?;
    Ok(VaultCollection::from_json(&json)?)
}
