//! # vault-core
//!
//! Core functionality for a password vault unlocked by a single master
//! password:
//! - PBKDF2-HMAC-SHA256 key derivation and AES-256-GCM encryption
//! - Master password validation against a canary ciphertext
//! - Record collection kept in sync with its encrypted stored form
//! - Session key cache so a returning session can skip key stretching
//! - Key-value backends: in-memory, JSON file, OS keychain

pub mod crypto;
pub mod error;
pub mod record;
pub mod session;
pub mod settings;
pub mod storage;
mod vault;

pub use crypto::{
    decrypt, derive_master_secret, encrypt, import_key, validate, DerivedKey, EncryptedBlob,
    MasterSecret, ValidationCanary, DEFAULT_ITERATIONS,
};
pub use error::{Result, VaultError};
pub use record::{duplicate_urls, DuplicateUrls, Record, VaultCollection};
pub use session::SessionKeyCache;
pub use settings::{Settings, SettingsManager};
pub use storage::{FileStore, KeyValueStore, KeychainStore, MemoryStore};
pub use vault::{Hydration, Vault, VaultConfig, VaultState, RECORDS_STORAGE_KEY};
