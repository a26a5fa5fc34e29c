//! Error types for vault-core

use thiserror::Error;

/// Result type alias for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Vault error types
///
/// Cryptographic failures never carry plaintext or key bytes; they collapse to
/// `KeyImport`, `Authentication`, `Decode` or `InvalidPassword`.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Key import failed: {0}")]
    KeyImport(String),

    #[error("Authentication failed - wrong key or tampered ciphertext")]
    Authentication,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Vault is locked - unlock with password first")]
    VaultLocked,

    #[error("Vault is not provisioned - no validation canary configured")]
    NotProvisioned,

    #[error("Another unlock attempt is already in progress")]
    UnlockInProgress,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VaultError {
    /// Whether this error means the stored vault blob could not be read back
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            VaultError::Authentication | VaultError::Decode(_) | VaultError::Serialization(_)
        )
    }
}
