//! Cryptographic primitives for the vault
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 key derivation from the master password
//! - AES-256-GCM authenticated encryption
//! - Master password validation against a canary ciphertext
//! - Key material handling with zeroize

mod encryption;
mod key_derivation;
mod secure_memory;
mod validation;

pub use encryption::{
    decrypt, decrypt_with_iv, encrypt, encrypt_with_iv, import_key, EncryptedBlob, IV_SIZE,
    SYNC_IV, TAG_SIZE,
};
pub use key_derivation::{derive_master_secret, DEFAULT_ITERATIONS};
pub use secure_memory::{DerivedKey, MasterSecret, KEY_SIZE};
pub use validation::{validate, ValidationCanary, CANARY_SENTINEL};
