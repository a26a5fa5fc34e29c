//! Master password validation against a stored canary ciphertext

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::encryption::{decrypt_with_iv, encrypt_with_iv, IV_SIZE};
use super::secure_memory::DerivedKey;
use crate::error::Result;

/// Plaintext sealed inside every canary
pub const CANARY_SENTINEL: &str = "ok";

/// Fixed `(iv, cipher)` pair whose plaintext is `CANARY_SENTINEL`
///
/// Both fields are standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCanary {
    pub iv: String,
    pub cipher: String,
}

impl ValidationCanary {
    /// Seal the sentinel under `key` with a fresh random IV
    pub fn provision(key: &DerivedKey) -> Result<Self> {
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let cipher = encrypt_with_iv(key, &iv, CANARY_SENTINEL)?;

        Ok(Self {
            iv: STANDARD.encode(iv),
            cipher: cipher.into_inner(),
        })
    }
}

/// Check whether `key` opens the canary
///
/// Total over its inputs: any decode or authentication failure means "not the
/// right key" and yields `false`.
pub fn validate(key: &DerivedKey, canary: &ValidationCanary) -> bool {
    let iv: [u8; IV_SIZE] = match STANDARD
        .decode(&canary.iv)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
    {
        Some(iv) => iv,
        None => {
            debug!("Canary IV is malformed");
            return false;
        }
    };

    match decrypt_with_iv(key, &iv, &canary.cipher) {
        Ok(plaintext) => plaintext == CANARY_SENTINEL,
        Err(e) => {
            debug!("Canary check failed: {}", e);
            false
        }
    }
}
