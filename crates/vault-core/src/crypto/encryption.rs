//! AES-256-GCM authenticated encryption
//!
//! Blob format: standard base64 of `{ciphertext}{auth_tag}`
//! - IV: 12 bytes (96 bits), not stored - vault sync always uses `SYNC_IV`
//! - Auth tag: 16 bytes (128 bits), appended by GCM
//! - Ciphertext: same length as the plaintext
//!
//! Every sync write reuses the same (key, IV) pair. The validation canary
//! carries its own fixed IV and goes through `encrypt_with_iv` /
//! `decrypt_with_iv`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::secure_memory::{DerivedKey, KEY_SIZE};
use crate::error::{Result, VaultError};

/// Size of the GCM nonce in bytes
pub const IV_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// IV shared by every vault sync write
pub const SYNC_IV: [u8; IV_SIZE] = [
    0x5a, 0x1f, 0xc3, 0x77, 0x08, 0xe4, 0x92, 0x3b, 0x6d, 0xa0, 0x41, 0xbe,
];

/// Base64-encoded `ciphertext || tag`, persisted opaquely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedBlob(String);

impl EncryptedBlob {
    /// Wrap an encoded blob read back from storage
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Import raw key material as an AES-256-GCM key
///
/// Fails with `KeyImport` unless `secret` is exactly 32 bytes.
pub fn import_key(secret: &[u8]) -> Result<DerivedKey> {
    let key: [u8; KEY_SIZE] = secret.try_into().map_err(|_| {
        VaultError::KeyImport(format!(
            "Invalid key length: expected {}, got {}",
            KEY_SIZE,
            secret.len()
        ))
    })?;
    Ok(DerivedKey::new(key))
}

/// Encrypt a string under the fixed sync IV
pub fn encrypt(key: &DerivedKey, plaintext: &str) -> Result<EncryptedBlob> {
    encrypt_with_iv(key, &SYNC_IV, plaintext)
}

/// Decrypt a blob written by `encrypt`
///
/// Returns `Decode` for malformed blobs and `Authentication` when the tag does
/// not verify. No plaintext is returned on failure.
pub fn decrypt(key: &DerivedKey, blob: &EncryptedBlob) -> Result<String> {
    decrypt_with_iv(key, &SYNC_IV, blob.as_str())
}

/// Encrypt a string under an explicit IV
pub fn encrypt_with_iv(
    key: &DerivedKey,
    iv: &[u8; IV_SIZE],
    plaintext: &str,
) -> Result<EncryptedBlob> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    // aes-gcm appends the auth tag to the ciphertext
    let ciphertext_with_tag = cipher
        .encrypt(Nonce::from_slice(iv), plaintext.as_bytes())
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    Ok(EncryptedBlob(STANDARD.encode(ciphertext_with_tag)))
}

/// Decrypt a base64 `ciphertext || tag` string under an explicit IV
pub fn decrypt_with_iv(key: &DerivedKey, iv: &[u8; IV_SIZE], encoded: &str) -> Result<String> {
    let ciphertext_with_tag = STANDARD
        .decode(encoded)
        .map_err(|e| VaultError::Decode(format!("Invalid base64: {}", e)))?;

    if ciphertext_with_tag.len() < TAG_SIZE {
        return Err(VaultError::Decode(format!(
            "Ciphertext too short: expected at least {} bytes, got {}",
            TAG_SIZE,
            ciphertext_with_tag.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::KeyImport(e.to_string()))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv), ciphertext_with_tag.as_slice())
        .map_err(|_| VaultError::Authentication)?;

    String::from_utf8(plaintext).map_err(|_| VaultError::Decode("Invalid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key_derivation::derive_master_secret;

    fn test_key(password: &str) -> DerivedKey {
        let secret = derive_master_secret(password, 1000).unwrap();
        import_key(secret.as_bytes()).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key("correct-horse");
        let message = r#"{"a":{"id":"a","name":"n","value":"v","url":[]}}"#;

        let blob = encrypt(&key, message).unwrap();
        let decrypted = decrypt(&key, &blob).unwrap();

        assert_eq!(decrypted, message);
    }

    #[test]
    fn test_encrypt_known_answer() {
        let key = test_key("correct-horse");
        let message = r#"{"a":{"id":"a","name":"n","value":"v","url":[]}}"#;

        let blob = encrypt(&key, message).unwrap();

        assert_eq!(
            blob.as_str(),
            "H1iLyF+Ui0ubc0+XSJOPp6HNbhWywP0wKmrg2JZu5/BQRoeeiqZbPgoTeunYw951rQ2CN+lm7czOjX1QbetaMw=="
        );
    }

    #[test]
    fn test_fixed_iv_is_deterministic() {
        let key = test_key("correct-horse");

        let blob1 = encrypt(&key, "same plaintext").unwrap();
        let blob2 = encrypt(&key, "same plaintext").unwrap();

        assert_eq!(blob1, blob2);
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let key = test_key("correct-horse");

        let blob = encrypt(&key, "").unwrap();
        assert_eq!(STANDARD.decode(blob.as_str()).unwrap().len(), TAG_SIZE);
        assert_eq!(decrypt(&key, &blob).unwrap(), "");
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let key1 = test_key("correct-horse");
        let key2 = test_key("battery-staple");

        let blob = encrypt(&key1, "secret data").unwrap();
        let result = decrypt(&key2, &blob);

        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let key = test_key("correct-horse");
        let blob = encrypt(&key, "secret data").unwrap();

        let mut raw = STANDARD.decode(blob.as_str()).unwrap();
        raw[0] ^= 0xFF;
        let tampered = EncryptedBlob::new(STANDARD.encode(raw));

        assert!(matches!(decrypt(&key, &tampered), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_tampered_tag_fails_authentication() {
        let key = test_key("correct-horse");
        let blob = encrypt(&key, "secret data").unwrap();

        let mut raw = STANDARD.decode(blob.as_str()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = EncryptedBlob::new(STANDARD.encode(raw));

        assert!(matches!(decrypt(&key, &tampered), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_wrong_iv_fails_authentication() {
        let key = test_key("correct-horse");
        let blob = encrypt(&key, "secret data").unwrap();

        let other_iv = [0u8; IV_SIZE];
        let result = decrypt_with_iv(&key, &other_iv, blob.as_str());

        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_invalid_encoding_fails_decode() {
        let key = test_key("correct-horse");

        let result = decrypt(&key, &EncryptedBlob::new("not base64 !!"));
        assert!(matches!(result, Err(VaultError::Decode(_))));

        let short = EncryptedBlob::new(STANDARD.encode([1u8, 2, 3]));
        assert!(matches!(decrypt(&key, &short), Err(VaultError::Decode(_))));
    }

    #[test]
    fn test_import_key_rejects_wrong_length() {
        assert!(matches!(import_key(&[0u8; 16]), Err(VaultError::KeyImport(_))));
        assert!(matches!(import_key(&[]), Err(VaultError::KeyImport(_))));
        assert!(import_key(&[0u8; 32]).is_ok());
    }
}
