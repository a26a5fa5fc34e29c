//! Key material with automatic zeroization

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of an AES-256 key and of the PBKDF2 output, in bytes
pub const KEY_SIZE: usize = 32;

/// Raw key-stretching output - automatically zeroed when dropped
///
/// Lives only for the duration of an unlock, except when handed to the
/// session key cache.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret {
    bytes: [u8; KEY_SIZE],
}

impl MasterSecret {
    /// Wrap raw derivation output
    pub fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Get the secret bytes (use carefully - avoid copying)
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Create from a slice (must be exactly 32 bytes)
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; KEY_SIZE] = slice.try_into().ok()?;
        Some(Self { bytes })
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Imported AES-256-GCM key - automatically zeroed when dropped
///
/// Only `encryption::import_key` constructs one, so holding a `DerivedKey`
/// means the length check already passed.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub(crate) fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DerivedKey {}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_secret_from_slice() {
        let bytes = [42u8; 32];
        let secret = MasterSecret::from_slice(&bytes).unwrap();
        assert_eq!(secret.as_bytes(), &bytes);
    }

    #[test]
    fn test_master_secret_from_invalid_slice() {
        assert!(MasterSecret::from_slice(&[42u8; 16]).is_none());
        assert!(MasterSecret::from_slice(&[42u8; 33]).is_none());
    }

    #[test]
    fn test_debug_redacted() {
        let secret = MasterSecret::new([7u8; 32]);
        let debug = format!("{:?}", secret);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains('7'));

        let key = DerivedKey::new([7u8; 32]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains('7'));
    }
}
