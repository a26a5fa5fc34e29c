//! Password-based key derivation using PBKDF2-HMAC-SHA256

use sha2::Sha256;

use super::secure_memory::{MasterSecret, KEY_SIZE};
use crate::error::{Result, VaultError};

/// Default number of PBKDF2 rounds
pub const DEFAULT_ITERATIONS: u32 = 339_616;

/// Fixed salt shared by every vault. Derivation must be reproducible from the
/// password alone so a typed password can be checked against the canary.
const SALT: [u8; 16] = [
    105, 51, 114, 88, 66, 177, 134, 177, 111, 198, 93, 241, 250, 203, 226, 191,
];

/// Derive the 256-bit master secret from a password
///
/// # Arguments
/// * `password` - The user's master password
/// * `iterations` - PBKDF2 round count (use `DEFAULT_ITERATIONS` outside tests)
///
/// # Returns
/// 32 bytes of key material, ready for `import_key`
pub fn derive_master_secret(password: &str, iterations: u32) -> Result<MasterSecret> {
    if iterations == 0 {
        return Err(VaultError::KeyDerivation(
            "Iteration count must be at least 1".to_string(),
        ));
    }

    let mut output = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &SALT, iterations, &mut output);

    Ok(MasterSecret::new(output))
}
