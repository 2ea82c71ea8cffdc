//! Argon2id key derivation for password-based encryption.

use crate::config::{argon2_params, MIN_PASSWORD_LEN};
use crate::error::{Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use std::fmt;
use zeroize::Zeroizing;

/// Length of a derived key in bytes.
pub const KEY_LEN: usize = argon2_params::OUTPUT_LENGTH;

/// Device salt stored in the metadata header.
pub type Salt = [u8; argon2_params::SALT_LENGTH];

/// A 256-bit key derived from the password and device salt.
///
/// The key bytes are wiped when the value is dropped.
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Generate a fresh random device salt.
pub fn generate_salt() -> Salt {
    let mut salt = [0u8; argon2_params::SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Check a password against the minimum length policy.
pub fn validate_password(password: &[u8]) -> Result<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "password must be at least {} bytes",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Derive a 256-bit key from a password and salt.
///
/// Uses Argon2id with the following parameters:
/// - Memory: 64 MB
/// - Iterations: 3
/// - Parallelism: 4
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<DerivedKey> {
    validate_password(password)?;
    if salt.len() != argon2_params::SALT_LENGTH {
        return Err(Error::Validation(format!(
            "salt must be {} bytes, got {}",
            argon2_params::SALT_LENGTH,
            salt.len()
        )));
    }

    let params = Params::new(
        argon2_params::MEMORY_COST,
        argon2_params::TIME_COST,
        argon2_params::PARALLELISM,
        Some(argon2_params::OUTPUT_LENGTH),
    )
    .map_err(|e| Error::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, &mut key[..])
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey(key))
}
