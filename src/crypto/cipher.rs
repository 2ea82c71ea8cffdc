//! AES-256-GCM authenticated encryption.

use crate::crypto::kdf::DerivedKey;
use crate::error::{Error, Result};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use rand::RngCore;
use zeroize::Zeroizing;

/// Nonce size for AES-GCM (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits).
pub const TAG_SIZE: usize = 16;

/// Bytes an envelope adds on top of its plaintext.
pub const ENVELOPE_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// AES-256-GCM cipher wrapper.
pub struct Cipher {
    cipher: Aes256Gcm,
}

impl Cipher {
    /// Create a new cipher from a derived key.
    pub fn new(key: &DerivedKey) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt data with a random nonce.
    ///
    /// Returns: nonce (12 bytes) || ciphertext || tag (16 bytes)
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        // A zero nonce means the RNG is broken; reuse under one key is fatal.
        if nonce_bytes == [0u8; NONCE_SIZE] {
            return Err(Error::Encryption("generated an all-zero nonce".to_string()));
        }
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let mut envelope = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);

        Ok(envelope)
    }

    /// Decrypt an envelope produced by `encrypt`.
    ///
    /// Expects: nonce (12 bytes) || ciphertext || tag (16 bytes)
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if envelope.len() < NONCE_SIZE {
            return Err(Error::Format(format!(
                "envelope of {} bytes is shorter than the nonce",
                envelope.len()
            )));
        }

        let (nonce_bytes, ciphertext) = envelope.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| Error::Authentication)
    }
}

/// Encrypt data with a pre-derived key.
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> Result<Vec<u8>> {
    Cipher::new(key).encrypt(plaintext)
}

/// Decrypt data with a pre-derived key.
pub fn decrypt(envelope: &[u8], key: &DerivedKey) -> Result<Zeroizing<Vec<u8>>> {
    Cipher::new(key).decrypt(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derive_key;
    use std::sync::OnceLock;

    fn test_key() -> &'static DerivedKey {
        static KEY: OnceLock<DerivedKey> = OnceLock::new();
        KEY.get_or_init(|| derive_key(b"correct horse battery", &[7u8; 32]).unwrap())
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"Hello, World! This is a secret message.";

        let envelope = encrypt(plaintext, test_key()).unwrap();
        let decrypted = decrypt(&envelope, test_key()).unwrap();

        assert_eq!(decrypted.as_slice(), plaintext);
        assert_eq!(envelope.len(), plaintext.len() + ENVELOPE_OVERHEAD);
    }

    #[test]
    fn test_same_plaintext_different_envelopes() {
        let plaintext = b"Same message";

        let first = encrypt(plaintext, test_key()).unwrap();
        let second = encrypt(plaintext, test_key()).unwrap();

        assert_ne!(first[..NONCE_SIZE], second[..NONCE_SIZE]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_empty_plaintext() {
        let envelope = encrypt(b"", test_key()).unwrap();
        assert_eq!(envelope.len(), ENVELOPE_OVERHEAD);

        let decrypted = decrypt(&envelope, test_key()).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_tampered_envelope_fails() {
        let mut envelope = encrypt(b"Secret data", test_key()).unwrap();
        envelope[NONCE_SIZE + 2] ^= 0x01;

        assert!(matches!(
            decrypt(&envelope, test_key()),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let envelope = encrypt(b"Secret data", test_key()).unwrap();
        let other = derive_key(b"correct horse battery", &[8u8; 32]).unwrap();

        assert!(matches!(decrypt(&envelope, &other), Err(Error::Authentication)));
    }

    #[test]
    fn test_short_envelope_is_format_error() {
        assert!(matches!(
            decrypt(&[0u8; NONCE_SIZE - 1], test_key()),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_zeroed_envelope_fails_authentication() {
        let zeros = vec![0u8; 64];
        assert!(matches!(decrypt(&zeros, test_key()), Err(Error::Authentication)));
    }

    #[test]
    fn test_key_schedule_is_wiped_on_drop() {
        fn assert_zeroize_on_drop<T: zeroize::ZeroizeOnDrop>() {}
        assert_zeroize_on_drop::<aes::Aes256>();
    }
}
