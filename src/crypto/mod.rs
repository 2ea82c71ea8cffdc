//! Cryptographic operations for the slot vault.
//!
//! This module provides:
//! - AES-256-GCM authenticated encryption
//! - Argon2id password-based key derivation
//! - SHA-256 metadata checksums

mod checksum;
mod cipher;
mod kdf;

pub use checksum::{checksum, CHECKSUM_LEN};
pub use cipher::{decrypt, encrypt, Cipher, ENVELOPE_OVERHEAD};
pub use kdf::{derive_key, generate_salt, validate_password, DerivedKey, Salt};
