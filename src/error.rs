//! Error types for the slot vault.

use thiserror::Error;

/// Result type alias for slot vault operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in slot vault operations.
///
/// Every failure is surfaced as its own variant; nothing is retried or
/// downgraded to a best-effort fallback.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid argument: name, index, password or salt length.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Storage does not start with a metadata block of this format.
    #[error("Storage is not initialized (no slot vault metadata found)")]
    NotInitialized,

    /// Metadata was written by an unsupported format version.
    #[error("Incompatible metadata version: found {found}, supported {supported}")]
    IncompatibleVersion { found: u8, supported: u8 },

    /// Metadata checksum mismatch, most likely on-disk corruption.
    #[error("Metadata integrity check failed: {0}")]
    Integrity(String),

    /// AEAD tag mismatch: wrong password or tampered data.
    #[error("Authentication failed: wrong password or tampered data")]
    Authentication,

    /// Entry too large for a slot, or no free slot left.
    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    /// Operation addressed an empty slot.
    #[error("Slot {0} is empty")]
    NotFound(usize),

    /// I/O error against the storage handle.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed envelope or registry payload.
    #[error("Format error: {0}")]
    Format(String),

    /// Key derivation failed inside the KDF itself.
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Format(e.to_string())
    }
}
