//! Configuration constants and types for the slot vault.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of addressable slots in every vault.
pub const TOTAL_SLOTS: usize = 1000;

/// Size of the metadata block at the start of the storage.
pub const META_BLOCK_SIZE: usize = 200_000;

/// Size of a single data slot (1 MiB).
pub const SLOT_SIZE: usize = 1 << 20;

/// Maximum length of an entry name in bytes.
pub const MAX_NAME_LEN: usize = 128;

/// Minimum password length in bytes.
pub const MIN_PASSWORD_LEN: usize = 12;

/// Metadata magic: "SLOTV".
pub const VAULT_MAGIC: [u8; 5] = *b"SLOTV";

/// Current metadata format version.
pub const VAULT_VERSION: u8 = 1;

/// Argon2id parameters for key derivation.
pub mod argon2_params {
    /// Memory cost in KiB (64 MB).
    pub const MEMORY_COST: u32 = 65536;

    /// Time cost (iterations).
    pub const TIME_COST: u32 = 3;

    /// Parallelism factor.
    pub const PARALLELISM: u32 = 4;

    /// Output length in bytes (256 bits).
    pub const OUTPUT_LENGTH: usize = 32;

    /// Salt length in bytes.
    pub const SALT_LENGTH: usize = 32;
}

/// Secure erase parameters.
pub mod erase_params {
    /// Zero chunk written per checkpoint (1 MiB).
    pub const CHUNK_SIZE: usize = 1 << 20;

    /// A chunk slower than this triggers a pause.
    pub const SLOW_WRITE_THRESHOLD_MS: u64 = 500;

    /// Pause inserted after a slow chunk.
    pub const PAUSE_MS: u64 = 200;
}

/// Pacing for zero-fill erase runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraseConfig {
    /// Bytes written and flushed per chunk.
    pub chunk_size: usize,

    /// Write+flush latency above which the next chunk is delayed.
    pub slow_write_threshold: Duration,

    /// Delay applied after a slow chunk.
    pub pause: Duration,
}

impl Default for EraseConfig {
    fn default() -> Self {
        Self {
            chunk_size: erase_params::CHUNK_SIZE,
            slow_write_threshold: Duration::from_millis(erase_params::SLOW_WRITE_THRESHOLD_MS),
            pause: Duration::from_millis(erase_params::PAUSE_MS),
        }
    }
}

impl EraseConfig {
    /// Create an erase configuration with custom pacing.
    pub fn new(chunk_size: usize, slow_write_threshold: Duration, pause: Duration) -> Self {
        Self {
            chunk_size,
            slow_write_threshold,
            pause,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("Erase chunk size must be greater than 0".to_string());
        }
        if self.pause > Duration::from_secs(60) {
            return Err("Erase pause must not exceed 60 seconds".to_string());
        }
        Ok(())
    }
}

/// Runtime configuration for a vault handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Pacing used by initialize and erase.
    pub erase: EraseConfig,
}

impl VaultConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.erase.validate()
    }
}
