//! SHA-256 checksum used to pre-screen the metadata block for corruption.

use sha2::{Digest, Sha256};

/// Length of a checksum in bytes.
pub const CHECKSUM_LEN: usize = 32;

/// Compute the SHA-256 digest of `data`.
pub fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest);
    out
}
