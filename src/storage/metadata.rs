//! Fixed-size metadata block at offset 0.
//!
//! ```text
//! offset 0   magic "SLOTV"          5 bytes
//! offset 5   format version         1 byte
//! offset 6   reserved               2 bytes
//! offset 8   device salt           32 bytes
//! offset 40  ciphertext length      4 bytes, big-endian
//! offset 44  ciphertext             variable
//! ...        SHA-256 of [0, 44 + ciphertext length)
//! ...        zero padding up to META_BLOCK_SIZE
//! ```
//!
//! Only the salt and the encrypted registry live here. The checksum does not
//! depend on the password, so a passing checksum says nothing about whether
//! the key will decrypt the registry.

use crate::config::{META_BLOCK_SIZE, VAULT_MAGIC, VAULT_VERSION};
use crate::crypto::{checksum, Salt, CHECKSUM_LEN};
use crate::error::{Error, Result};

const VERSION_OFFSET: usize = 5;
const SALT_OFFSET: usize = 8;
const LENGTH_OFFSET: usize = 40;
const CIPHERTEXT_OFFSET: usize = 44;

/// Largest ciphertext the block can hold.
pub const MAX_CIPHERTEXT_LEN: usize = META_BLOCK_SIZE - CIPHERTEXT_OFFSET - CHECKSUM_LEN;

/// Decoded contents of a metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataBlock {
    /// Device salt for key derivation.
    pub salt: Salt,
    /// Encrypted registry envelope.
    pub ciphertext: Vec<u8>,
}

/// Header summary that can be read without a password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub version: u8,
    pub salt: Salt,
    pub ciphertext_len: usize,
    pub checksum: [u8; CHECKSUM_LEN],
}

impl MetadataBlock {
    /// Assemble the full `META_BLOCK_SIZE` byte image.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let len = self.ciphertext.len();
        if len > MAX_CIPHERTEXT_LEN {
            return Err(Error::Capacity(format!(
                "registry ciphertext of {} bytes exceeds metadata capacity {}",
                len, MAX_CIPHERTEXT_LEN
            )));
        }

        let mut block = vec![0u8; META_BLOCK_SIZE];
        block[..VERSION_OFFSET].copy_from_slice(&VAULT_MAGIC);
        block[VERSION_OFFSET] = VAULT_VERSION;
        block[SALT_OFFSET..LENGTH_OFFSET].copy_from_slice(&self.salt);
        block[LENGTH_OFFSET..CIPHERTEXT_OFFSET].copy_from_slice(&(len as u32).to_be_bytes());

        let body_end = CIPHERTEXT_OFFSET + len;
        block[CIPHERTEXT_OFFSET..body_end].copy_from_slice(&self.ciphertext);
        let digest = checksum(&block[..body_end]);
        block[body_end..body_end + CHECKSUM_LEN].copy_from_slice(&digest);

        Ok(block)
    }

    /// Validate magic, version, length and checksum, then split out the
    /// salt and ciphertext.
    pub fn decode(block: &[u8]) -> Result<Self> {
        let info = inspect(block)?;
        let body_end = CIPHERTEXT_OFFSET + info.ciphertext_len;

        Ok(Self {
            salt: info.salt,
            ciphertext: block[CIPHERTEXT_OFFSET..body_end].to_vec(),
        })
    }
}

/// Validate a block image and summarize its header.
pub fn inspect(block: &[u8]) -> Result<BlockInfo> {
    if block.len() < META_BLOCK_SIZE || block[..VERSION_OFFSET] != VAULT_MAGIC {
        return Err(Error::NotInitialized);
    }

    let version = block[VERSION_OFFSET];
    if version != VAULT_VERSION {
        return Err(Error::IncompatibleVersion {
            found: version,
            supported: VAULT_VERSION,
        });
    }

    let mut salt = [0u8; 32];
    salt.copy_from_slice(&block[SALT_OFFSET..LENGTH_OFFSET]);

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&block[LENGTH_OFFSET..CIPHERTEXT_OFFSET]);
    let ciphertext_len = u32::from_be_bytes(len_bytes) as usize;
    if ciphertext_len > MAX_CIPHERTEXT_LEN {
        return Err(Error::Integrity(format!(
            "ciphertext length {} exceeds metadata capacity {}",
            ciphertext_len, MAX_CIPHERTEXT_LEN
        )));
    }

    let body_end = CIPHERTEXT_OFFSET + ciphertext_len;
    let mut stored = [0u8; CHECKSUM_LEN];
    stored.copy_from_slice(&block[body_end..body_end + CHECKSUM_LEN]);
    if checksum(&block[..body_end]) != stored {
        return Err(Error::Integrity("metadata checksum mismatch".to_string()));
    }

    Ok(BlockInfo {
        version,
        salt,
        ciphertext_len,
        checksum: stored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MetadataBlock {
        MetadataBlock {
            salt: [42u8; 32],
            ciphertext: b"not really a ciphertext".to_vec(),
        }
    }

    #[test]
    fn test_encode_layout() {
        let block = sample().encode().unwrap();

        assert_eq!(block.len(), META_BLOCK_SIZE);
        assert_eq!(&block[0..5], b"SLOTV");
        assert_eq!(block[5], VAULT_VERSION);
        assert_eq!(&block[6..8], &[0u8, 0]);
        assert_eq!(&block[8..40], &[42u8; 32]);
        assert_eq!(&block[40..44], &23u32.to_be_bytes());
        assert_eq!(&block[44..67], b"not really a ciphertext");
        assert_eq!(block[67..99], checksum(&block[..67]));
        assert!(block[99..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_decode_roundtrip() {
        let block = sample().encode().unwrap();
        assert_eq!(MetadataBlock::decode(&block).unwrap(), sample());
    }

    #[test]
    fn test_bad_magic() {
        let mut block = sample().encode().unwrap();
        block[0] = b'X';
        assert!(matches!(
            MetadataBlock::decode(&block),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            MetadataBlock::decode(&vec![0u8; META_BLOCK_SIZE]),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn test_short_block_is_not_initialized() {
        assert!(matches!(
            MetadataBlock::decode(b"SLOTV"),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn test_unknown_version() {
        let mut block = sample().encode().unwrap();
        block[5] = VAULT_VERSION + 1;
        assert!(matches!(
            MetadataBlock::decode(&block),
            Err(Error::IncompatibleVersion { found, .. }) if found == VAULT_VERSION + 1
        ));
    }

    #[test]
    fn test_corrupted_byte_fails_checksum() {
        let mut block = sample().encode().unwrap();
        block[50] ^= 0x80;
        assert!(matches!(
            MetadataBlock::decode(&block),
            Err(Error::Integrity(_))
        ));

        let mut block = sample().encode().unwrap();
        block[10] ^= 0x01;
        assert!(matches!(
            MetadataBlock::decode(&block),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_oversized_length_field() {
        let mut block = sample().encode().unwrap();
        block[40..44].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            MetadataBlock::decode(&block),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_oversized_ciphertext_rejected() {
        let block = MetadataBlock {
            salt: [0u8; 32],
            ciphertext: vec![1u8; MAX_CIPHERTEXT_LEN + 1],
        };
        assert!(matches!(block.encode(), Err(Error::Capacity(_))));

        let block = MetadataBlock {
            salt: [0u8; 32],
            ciphertext: vec![1u8; MAX_CIPHERTEXT_LEN],
        };
        let image = block.encode().unwrap();
        assert_eq!(MetadataBlock::decode(&image).unwrap(), block);
    }

    #[test]
    fn test_inspect_reports_header() {
        let block = sample().encode().unwrap();
        let info = inspect(&block).unwrap();

        assert_eq!(info.version, VAULT_VERSION);
        assert_eq!(info.salt, [42u8; 32]);
        assert_eq!(info.ciphertext_len, 23);
    }
}
