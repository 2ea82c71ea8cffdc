//! Vault operations - the main interface.

use crate::config::{VaultConfig, META_BLOCK_SIZE, SLOT_SIZE};
use crate::crypto::{decrypt, encrypt, generate_salt, DerivedKey, Salt};
use crate::error::{Error, Result};
use crate::storage::metadata::{self, BlockInfo, MetadataBlock};
use crate::storage::{overwrite, EraseReport, Extent, Storage};
use crate::vault::registry::Registry;
use crate::vault::session::Session;
use crate::vault::types::{validate_name, SlotEntry, SlotIndex};
use std::io::{self, Write};
use tracing::{debug, info, warn};

/// A registry freshly loaded from storage, with the salt it was keyed with.
pub(crate) struct Snapshot {
    pub(crate) salt: Salt,
    pub(crate) registry: Registry,
}

/// An encrypted slot vault on top of a storage handle.
///
/// Every operation re-reads the metadata block, so the vault keeps no state
/// between calls beyond the handle itself. Mutations write the data slot
/// first and the registry second; a crash in between leaves either an
/// orphaned slot (after an interrupted add) or a registry entry pointing at
/// a zeroed slot (after an interrupted delete), both of which fail cleanly
/// on the next read.
///
/// The vault assumes it is the only writer. Two handles mutating the same
/// storage overwrite each other's registry without detection.
pub struct Vault<S: Storage> {
    storage: S,
    config: VaultConfig,
}

impl<S: Storage> Vault<S> {
    /// Wrap a storage handle with the default configuration.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            config: VaultConfig::default(),
        }
    }

    /// Wrap a storage handle with a custom configuration.
    pub fn with_config(storage: S, config: VaultConfig) -> Result<Self> {
        config.validate().map_err(Error::Validation)?;
        Ok(Self { storage, config })
    }

    /// Borrow the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutably borrow the underlying storage.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Create an empty vault, replacing whatever the storage held.
    ///
    /// A regular file is zero-filled (truncated) first so no earlier bytes
    /// survive in unused slots. Raw devices are left as they are; call
    /// [`Vault::erase`] beforehand to scrub them.
    pub fn initialize(&mut self, session: &mut Session) -> Result<()> {
        if let Extent::Bounded(_) = self.storage.extent()? {
            overwrite(&mut self.storage, 0, None, &self.config.erase)?;
        }

        let salt = generate_salt();
        let registry = Registry::new();
        let key = session.key_for(&salt)?;
        persist(&mut self.storage, &salt, &registry, key)?;

        info!("initialized vault");
        Ok(())
    }

    /// Whether the storage holds a valid metadata block of this format.
    pub fn is_initialized(&mut self) -> Result<bool> {
        match self.inspect() {
            Ok(_) => Ok(true),
            Err(Error::NotInitialized) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Validate the metadata header and checksum without a password.
    pub fn inspect(&mut self) -> Result<BlockInfo> {
        let block = read_block(&mut self.storage)?;
        metadata::inspect(&block)
    }

    /// Load and decrypt the registry.
    pub fn load(&mut self, session: &mut Session) -> Result<Registry> {
        Ok(self.snapshot(session)?.registry)
    }

    pub(crate) fn snapshot(&mut self, session: &mut Session) -> Result<Snapshot> {
        let block = read_block(&mut self.storage)?;
        let decoded = MetadataBlock::decode(&block)?;
        let key = session.key_for(&decoded.salt)?;
        let plaintext = decrypt(&decoded.ciphertext, key)?;
        let registry = Registry::from_bytes(&plaintext)?;

        debug!(occupied = registry.occupied_count(), "loaded registry");
        Ok(Snapshot {
            salt: decoded.salt,
            registry,
        })
    }

    /// Encrypt `content` into a slot and record it under `name`.
    ///
    /// Without an explicit index the lowest empty slot is used. An explicit
    /// index that is already occupied is replaced. Returns the slot used.
    pub fn add(
        &mut self,
        session: &mut Session,
        content: &[u8],
        name: &str,
        index: Option<i64>,
    ) -> Result<SlotIndex> {
        validate_name(name)?;
        let requested = index.map(SlotIndex::new).transpose()?;

        let Snapshot { salt, mut registry } = self.snapshot(session)?;
        let index = match requested {
            Some(index) => index,
            None => registry
                .first_free()
                .ok_or_else(|| Error::Capacity("filesystem full".to_string()))?,
        };

        let key = session.key_for(&salt)?;
        let envelope = encrypt(content, key)?;
        if envelope.len() >= SLOT_SIZE {
            return Err(Error::Capacity(format!(
                "file too large: envelope of {} bytes, slot holds {}",
                envelope.len(),
                SLOT_SIZE - 1
            )));
        }
        let entry = SlotEntry::new(name, envelope.len())?;

        let mut padded = envelope;
        padded.resize(SLOT_SIZE, 0);
        write_slot(&mut self.storage, index, &padded)?;

        if registry.insert(index, entry)?.is_some() {
            warn!(%index, "replaced occupied slot");
        }
        persist(&mut self.storage, &salt, &registry, key)?;

        info!(%index, bytes = content.len(), "added entry");
        Ok(index)
    }

    /// Decrypt the entry at `index` into `sink`, returning its length.
    pub fn get<W: Write + ?Sized>(
        &mut self,
        session: &mut Session,
        index: i64,
        sink: &mut W,
    ) -> Result<u64> {
        let index = SlotIndex::new(index)?;
        let Snapshot { salt, registry } = self.snapshot(session)?;
        let entry = registry.get(index).ok_or(Error::NotFound(index.get()))?;

        let mut envelope = vec![0u8; entry.size as usize];
        self.storage.read_at(index.offset()?, &mut envelope)?;

        let key = session.key_for(&salt)?;
        let plaintext = decrypt(&envelope, key).map_err(|_| Error::Authentication)?;

        sink.write_all(&plaintext)?;
        sink.flush()?;

        debug!(%index, bytes = plaintext.len(), "read entry");
        Ok(plaintext.len() as u64)
    }

    /// Decrypt the entry at `index` into memory.
    pub fn get_to_vec(&mut self, session: &mut Session, index: i64) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.get(session, index, &mut out)?;
        Ok(out)
    }

    /// Wipe the slot at `index` and clear its registry entry.
    pub fn delete(&mut self, session: &mut Session, index: i64) -> Result<()> {
        let index = SlotIndex::new(index)?;
        let Snapshot { salt, mut registry } = self.snapshot(session)?;
        if registry.get(index).is_none() {
            return Err(Error::NotFound(index.get()));
        }

        write_slot(&mut self.storage, index, &vec![0u8; SLOT_SIZE])?;

        registry.remove(index)?;
        let key = session.key_for(&salt)?;
        persist(&mut self.storage, &salt, &registry, key)?;

        info!(%index, "deleted entry");
        Ok(())
    }

    /// Zero the whole storage, destroying the vault.
    pub fn erase(&mut self) -> Result<EraseReport> {
        overwrite(&mut self.storage, 0, None, &self.config.erase)
    }

    /// Zero `start..end` of the storage.
    pub fn erase_range(&mut self, start: u64, end: Option<u64>) -> Result<EraseReport> {
        overwrite(&mut self.storage, start, end, &self.config.erase)
    }
}

/// Read the raw metadata block. A storage too short to hold one is treated
/// as uninitialized.
pub(crate) fn read_block<S: Storage + ?Sized>(storage: &mut S) -> Result<Vec<u8>> {
    let mut block = vec![0u8; META_BLOCK_SIZE];
    match storage.read_at(0, &mut block) {
        Ok(()) => Ok(block),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::NotInitialized),
        Err(e) => Err(e.into()),
    }
}

/// Write a raw metadata block image at offset 0 and flush it.
pub(crate) fn write_block<S: Storage + ?Sized>(storage: &mut S, block: &[u8]) -> Result<()> {
    storage.write_at(0, block)?;
    storage.flush()?;
    Ok(())
}

/// Encrypt the registry and rewrite the whole metadata block.
fn persist<S: Storage + ?Sized>(
    storage: &mut S,
    salt: &Salt,
    registry: &Registry,
    key: &DerivedKey,
) -> Result<()> {
    let plaintext = registry.to_bytes()?;
    let ciphertext = encrypt(&plaintext, key)?;
    let block = MetadataBlock {
        salt: *salt,
        ciphertext,
    }
    .encode()?;

    write_block(storage, &block)?;
    debug!(occupied = registry.occupied_count(), "persisted registry");
    Ok(())
}

fn write_slot<S: Storage + ?Sized>(storage: &mut S, index: SlotIndex, data: &[u8]) -> Result<()> {
    let offset = index.offset()?;
    storage.write_at(offset, data)?;
    storage.flush()?;
    debug!(%index, offset, len = data.len(), "wrote slot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_NAME_LEN, TOTAL_SLOTS};
    use crate::crypto::ENVELOPE_OVERHEAD;
    use crate::storage::MemoryStorage;

    const PASSWORD: &str = "correct horse battery";

    fn new_vault() -> (Vault<MemoryStorage>, Session) {
        let storage = MemoryStorage::from_bytes(vec![0u8; META_BLOCK_SIZE + 3 * SLOT_SIZE]);
        let mut vault = Vault::new(storage);
        let mut session = Session::new(PASSWORD).unwrap();
        vault.initialize(&mut session).unwrap();
        (vault, session)
    }

    #[test]
    fn test_scenario_add_get_delete() {
        let (mut vault, mut session) = new_vault();

        let index = vault.add(&mut session, b"hello", "a.txt", None).unwrap();
        assert_eq!(index.get(), 0);
        assert_eq!(vault.get_to_vec(&mut session, 0).unwrap(), b"hello");

        vault.delete(&mut session, 0).unwrap();
        assert!(matches!(
            vault.get_to_vec(&mut session, 0),
            Err(Error::NotFound(0))
        ));
    }

    #[test]
    fn test_initialize_truncates_regular_storage() {
        let storage = MemoryStorage::from_bytes(vec![0xEE; META_BLOCK_SIZE + 2 * SLOT_SIZE]);
        let mut vault = Vault::new(storage);
        let mut session = Session::new(PASSWORD).unwrap();
        vault.initialize(&mut session).unwrap();

        assert_eq!(vault.storage().as_bytes().len(), META_BLOCK_SIZE);
        assert!(vault.is_initialized().unwrap());
    }

    #[test]
    fn test_initialize_leaves_device_slots_alone() {
        let storage = MemoryStorage::device(vec![0xEE; META_BLOCK_SIZE + SLOT_SIZE]);
        let mut vault = Vault::new(storage);
        let mut session = Session::new(PASSWORD).unwrap();
        vault.initialize(&mut session).unwrap();

        let bytes = vault.storage().as_bytes();
        assert!(bytes[META_BLOCK_SIZE..].iter().all(|&b| b == 0xEE));
        assert_eq!(vault.load(&mut session).unwrap().occupied_count(), 0);
    }

    #[test]
    fn test_uninitialized_storage() {
        let mut vault = Vault::new(MemoryStorage::new());
        let mut session = Session::new(PASSWORD).unwrap();

        assert!(!vault.is_initialized().unwrap());
        assert!(matches!(vault.load(&mut session), Err(Error::NotInitialized)));

        let mut vault = Vault::new(MemoryStorage::from_bytes(vec![0u8; META_BLOCK_SIZE]));
        assert!(matches!(vault.load(&mut session), Err(Error::NotInitialized)));
    }

    #[test]
    fn test_add_uses_first_free_slot() {
        let (mut vault, mut session) = new_vault();

        vault.add(&mut session, b"one", "one", Some(0)).unwrap();
        vault.add(&mut session, b"three", "three", Some(2)).unwrap();
        let index = vault.add(&mut session, b"two", "two", None).unwrap();

        assert_eq!(index.get(), 1);
        let registry = vault.load(&mut session).unwrap();
        assert_eq!(registry.get(index).unwrap().name, "two");
        assert_eq!(registry.occupied_count(), 3);
    }

    #[test]
    fn test_add_records_envelope_size() {
        let (mut vault, mut session) = new_vault();
        let index = vault.add(&mut session, b"12345", "five", None).unwrap();

        let registry = vault.load(&mut session).unwrap();
        assert_eq!(
            registry.get(index).unwrap().size as usize,
            5 + ENVELOPE_OVERHEAD
        );
    }

    #[test]
    fn test_add_replaces_explicit_occupied_slot() {
        let (mut vault, mut session) = new_vault();
        vault.add(&mut session, b"first", "a", Some(1)).unwrap();
        vault.add(&mut session, b"second", "b", Some(1)).unwrap();

        assert_eq!(vault.get_to_vec(&mut session, 1).unwrap(), b"second");
        let registry = vault.load(&mut session).unwrap();
        assert_eq!(registry.occupied_count(), 1);
    }

    #[test]
    fn test_add_to_full_vault_fails() {
        let (mut vault, mut session) = new_vault();

        // Mark every slot occupied without writing a gigabyte of slots.
        let Snapshot { salt, mut registry } = vault.snapshot(&mut session).unwrap();
        for i in 0..TOTAL_SLOTS as i64 {
            let entry = SlotEntry::new("filler", ENVELOPE_OVERHEAD).unwrap();
            registry.insert(SlotIndex::new(i).unwrap(), entry).unwrap();
        }
        let key = session.key_for(&salt).unwrap();
        persist(vault.storage_mut(), &salt, &registry, key).unwrap();
        let before = vault.storage().as_bytes()[..META_BLOCK_SIZE].to_vec();

        let result = vault.add(&mut session, b"one too many", "extra", None);

        assert!(matches!(result, Err(Error::Capacity(ref msg)) if msg == "filesystem full"));
        assert_eq!(vault.storage().as_bytes()[..META_BLOCK_SIZE], before[..]);
        assert_eq!(vault.load(&mut session).unwrap().free_count(), 0);
    }

    #[test]
    fn test_empty_content_roundtrip() {
        let (mut vault, mut session) = new_vault();
        vault.add(&mut session, b"", "empty", None).unwrap();

        assert!(vault.get_to_vec(&mut session, 0).unwrap().is_empty());
    }

    #[test]
    fn test_envelope_size_boundary() {
        let (mut vault, mut session) = new_vault();

        let largest = vec![7u8; SLOT_SIZE - ENVELOPE_OVERHEAD - 1];
        vault.add(&mut session, &largest, "big", Some(0)).unwrap();
        assert_eq!(vault.get_to_vec(&mut session, 0).unwrap(), largest);

        let too_big = vec![7u8; SLOT_SIZE - ENVELOPE_OVERHEAD];
        assert!(matches!(
            vault.add(&mut session, &too_big, "bigger", Some(1)),
            Err(Error::Capacity(_))
        ));
        assert!(vault.load(&mut session).unwrap().get(SlotIndex::new(1).unwrap()).is_none());
    }

    #[test]
    fn test_name_validation() {
        let (mut vault, mut session) = new_vault();

        let longest = "n".repeat(MAX_NAME_LEN);
        assert!(vault.add(&mut session, b"x", &longest, None).is_ok());

        let too_long = "n".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            vault.add(&mut session, b"x", &too_long, None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            vault.add(&mut session, b"x", "", None),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_out_of_range_indices() {
        let (mut vault, mut session) = new_vault();

        for index in [-1, TOTAL_SLOTS as i64, i64::MAX, i64::MIN] {
            assert!(matches!(
                vault.add(&mut session, b"x", "x", Some(index)),
                Err(Error::Validation(_))
            ));
            assert!(matches!(
                vault.get_to_vec(&mut session, index),
                Err(Error::Validation(_))
            ));
            assert!(matches!(
                vault.delete(&mut session, index),
                Err(Error::Validation(_))
            ));
        }
    }

    #[test]
    fn test_delete_zeroes_slot() {
        let (mut vault, mut session) = new_vault();
        vault.add(&mut session, b"wipe me", "w", Some(2)).unwrap();
        vault.delete(&mut session, 2).unwrap();

        let start = META_BLOCK_SIZE + 2 * SLOT_SIZE;
        let slot = &vault.storage().as_bytes()[start..start + SLOT_SIZE];
        assert!(slot.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_delete_empty_slot_not_found() {
        let (mut vault, mut session) = new_vault();
        assert!(matches!(
            vault.delete(&mut session, 4),
            Err(Error::NotFound(4))
        ));
    }

    #[test]
    fn test_wrong_password_fails_authentication() {
        let (mut vault, _) = new_vault();
        let mut wrong = Session::new("incorrect horse battery").unwrap();

        assert!(vault.inspect().is_ok());
        assert!(matches!(vault.load(&mut wrong), Err(Error::Authentication)));
    }

    #[test]
    fn test_cleared_session_is_rejected() {
        let (mut vault, mut session) = new_vault();
        session.clear();

        assert!(matches!(vault.load(&mut session), Err(Error::Validation(_))));
    }

    #[test]
    fn test_erase_destroys_vault() {
        let (mut vault, mut session) = new_vault();
        vault.add(&mut session, b"bye", "bye", None).unwrap();

        let report = vault.erase().unwrap();
        assert!(report.truncated);
        assert!(matches!(vault.load(&mut session), Err(Error::NotInitialized)));
    }
}
