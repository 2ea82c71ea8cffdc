//! The registry: which slots hold what.

use crate::config::{MAX_NAME_LEN, TOTAL_SLOTS};
use crate::crypto::ENVELOPE_OVERHEAD;
use crate::error::{Error, Result};
use crate::storage::metadata::MAX_CIPHERTEXT_LEN;
use crate::vault::types::{SlotEntry, SlotIndex};
use zeroize::Zeroizing;

/// Worst-case bincode size: vec length, then per slot an option tag, a name
/// length, the name and the size.
const MAX_REGISTRY_BYTES: usize = 8 + TOTAL_SLOTS * (1 + 8 + MAX_NAME_LEN + 4);

const _: () = assert!(MAX_REGISTRY_BYTES + ENVELOPE_OVERHEAD <= MAX_CIPHERTEXT_LEN);

/// Fixed-capacity table of `TOTAL_SLOTS` entries, indexed by slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    slots: Vec<Option<SlotEntry>>,
}

impl Registry {
    /// Create an all-empty registry.
    pub fn new() -> Self {
        Self {
            slots: vec![None; TOTAL_SLOTS],
        }
    }

    /// Number of slots, occupied or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Entry at `index`, if occupied.
    pub fn get(&self, index: SlotIndex) -> Option<&SlotEntry> {
        self.slots.get(index.get()).and_then(Option::as_ref)
    }

    /// Store `entry` at `index`, returning the entry it replaced.
    pub fn insert(&mut self, index: SlotIndex, entry: SlotEntry) -> Result<Option<SlotEntry>> {
        entry.validate()?;
        let slot = self.slot_mut(index)?;
        Ok(slot.replace(entry))
    }

    /// Clear the entry at `index`, returning it.
    pub fn remove(&mut self, index: SlotIndex) -> Result<Option<SlotEntry>> {
        Ok(self.slot_mut(index)?.take())
    }

    fn slot_mut(&mut self, index: SlotIndex) -> Result<&mut Option<SlotEntry>> {
        let capacity = self.slots.len();
        self.slots.get_mut(index.get()).ok_or_else(|| {
            Error::Validation(format!(
                "slot index {} exceeds registry capacity {}",
                index, capacity
            ))
        })
    }

    /// Lowest-numbered empty slot.
    pub fn first_free(&self) -> Option<SlotIndex> {
        self.slots
            .iter()
            .position(Option::is_none)
            .map(|i| SlotIndex::new(i as i64))
            .and_then(Result::ok)
    }

    /// Occupied slots in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (SlotIndex, &SlotEntry)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            let entry = slot.as_ref()?;
            SlotIndex::new(i as i64).ok().map(|index| (index, entry))
        })
    }

    /// Number of occupied slots.
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Number of empty slots.
    pub fn free_count(&self) -> usize {
        self.capacity() - self.occupied_count()
    }

    /// Serialize for encryption into the metadata block.
    pub(crate) fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(bincode::serialize(&self.slots)?))
    }

    /// Deserialize and validate a decrypted registry body.
    pub(crate) fn from_bytes(data: &[u8]) -> Result<Self> {
        let slots: Vec<Option<SlotEntry>> = bincode::deserialize(data)?;
        if slots.len() != TOTAL_SLOTS {
            return Err(Error::Format(format!(
                "registry has {} slots, expected {}",
                slots.len(),
                TOTAL_SLOTS
            )));
        }
        for (i, entry) in slots.iter().enumerate() {
            if let Some(entry) = entry {
                entry
                    .validate()
                    .map_err(|e| Error::Format(format!("slot {}: {}", i, e)))?;
            }
        }
        Ok(Self { slots })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
