//! Vault types: slot indices and registry entries.

use crate::config::{MAX_NAME_LEN, SLOT_SIZE};
use crate::error::{Error, Result};
use crate::storage::layout;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated slot index in `0..TOTAL_SLOTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(usize);

impl SlotIndex {
    /// Validate a caller-supplied index.
    pub fn new(index: i64) -> Result<Self> {
        layout::check_index(index).map(Self)
    }

    /// The index as a `usize`.
    pub fn get(self) -> usize {
        self.0
    }

    /// Byte offset of this slot in the storage.
    pub fn offset(self) -> Result<u64> {
        layout::slot_offset(self.0 as i64)
    }
}

impl TryFrom<i64> for SlotIndex {
    type Error = Error;

    fn try_from(index: i64) -> Result<Self> {
        Self::new(index)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check an entry name: non-empty and at most `MAX_NAME_LEN` bytes.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::Validation(format!(
            "name is {} bytes, maximum is {}",
            name.len(),
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// An occupied registry slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    /// Entry name.
    pub name: String,
    /// Length of the envelope stored in the slot.
    pub size: u32,
}

impl SlotEntry {
    /// Create a validated entry.
    pub fn new(name: &str, size: usize) -> Result<Self> {
        let entry = Self {
            name: name.to_string(),
            size: u32::try_from(size)
                .map_err(|_| Error::Capacity(format!("envelope of {} bytes", size)))?,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Check the name and the envelope size bounds.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if self.size == 0 || self.size as usize >= SLOT_SIZE {
            return Err(Error::Capacity(format!(
                "envelope of {} bytes does not fit a {} byte slot",
                self.size, SLOT_SIZE
            )));
        }
        Ok(())
    }
}
