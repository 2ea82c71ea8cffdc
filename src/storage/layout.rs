//! Slot addressing.
//!
//! Slot `i` occupies `[META_BLOCK_SIZE + i * SLOT_SIZE, META_BLOCK_SIZE + (i + 1) * SLOT_SIZE)`.
//! All arithmetic is done in checked `i64` so no slot count or slot size can
//! silently wrap.

use crate::config::{META_BLOCK_SIZE, SLOT_SIZE, TOTAL_SLOTS};
use crate::error::{Error, Result};

fn overflow(index: i64) -> Error {
    Error::Validation(format!("offset of slot {} overflows", index))
}

/// Validate a slot index against `0..TOTAL_SLOTS`.
pub fn check_index(index: i64) -> Result<usize> {
    if index < 0 || index >= TOTAL_SLOTS as i64 {
        return Err(Error::Validation(format!(
            "slot index {} out of range 0..{}",
            index, TOTAL_SLOTS
        )));
    }
    usize::try_from(index).map_err(|_| overflow(index))
}

/// Byte offset of the first byte of slot `index`.
pub fn slot_offset(index: i64) -> Result<u64> {
    check_index(index)?;
    let offset = index
        .checked_mul(SLOT_SIZE as i64)
        .and_then(|rel| rel.checked_add(META_BLOCK_SIZE as i64))
        .ok_or_else(|| overflow(index))?;
    u64::try_from(offset).map_err(|_| overflow(index))
}
