//! Storage layer.
//!
//! This module handles:
//! - Positioned I/O against files, raw devices and memory
//! - Slot offset arithmetic
//! - The on-disk metadata block format
//! - Zero-fill erase

mod device;
pub mod erase;
pub mod layout;
mod memory;
pub(crate) mod metadata;

use std::io;

pub use device::Device;
pub use erase::{overwrite, EraseReport};
pub use memory::MemoryStorage;
pub use metadata::{BlockInfo, MetadataBlock};

/// Known size of a storage handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// Regular file of the given current length.
    Bounded(u64),
    /// Raw device whose end is only discovered by a failing write.
    Unbounded,
}

/// Positioned, flushable byte storage backing a vault.
///
/// Implementations are used from one thread at a time; the vault performs no
/// locking of its own.
pub trait Storage {
    /// Fill `buf` from `offset`, failing on a short read.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Write all of `data` at `offset`.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Make previous writes durable.
    fn flush(&mut self) -> io::Result<()>;

    /// Report the current extent of the storage.
    fn extent(&self) -> io::Result<Extent>;

    /// Truncate to `len` bytes. Only regular files support this.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}
