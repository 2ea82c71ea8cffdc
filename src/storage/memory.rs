//! In-memory storage handles.

use crate::storage::{Extent, Storage};
use std::io;

/// Storage backed by a byte vector.
///
/// In file mode the buffer grows on writes past its end and supports
/// truncation, like a regular file. In device mode the buffer has a fixed
/// size, reports an unbounded extent, fails writes past its end with
/// `ENOSPC` and refuses truncation, like a raw block device.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Vec<u8>,
    fixed: bool,
}

impl MemoryStorage {
    /// Create an empty, growable storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a growable storage pre-filled with `data`.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, fixed: false }
    }

    /// Create a fixed-size, device-like storage holding `data`.
    pub fn device(data: Vec<u8>) -> Self {
        Self { data, fixed: true }
    }

    /// Current contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

fn offset_to_usize(offset: u64) -> io::Result<usize> {
    usize::try_from(offset).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("offset {} exceeds addressable memory", offset),
        )
    })
}

impl Storage for MemoryStorage {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = offset_to_usize(offset)?;
        let end = start.checked_add(buf.len()).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                buf.copy_from_slice(&self.data[start..end]);
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read past end of storage",
            )),
        }
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        let start = offset_to_usize(offset)?;
        let end = start
            .checked_add(data.len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "write overflows"))?;

        if end > self.data.len() {
            if self.fixed {
                // Write what fits, then report a full device.
                if start < self.data.len() {
                    let fits = self.data.len() - start;
                    self.data[start..].copy_from_slice(&data[..fits]);
                }
                return Err(io::Error::from_raw_os_error(libc::ENOSPC));
            }
            self.data.resize(end, 0);
        }

        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn extent(&self) -> io::Result<Extent> {
        if self.fixed {
            Ok(Extent::Unbounded)
        } else {
            Ok(Extent::Bounded(self.data.len() as u64))
        }
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        if self.fixed {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "cannot truncate a device",
            ));
        }
        self.data.truncate(offset_to_usize(len)?);
        Ok(())
    }
}
