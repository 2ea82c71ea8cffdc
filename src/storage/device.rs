//! File and raw block device access.

use crate::storage::{Extent, Storage};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

/// Handle for a regular file or raw block device backing a vault.
pub struct Device {
    file: File,
    path: PathBuf,
}

impl Device {
    /// Open an existing file or device for reading and writing.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Create a new regular file pre-sized to `len` bytes.
    ///
    /// Fails if the file already exists.
    pub fn create(path: &Path, len: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        file.set_len(len)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the handle refers to a block or character device.
    pub fn is_raw_device(&self) -> io::Result<bool> {
        let file_type = self.file.metadata()?.file_type();
        Ok(file_type.is_block_device() || file_type.is_char_device())
    }
}

impl Storage for Device {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }

    fn extent(&self) -> io::Result<Extent> {
        if self.is_raw_device()? {
            return Ok(Extent::Unbounded);
        }
        Ok(Extent::Bounded(self.file.metadata()?.len()))
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        if self.is_raw_device()? {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("cannot truncate raw device {}", self.path.display()),
            ));
        }
        self.file.set_len(len)?;
        self.file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_extent() {
        let dir = TempDir::new().unwrap();
        let device = Device::create(&dir.path().join("vault.img"), 4096).unwrap();

        assert_eq!(device.extent().unwrap(), Extent::Bounded(4096));
        assert!(!device.is_raw_device().unwrap());
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.img");
        Device::create(&path, 16).unwrap();

        assert!(Device::create(&path, 16).is_err());
    }

    #[test]
    fn test_write_and_read_at_offset() {
        let dir = TempDir::new().unwrap();
        let mut device = Device::create(&dir.path().join("vault.img"), 1024).unwrap();

        device.write_at(100, b"Hidden data").unwrap();
        device.flush().unwrap();

        let mut buf = [0u8; 11];
        device.read_at(100, &mut buf).unwrap();
        assert_eq!(&buf, b"Hidden data");
    }

    #[test]
    fn test_write_past_end_extends_file() {
        let dir = TempDir::new().unwrap();
        let mut device = Device::create(&dir.path().join("vault.img"), 10).unwrap();

        device.write_at(20, b"tail").unwrap();
        assert_eq!(device.extent().unwrap(), Extent::Bounded(24));
    }

    #[test]
    fn test_short_read_is_error() {
        let dir = TempDir::new().unwrap();
        let mut device = Device::create(&dir.path().join("vault.img"), 8).unwrap();

        let mut buf = [0u8; 16];
        let err = device.read_at(0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_truncate() {
        let dir = TempDir::new().unwrap();
        let mut device = Device::create(&dir.path().join("vault.img"), 4096).unwrap();

        device.truncate(0).unwrap();
        assert_eq!(device.extent().unwrap(), Extent::Bounded(0));
    }
}
