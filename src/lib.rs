//! Slot Vault
//!
//! An encrypted, slot-based flat-file store that sits directly on a block
//! device or regular file. A single password protects up to
//! [`TOTAL_SLOTS`](config::TOTAL_SLOTS) fixed-size slots; no host file system
//! is involved.
//!
//! # Features
//!
//! - **Fixed layout**: a 200 KB metadata block followed by 1000 slots of 1 MiB
//! - **AES-256-GCM Encryption**: every slot and the registry are sealed with
//!   a key derived by Argon2id from the password and a per-device salt
//! - **Integrity pre-check**: a SHA-256 checksum over the metadata block
//!   separates corruption from a wrong password
//! - **Secure erase**: deleted slots are zeroed; whole devices can be wiped
//!   in paced, restartable chunks
//!
//! # Layout
//!
//! ```text
//! [ metadata block | slot 0 | slot 1 | ... | slot 999 ]
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use slot_vault::{Device, Session, Vault};
//! use std::path::Path;
//!
//! let device = Device::open(Path::new("vault.img")).unwrap();
//! let mut vault = Vault::new(device);
//! let mut session = Session::new("a long enough password").unwrap();
//!
//! vault.initialize(&mut session).unwrap();
//! let index = vault.add(&mut session, b"Hidden data", "secret.txt", None).unwrap();
//!
//! let data = vault.get_to_vec(&mut session, index.get() as i64).unwrap();
//! assert_eq!(data, b"Hidden data");
//!
//! session.clear();
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod search;
pub mod storage;
pub mod vault;

pub use config::VaultConfig;
pub use error::{Error, Result};
pub use storage::{Device, MemoryStorage, Storage};
pub use vault::{sync, Registry, Session, SlotEntry, SlotIndex, Vault};
