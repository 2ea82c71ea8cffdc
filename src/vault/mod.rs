//! Encrypted slot vault.
//!
//! Provides the registry model, the password session and the operations
//! (initialize, add, get, delete, sync, erase) over a storage handle.

mod operations;
mod registry;
mod session;
mod sync;
mod types;

pub use operations::Vault;
pub use registry::Registry;
pub use session::Session;
pub use sync::sync;
pub use types::{validate_name, SlotEntry, SlotIndex};
