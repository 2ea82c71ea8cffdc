//! Ciphertext-level replication between two vaults.

use crate::error::Result;
use crate::storage::Storage;
use crate::vault::operations::{read_block, write_block, Snapshot, Vault};
use crate::vault::session::Session;
use crate::vault::types::SlotIndex;
use tracing::{debug, info};

/// Copy the source vault onto the destination.
///
/// The source metadata block is written to the destination byte for byte,
/// so the destination ends up with the same salt and must be opened with
/// the same password. Every slot occupied in the source is then copied as
/// raw envelope bytes, without re-encryption. Slots that are empty in the
/// source are not touched on the destination: data that only exists there
/// stays on disk but is no longer referenced by its registry.
///
/// Returns the copied slot indices in ascending order.
pub fn sync<S: Storage, D: Storage>(
    source: &mut Vault<S>,
    destination: &mut Vault<D>,
    session: &mut Session,
) -> Result<Vec<SlotIndex>> {
    // Full load first: a source we cannot decrypt is never replicated.
    let Snapshot { registry, .. } = source.snapshot(session)?;
    let block = read_block(source.storage_mut())?;

    write_block(destination.storage_mut(), &block)?;
    debug!("replicated metadata block");

    let mut copied = Vec::with_capacity(registry.occupied_count());
    for (index, entry) in registry.occupied() {
        let offset = index.offset()?;
        let mut envelope = vec![0u8; entry.size as usize];
        source.storage_mut().read_at(offset, &mut envelope)?;

        let target = destination.storage_mut();
        target.write_at(offset, &envelope)?;
        target.flush()?;

        debug!(%index, len = envelope.len(), "copied slot");
        copied.push(index);
    }

    info!(slots = copied.len(), "sync finished");
    Ok(copied)
}
