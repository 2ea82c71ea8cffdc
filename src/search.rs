//! Name and content search built on `load` and `get`.

use crate::error::Result;
use crate::storage::Storage;
use crate::vault::{Registry, Session, SlotEntry, SlotIndex, Vault};
use zeroize::Zeroizing;

/// Entries whose name contains `pattern`, ignoring case. No slot is read.
pub fn find_by_name<'a>(registry: &'a Registry, pattern: &str) -> Vec<(SlotIndex, &'a SlotEntry)> {
    let pattern = pattern.to_lowercase();
    registry
        .occupied()
        .filter(|(_, entry)| entry.name.to_lowercase().contains(&pattern))
        .collect()
}

/// Slots whose decrypted content contains `needle`.
///
/// Every occupied slot is decrypted in turn; the first slot that fails to
/// decrypt aborts the search with its error.
pub fn search_content<S: Storage>(
    vault: &mut Vault<S>,
    session: &mut Session,
    needle: &[u8],
) -> Result<Vec<SlotIndex>> {
    let registry = vault.load(session)?;
    let mut matches = Vec::new();

    for (index, _) in registry.occupied() {
        let mut plaintext = Zeroizing::new(Vec::new());
        vault.get(session, index.get() as i64, &mut *plaintext)?;
        if contains(&plaintext, needle) {
            matches.push(index);
        }
    }

    Ok(matches)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
