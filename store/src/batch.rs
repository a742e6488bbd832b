//! Atomic multi-record writes.
//!
//! Everything a save touches (balances, supply, positions, custody id) is
//! staged into one [`WriteBatch`] and applied by a single commit, so a
//! failure part-way through leaves the previously committed state intact.

use crate::StoreError;
use timelock_types::{HolderId, TokenAmount};

/// Writes staged against a store. Dropping a batch without calling
/// [`commit`](WriteBatch::commit) discards every staged write.
pub trait WriteBatch {
    fn put_meta(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Remove every stored balance. A ledger snapshot clears first and then
    /// re-adds its non-zero balances.
    fn clear_balances(&mut self) -> Result<(), StoreError>;

    fn put_balance(&mut self, holder: &HolderId, amount: TokenAmount) -> Result<(), StoreError>;

    fn put_positions(&mut self, holder: &HolderId, positions: &[u8]) -> Result<(), StoreError>;

    /// Apply all staged writes at once.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// A store that can open write batches.
pub trait BatchStore {
    fn write_batch(&self) -> Result<Box<dyn WriteBatch + '_>, StoreError>;
}

/// In-memory state that can write a full copy of itself into a batch.
pub trait Snapshot {
    fn stage(&self, batch: &mut dyn WriteBatch) -> Result<(), StoreError>;
}

/// Stage every part into one batch and commit it.
///
/// Either all parts are stored or none are.
pub fn commit_snapshots(store: &dyn BatchStore, parts: &[&dyn Snapshot]) -> Result<(), StoreError> {
    let mut batch = store.write_batch()?;
    for part in parts {
        part.stage(&mut *batch)?;
    }
    batch.commit()
}
