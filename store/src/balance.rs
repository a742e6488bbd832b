//! Token balance storage trait.

use crate::meta::MetaStore;
use crate::StoreError;
use timelock_types::{HolderId, TokenAmount};

/// Read side of the persisted fungible ledger: one balance per holder plus
/// the total supply in meta. Written through [`WriteBatch`](crate::WriteBatch).
pub trait LedgerStore: MetaStore {
    fn get_balance(&self, holder: &HolderId) -> Result<Option<TokenAmount>, StoreError>;
    fn iter_balances(&self) -> Result<Vec<(HolderId, TokenAmount)>, StoreError>;
}
