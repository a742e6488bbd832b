//! The fungible-ledger interface the staking registry is built on.

use crate::error::LedgerError;
use std::sync::Arc;
use timelock_types::{HolderId, TokenAmount};

/// Authoritative balance-per-holder mapping.
///
/// Every mutating call is atomic: it either applies completely or fails
/// with no balance changed. Total supply only moves through `mint`/`burn`.
///
/// Methods take `&self` so an implementation may be re-entered from inside
/// its own `transfer` (e.g. a hook that calls back into a registry).
pub trait TokenLedger: Send + Sync {
    fn balance_of(&self, holder: &HolderId) -> TokenAmount;

    fn total_supply(&self) -> TokenAmount;

    /// Move `amount` from `from` to `to`.
    fn transfer(&self, from: &HolderId, to: &HolderId, amount: TokenAmount)
        -> Result<(), LedgerError>;

    /// Create `amount` new tokens credited to `to`.
    fn mint(&self, to: &HolderId, amount: TokenAmount) -> Result<(), LedgerError>;

    /// Destroy `amount` tokens from `from`'s balance.
    fn burn(&self, from: &HolderId, amount: TokenAmount) -> Result<(), LedgerError>;
}

impl<L: TokenLedger + ?Sized> TokenLedger for Arc<L> {
    fn balance_of(&self, holder: &HolderId) -> TokenAmount {
        (**self).balance_of(holder)
    }

    fn total_supply(&self) -> TokenAmount {
        (**self).total_supply()
    }

    fn transfer(
        &self,
        from: &HolderId,
        to: &HolderId,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        (**self).transfer(from, to, amount)
    }

    fn mint(&self, to: &HolderId, amount: TokenAmount) -> Result<(), LedgerError> {
        (**self).mint(to, amount)
    }

    fn burn(&self, from: &HolderId, amount: TokenAmount) -> Result<(), LedgerError> {
        (**self).burn(from, amount)
    }
}
