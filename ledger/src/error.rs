use thiserror::Error;
use timelock_types::TokenAmount;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance {
        needed: TokenAmount,
        available: TokenAmount,
    },

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("arithmetic overflow in ledger balance")]
    Overflow,

    #[error("storage error: {0}")]
    Storage(#[from] timelock_store::StoreError),
}
