//! Staking-specific errors.

use thiserror::Error;
use timelock_ledger::LedgerError;
use timelock_types::{HolderId, Timestamp, TokenAmount};

/// Every variant is a rejection: the failed operation changed nothing.
#[derive(Debug, Error)]
pub enum StakingError {
    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("insufficient balance: need {needed}, available {available}")]
    InsufficientBalance {
        needed: TokenAmount,
        available: TokenAmount,
    },

    #[error("position {index} does not exist (holder has {count})")]
    InvalidIndex { index: u64, count: u64 },

    #[error("position {index} has already been settled")]
    AlreadySettled { index: u64 },

    #[error("position {index} is locked until {end_time} (now {now})")]
    StillLocked {
        index: u64,
        end_time: Timestamp,
        now: Timestamp,
    },

    #[error("reentrant call for holder {0}")]
    Reentrant(HolderId),

    #[error("custody account {0} cannot hold positions")]
    CustodyAccount(HolderId),

    #[error("custody holds {custody} but open positions total {locked}")]
    CustodyMismatch {
        locked: TokenAmount,
        custody: TokenAmount,
    },

    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    #[error("storage error: {0}")]
    Store(#[from] timelock_store::StoreError),
}

impl From<LedgerError> for StakingError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientBalance { needed, available } => {
                Self::InsufficientBalance { needed, available }
            }
            LedgerError::ZeroAmount => Self::InvalidAmount,
            other => Self::Ledger(other),
        }
    }
}
