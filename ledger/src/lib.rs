//! Fungible token ledger.
//!
//! The staking registry only ever talks to a ledger through the
//! [`TokenLedger`] trait. [`MemoryLedger`] is the in-process implementation
//! used by the CLI and the tests.

pub mod error;
pub mod ledger;
pub mod memory;

pub use error::LedgerError;
pub use ledger::TokenLedger;
pub use memory::MemoryLedger;
