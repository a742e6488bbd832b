//! Abstract storage traits for the timelock ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits. Reads go
//! through the per-domain stores; writes go through a [`WriteBatch`].

pub mod balance;
pub mod batch;
pub mod error;
pub mod meta;
pub mod registry;

pub use balance::LedgerStore;
pub use batch::{commit_snapshots, BatchStore, Snapshot, WriteBatch};
pub use error::StoreError;
pub use meta::MetaStore;
pub use registry::RegistryStore;
