//! LMDB storage backend for the timelock ledger.
//!
//! Implements the storage traits from `timelock-store` using the `heed` LMDB
//! bindings. Balances, staking positions and metadata each live in their own
//! named database inside a single environment.

pub mod balance;
pub mod environment;
pub mod error;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod registry;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use write_batch::LmdbWriteBatch;
