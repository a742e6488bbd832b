//! Time-locked staking registry.
//!
//! Holders lock part of their ledger balance for a chosen number of lock
//! units and reclaim it, exactly once, after the lock expires.
//!
//! This crate handles:
//! - Opening positions (holder → custody transfer + append)
//! - Settling expired positions (flag flip, then custody → holder transfer)
//! - Read-only snapshots and custody accounting checks
//! - Per-holder serialization and reentrancy rejection
//! - Persisting the holder → positions mapping

mod guard;

pub mod error;
pub mod position;
pub mod registry;

pub use error::StakingError;
pub use position::{Position, PositionIndex};
pub use registry::StakingRegistry;
