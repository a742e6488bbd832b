//! Fundamental types for the timelock ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! holder identities, token amounts, timestamps and clocks, staking parameters,
//! and the observable event stream.

pub mod amount;
pub mod error;
pub mod event;
pub mod holder;
pub mod params;
pub mod time;

pub use amount::TokenAmount;
pub use error::TypeError;
pub use event::{Event, EventBus};
pub use holder::HolderId;
pub use params::StakingParams;
pub use time::{Clock, SystemClock, Timestamp};
