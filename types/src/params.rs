//! Staking parameters shared by the registry and its front ends.

use crate::holder::HolderId;
use serde::{Deserialize, Serialize};

/// Seconds in one day, the default lock unit.
pub const SECS_PER_DAY: u64 = 24 * 3600;

/// Parameters a staking registry is built with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    /// Length in seconds of one unit of `lock_duration`.
    /// Default: one day.
    #[serde(default = "default_lock_unit_secs")]
    pub lock_unit_secs: u64,

    /// Ledger account holding every open position's funds.
    #[serde(default = "HolderId::default_custody")]
    pub custody: HolderId,
}

fn default_lock_unit_secs() -> u64 {
    SECS_PER_DAY
}

impl StakingParams {
    /// Lock length in seconds for `lock_duration` units, saturating at `u64::MAX`.
    pub fn lock_secs(&self, lock_duration: u64) -> u64 {
        lock_duration.saturating_mul(self.lock_unit_secs)
    }
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            lock_unit_secs: default_lock_unit_secs(),
            custody: HolderId::default_custody(),
        }
    }
}
