//! A single time-locked position.

use serde::{Deserialize, Serialize};
use timelock_types::{Timestamp, TokenAmount};

/// Index of a position within its holder's sequence. Assigned in creation
/// order starting at 0 and never reused.
pub type PositionIndex = u64;

/// One locked commitment of custody-held tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Locked quantity; always non-zero.
    pub amount: TokenAmount,
    /// Lock length as requested, in lock units.
    pub duration: u64,
    pub start_time: Timestamp,
    /// `start_time` plus the lock length; `Timestamp::MAX` if that overflows.
    pub end_time: Timestamp,
    /// Whether the funds have been released back to the holder.
    pub settled: bool,
}

impl Position {
    pub(crate) fn new(
        amount: TokenAmount,
        duration: u64,
        start_time: Timestamp,
        lock_secs: u64,
    ) -> Self {
        Self {
            amount,
            duration,
            start_time,
            end_time: start_time.saturating_add_secs(lock_secs),
            settled: false,
        }
    }

    /// Whether the lock has expired at `now`.
    pub fn is_unlocked(&self, now: Timestamp) -> bool {
        now >= self.end_time
    }

    /// Whether the position still holds funds in custody.
    pub fn is_open(&self) -> bool {
        !self.settled
    }

    /// Structural invariants a stored position must satisfy.
    pub(crate) fn is_well_formed(&self) -> bool {
        !self.amount.is_zero() && self.end_time >= self.start_time
    }
}
