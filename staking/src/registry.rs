//! The staking registry: holder → ordered positions, plus custody accounting.

use crate::error::StakingError;
use crate::guard::HolderLocks;
use crate::position::{Position, PositionIndex};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use timelock_ledger::TokenLedger;
use timelock_store::{RegistryStore, Snapshot, StoreError, WriteBatch};
use timelock_types::{Clock, Event, EventBus, HolderId, StakingParams, Timestamp, TokenAmount};

/// Meta key holding the custody account id.
const CUSTODY_KEY: &str = "custody";

/// Time-locked staking registry built on a [`TokenLedger`].
///
/// Funds move into custody only through [`open`](Self::open) and out only
/// through [`settle`](Self::settle), so the custody balance always equals the
/// sum of unsettled position amounts.
///
/// Mutating calls are serialized per holder. `settle` commits the `settled`
/// flag before the outbound transfer, and a reentrant call for the same
/// holder is rejected with [`StakingError::Reentrant`]. The positions lock is
/// never held across a ledger call.
pub struct StakingRegistry<L: TokenLedger> {
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    params: StakingParams,
    events: Arc<EventBus>,
    /// Append-only per-holder sequences; entries are only ever flagged settled.
    positions: RwLock<HashMap<HolderId, Vec<Position>>>,
    locks: HolderLocks,
}

impl<L: TokenLedger> StakingRegistry<L> {
    pub fn new(
        ledger: Arc<L>,
        clock: Arc<dyn Clock>,
        params: StakingParams,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            ledger,
            clock,
            params,
            events,
            positions: RwLock::new(HashMap::new()),
            locks: HolderLocks::default(),
        }
    }

    /// The ledger account holding every open position's funds.
    pub fn custody(&self) -> &HolderId {
        &self.params.custody
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<HolderId, Vec<Position>>> {
        self.positions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<HolderId, Vec<Position>>> {
        self.positions.write().unwrap_or_else(|e| e.into_inner())
    }

    // ── Mutations ──────────────────────────────────────────────────────

    /// Lock `amount` of `holder`'s balance for `lock_duration` lock units.
    ///
    /// Returns the new position's index: the length of the holder's
    /// sequence before the append.
    pub fn open(
        &self,
        holder: &HolderId,
        amount: TokenAmount,
        lock_duration: u64,
    ) -> Result<PositionIndex, StakingError> {
        if amount.is_zero() {
            return Err(StakingError::InvalidAmount);
        }
        if *holder == self.params.custody {
            return Err(StakingError::CustodyAccount(holder.clone()));
        }
        let _guard = self.locks.acquire(holder)?;

        self.ledger.transfer(holder, &self.params.custody, amount)?;

        let start_time = self.clock.now();
        let position = Position::new(
            amount,
            lock_duration,
            start_time,
            self.params.lock_secs(lock_duration),
        );
        let end_time = position.end_time;
        let index = {
            let mut positions = self.write();
            let seq = positions.entry(holder.clone()).or_default();
            seq.push(position);
            (seq.len() - 1) as PositionIndex
        };

        tracing::debug!(
            %holder,
            index,
            %amount,
            duration = lock_duration,
            %start_time,
            %end_time,
            "position opened"
        );
        self.events.emit(&Event::PositionOpened {
            holder: holder.clone(),
            amount,
            duration: lock_duration,
            start_time,
        });
        Ok(index)
    }

    /// Release an expired position's funds back to its holder, exactly once.
    pub fn settle(&self, holder: &HolderId, index: PositionIndex) -> Result<(), StakingError> {
        let _guard = self.locks.acquire(holder)?;
        let now = self.clock.now();

        // Checks and effects under the write lock; the lock is released
        // before the ledger is called.
        let amount = {
            let mut positions = self.write();
            let seq = positions
                .get_mut(holder)
                .map(|s| s.as_mut_slice())
                .unwrap_or_default();
            let count = seq.len() as u64;
            let position = seq
                .get_mut(slot(index))
                .ok_or(StakingError::InvalidIndex { index, count })?;
            if position.settled {
                return Err(StakingError::AlreadySettled { index });
            }
            if !position.is_unlocked(now) {
                return Err(StakingError::StillLocked {
                    index,
                    end_time: position.end_time,
                    now,
                });
            }
            position.settled = true;
            position.amount
        };

        if let Err(e) = self.ledger.transfer(&self.params.custody, holder, amount) {
            // Abort: the transfer did not happen, so the flip must not stand.
            self.revert_settle(holder, index);
            tracing::warn!(%holder, index, %amount, "custody transfer failed: {e}");
            return Err(StakingError::Ledger(e));
        }

        tracing::debug!(%holder, index, %amount, %now, "position settled");
        self.events.emit(&Event::PositionSettled {
            holder: holder.clone(),
            amount,
            index,
        });
        Ok(())
    }

    fn revert_settle(&self, holder: &HolderId, index: PositionIndex) {
        let mut positions = self.write();
        if let Some(position) = positions
            .get_mut(holder)
            .and_then(|s| s.get_mut(slot(index)))
        {
            position.settled = false;
        }
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// Snapshot of one position.
    pub fn get(&self, holder: &HolderId, index: PositionIndex) -> Result<Position, StakingError> {
        let positions = self.read();
        let seq = positions.get(holder).map(Vec::as_slice).unwrap_or_default();
        seq.get(slot(index))
            .cloned()
            .ok_or(StakingError::InvalidIndex {
                index,
                count: seq.len() as u64,
            })
    }

    /// Snapshot of a holder's whole sequence, in index order.
    pub fn positions(&self, holder: &HolderId) -> Vec<Position> {
        self.read().get(holder).cloned().unwrap_or_default()
    }

    pub fn position_count(&self, holder: &HolderId) -> u64 {
        self.read().get(holder).map_or(0, |s| s.len() as u64)
    }

    /// Every holder with at least one position, sorted.
    pub fn holders(&self) -> Vec<HolderId> {
        let mut holders: Vec<_> = self.read().keys().cloned().collect();
        holders.sort();
        holders
    }

    /// Sum of the holder's unsettled amounts.
    pub fn locked_balance(&self, holder: &HolderId) -> TokenAmount {
        self.read()
            .get(holder)
            .map_or(TokenAmount::ZERO, |seq| sum_open(seq))
    }

    /// Sum of unsettled amounts across all holders.
    pub fn total_locked(&self) -> TokenAmount {
        self.read()
            .values()
            .fold(TokenAmount::ZERO, |acc, seq| acc.saturating_add(sum_open(seq)))
    }

    /// The custody account's ledger balance.
    pub fn custody_balance(&self) -> TokenAmount {
        self.ledger.balance_of(&self.params.custody)
    }

    /// Whether the position's lock has expired at the current time.
    pub fn is_unlocked(&self, holder: &HolderId, index: PositionIndex) -> Result<bool, StakingError> {
        let position = self.get(holder, index)?;
        Ok(position.is_unlocked(self.clock.now()))
    }

    /// Current time according to the registry's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Check that custody holds exactly the sum of open positions.
    pub fn verify_custody(&self) -> Result<(), StakingError> {
        let locked = self.total_locked();
        let custody = self.custody_balance();
        if locked != custody {
            tracing::warn!(%locked, %custody, "custody accounting mismatch");
            return Err(StakingError::CustodyMismatch { locked, custody });
        }
        Ok(())
    }
}

/// Slice index for a position index; out of range when it doesn't fit `usize`.
fn slot(index: PositionIndex) -> usize {
    usize::try_from(index).unwrap_or(usize::MAX)
}

fn sum_open(seq: &[Position]) -> TokenAmount {
    seq.iter()
        .filter(|p| p.is_open())
        .fold(TokenAmount::ZERO, |acc, p| acc.saturating_add(p.amount))
}

/// Stages the custody id and every holder's sequence.
impl<L: TokenLedger> Snapshot for StakingRegistry<L> {
    fn stage(&self, batch: &mut dyn WriteBatch) -> Result<(), StoreError> {
        batch.put_meta(CUSTODY_KEY, self.params.custody.as_str().as_bytes())?;

        let positions = self.read().clone();
        for (holder, seq) in &positions {
            let bytes =
                bincode::serialize(seq).map_err(|e| StoreError::Serialization(e.to_string()))?;
            batch.put_positions(holder, &bytes)?;
        }
        tracing::debug!(holders = positions.len(), "staking registry staged");
        Ok(())
    }
}

impl<L: TokenLedger> StakingRegistry<L> {
    /// Restore a registry from a store.
    ///
    /// A custody id recorded in the store takes precedence over
    /// `params.custody`, so funds already in custody stay reachable.
    pub fn load_from_store(
        ledger: Arc<L>,
        clock: Arc<dyn Clock>,
        mut params: StakingParams,
        events: Arc<EventBus>,
        store: &dyn RegistryStore,
    ) -> Result<Self, StakingError> {
        if let Some(bytes) = store.get_meta(CUSTODY_KEY)? {
            let raw = String::from_utf8(bytes)
                .map_err(|e| StoreError::Corruption(format!("custody id is not UTF-8: {e}")))?;
            let stored = HolderId::parse(raw)
                .map_err(|e| StoreError::Corruption(format!("custody id: {e}")))?;
            if stored != params.custody {
                tracing::warn!(
                    configured = %params.custody,
                    stored = %stored,
                    "using custody account recorded in the store"
                );
                params.custody = stored;
            }
        }

        let mut positions = HashMap::new();
        for (holder, bytes) in store.iter_positions()? {
            let seq: Vec<Position> = bincode::deserialize(&bytes)
                .map_err(|e| StoreError::Serialization(format!("positions of {holder}: {e}")))?;
            if let Some(bad) = seq.iter().position(|p| !p.is_well_formed()) {
                return Err(StoreError::Corruption(format!(
                    "malformed position {bad} for holder {holder}"
                ))
                .into());
            }
            positions.insert(holder, seq);
        }
        tracing::info!(holders = positions.len(), "staking registry loaded");

        Ok(Self {
            ledger,
            clock,
            params,
            events,
            positions: RwLock::new(positions),
            locks: HolderLocks::default(),
        })
    }
}
