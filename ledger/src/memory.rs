//! In-memory fungible ledger.

use crate::error::LedgerError;
use crate::ledger::TokenLedger;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use timelock_store::{LedgerStore, Snapshot, StoreError, WriteBatch};
use timelock_types::{Event, EventBus, HolderId, TokenAmount};

/// Meta key for the persisted total supply (16 bytes, little-endian).
const TOTAL_SUPPLY_KEY: &str = "total_supply";

#[derive(Default)]
struct LedgerState {
    /// Holders with a non-zero balance. Zero balances are removed.
    balances: HashMap<HolderId, TokenAmount>,
    supply: TokenAmount,
}

impl LedgerState {
    fn balance(&self, holder: &HolderId) -> TokenAmount {
        self.balances.get(holder).copied().unwrap_or(TokenAmount::ZERO)
    }

    fn set(&mut self, holder: &HolderId, amount: TokenAmount) {
        if amount.is_zero() {
            self.balances.remove(holder);
        } else {
            self.balances.insert(holder.clone(), amount);
        }
    }
}

/// A ledger that keeps every balance in process memory.
///
/// The state mutex is never held while events are emitted, so listeners
/// may read from or write to the ledger.
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
    events: Arc<EventBus>,
}

impl MemoryLedger {
    /// Create an empty ledger emitting into `events`.
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            events,
        }
    }

    /// Snapshot of every holder with a non-zero balance, sorted by id.
    pub fn holders(&self) -> Vec<(HolderId, TokenAmount)> {
        let mut out: Vec<_> = self
            .lock()
            .balances
            .iter()
            .map(|(h, a)| (h.clone(), *a))
            .collect();
        out.sort();
        out
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Restore a ledger from a store, checking that balances add up to the
    /// recorded total supply.
    pub fn load_from_store(
        store: &dyn LedgerStore,
        events: Arc<EventBus>,
    ) -> Result<Self, LedgerError> {
        let supply = match store.get_meta(TOTAL_SUPPLY_KEY)? {
            None => TokenAmount::ZERO,
            Some(bytes) => {
                let arr: [u8; 16] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption(format!(
                        "total supply has {} bytes, expected 16",
                        bytes.len()
                    ))
                })?;
                TokenAmount::new(u128::from_le_bytes(arr))
            }
        };

        let mut state = LedgerState {
            balances: HashMap::new(),
            supply,
        };
        let mut sum = TokenAmount::ZERO;
        for (holder, amount) in store.iter_balances()? {
            sum = sum.checked_add(amount).ok_or(LedgerError::Overflow)?;
            state.set(&holder, amount);
        }
        if sum != supply {
            return Err(StoreError::Corruption(format!(
                "balances sum to {sum} but total supply is {supply}"
            ))
            .into());
        }

        tracing::info!(holders = state.balances.len(), supply = %supply, "ledger loaded");
        Ok(Self {
            state: Mutex::new(state),
            events,
        })
    }
}

/// Stages every non-zero balance and the total supply. Stored balances not
/// in the snapshot are cleared.
impl Snapshot for MemoryLedger {
    fn stage(&self, batch: &mut dyn WriteBatch) -> Result<(), StoreError> {
        let (balances, supply) = {
            let state = self.lock();
            (state.balances.clone(), state.supply)
        };

        batch.clear_balances()?;
        for (holder, amount) in &balances {
            batch.put_balance(holder, *amount)?;
        }
        batch.put_meta(TOTAL_SUPPLY_KEY, &supply.raw().to_le_bytes())?;

        tracing::debug!(holders = balances.len(), supply = %supply, "ledger staged");
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(Arc::new(EventBus::new()))
    }
}

impl TokenLedger for MemoryLedger {
    fn balance_of(&self, holder: &HolderId) -> TokenAmount {
        self.lock().balance(holder)
    }

    fn total_supply(&self) -> TokenAmount {
        self.lock().supply
    }

    fn transfer(
        &self,
        from: &HolderId,
        to: &HolderId,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut state = self.lock();
        let available = state.balance(from);
        let from_after = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            })?;
        if from == to {
            return Ok(());
        }
        let to_after = state
            .balance(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        state.set(from, from_after);
        state.set(to, to_after);
        drop(state);

        tracing::trace!(%from, %to, %amount, "transfer");
        Ok(())
    }

    fn mint(&self, to: &HolderId, amount: TokenAmount) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        let mut state = self.lock();
        let supply = state.supply.checked_add(amount).ok_or(LedgerError::Overflow)?;
        let balance = state.balance(to).checked_add(amount).ok_or(LedgerError::Overflow)?;
        state.supply = supply;
        state.set(to, balance);
        drop(state);

        tracing::debug!(%to, %amount, "minted");
        self.events.emit(&Event::TokensMinted {
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    fn burn(&self, from: &HolderId, amount: TokenAmount) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        let mut state = self.lock();
        let available = state.balance(from);
        let balance = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            })?;
        state.supply = state.supply.saturating_sub(amount);
        state.set(from, balance);
        drop(state);

        tracing::debug!(%from, %amount, "burned");
        self.events.emit(&Event::TokensBurned {
            burner: from.clone(),
            amount,
        });
        Ok(())
    }
}
