//! Command handlers over an LMDB-backed ledger and staking registry.
//!
//! An [`App`] loads the whole state from the data directory on open; every
//! mutating handler is followed by [`App::save`] in `main`. Mutating handlers
//! refuse to run while custody does not match the open positions.

use anyhow::{bail, Context};
use serde::Serialize;
use std::sync::Arc;

use timelock_ledger::{MemoryLedger, TokenLedger};
use timelock_staking::{Position, PositionIndex, StakingRegistry};
use timelock_store::{commit_snapshots, MetaStore};
use timelock_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment};
use timelock_types::{Clock, EventBus, HolderId, Timestamp, TokenAmount};
use timelock_utils::format_duration;

use crate::CliConfig;

/// JSON snapshot of one position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PositionView {
    pub holder: HolderId,
    pub index: PositionIndex,
    pub amount: TokenAmount,
    pub duration: u64,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub settled: bool,
    pub unlocked: bool,
    /// Human-readable time left until unlock, "0s" once unlocked.
    pub remaining: String,
}

impl PositionView {
    fn new(holder: &HolderId, index: PositionIndex, position: Position, now: Timestamp) -> Self {
        Self {
            holder: holder.clone(),
            index,
            unlocked: position.is_unlocked(now),
            remaining: format_duration(position.end_time.remaining_from(now)),
            amount: position.amount,
            duration: position.duration,
            start_time: position.start_time,
            end_time: position.end_time,
            settled: position.settled,
        }
    }
}

/// Output of `timelock status`.
#[derive(Clone, Debug, Serialize)]
pub struct StatusReport {
    pub schema_version: u32,
    pub custody: HolderId,
    pub total_supply: TokenAmount,
    pub custody_balance: TokenAmount,
    pub total_locked: TokenAmount,
    pub holders: usize,
    pub positions: u64,
    pub open_positions: u64,
    pub custody_consistent: bool,
    pub integrity_errors: Vec<String>,
}

pub struct App {
    store: LmdbEnvironment,
    ledger: Arc<MemoryLedger>,
    registry: StakingRegistry<MemoryLedger>,
}

impl App {
    /// Open the data directory and load the ledger and registry from it.
    pub fn open(config: &CliConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        check_data_dir(&config.data_dir).map_err(anyhow::Error::msg)?;
        let store = LmdbEnvironment::open(&config.data_dir, config.map_size).with_context(|| {
            format!("failed to open data directory {}", config.data_dir.display())
        })?;

        let events = Arc::new(EventBus::new());
        events.subscribe(|event| tracing::info!(?event, "event"));

        let ledger = Arc::new(
            MemoryLedger::load_from_store(&store, Arc::clone(&events))
                .context("failed to load ledger")?,
        );
        let registry = StakingRegistry::load_from_store(
            Arc::clone(&ledger),
            clock,
            config.staking.clone(),
            events,
            &store,
        )
        .context("failed to load staking registry")?;

        if let Err(e) = registry.verify_custody() {
            tracing::warn!(error = %e, "custody check failed after load");
        }

        Ok(Self {
            store,
            ledger,
            registry,
        })
    }

    /// Persist the ledger and the registry in one write transaction.
    pub fn save(&self) -> anyhow::Result<()> {
        commit_snapshots(&self.store, &[&*self.ledger, &self.registry])
            .context("failed to save ledger and staking registry")?;
        Ok(())
    }

    pub fn registry(&self) -> &StakingRegistry<MemoryLedger> {
        &self.registry
    }

    fn ensure_consistent(&self) -> anyhow::Result<()> {
        self.registry.verify_custody().with_context(|| {
            format!(
                "refusing to modify {}: run `timelock status` for details",
                self.store.path().display()
            )
        })
    }

    /// The custody balance only moves through the registry.
    fn reject_custody(&self, holder: &HolderId) -> anyhow::Result<()> {
        if holder == self.registry.custody() {
            bail!("{holder} is the staking custody account and cannot be used directly");
        }
        Ok(())
    }

    /// Credit new supply; returns the holder's new balance.
    pub fn mint(&self, to: &HolderId, amount: u128) -> anyhow::Result<TokenAmount> {
        self.ensure_consistent()?;
        self.reject_custody(to)?;
        self.ledger.mint(to, TokenAmount::new(amount))?;
        Ok(self.ledger.balance_of(to))
    }

    /// Destroy supply; returns the holder's new balance.
    pub fn burn(&self, from: &HolderId, amount: u128) -> anyhow::Result<TokenAmount> {
        self.ensure_consistent()?;
        self.reject_custody(from)?;
        self.ledger.burn(from, TokenAmount::new(amount))?;
        Ok(self.ledger.balance_of(from))
    }

    pub fn transfer(&self, from: &HolderId, to: &HolderId, amount: u128) -> anyhow::Result<()> {
        self.ensure_consistent()?;
        self.reject_custody(from)?;
        self.reject_custody(to)?;
        self.ledger.transfer(from, to, TokenAmount::new(amount))?;
        Ok(())
    }

    pub fn balance(&self, holder: &HolderId) -> TokenAmount {
        self.ledger.balance_of(holder)
    }

    pub fn stake_open(
        &self,
        holder: &HolderId,
        amount: u128,
        duration: u64,
    ) -> anyhow::Result<PositionIndex> {
        self.ensure_consistent()?;
        Ok(self.registry.open(holder, TokenAmount::new(amount), duration)?)
    }

    /// Settle a position; returns the amount paid out.
    pub fn stake_settle(
        &self,
        holder: &HolderId,
        index: PositionIndex,
    ) -> anyhow::Result<TokenAmount> {
        self.ensure_consistent()?;
        let amount = self.registry.get(holder, index)?.amount;
        self.registry.settle(holder, index)?;
        Ok(amount)
    }

    pub fn stake_get(&self, holder: &HolderId, index: PositionIndex) -> anyhow::Result<PositionView> {
        let position = self.registry.get(holder, index)?;
        Ok(PositionView::new(holder, index, position, self.registry.now()))
    }

    pub fn stake_list(&self, holder: &HolderId) -> Vec<PositionView> {
        let now = self.registry.now();
        (0..)
            .zip(self.registry.positions(holder))
            .map(|(index, position)| PositionView::new(holder, index, position, now))
            .collect()
    }

    pub fn status(&self) -> anyhow::Result<StatusReport> {
        let integrity = check_integrity(&self.store)?;
        let (positions, open_positions) =
            self.registry
                .holders()
                .iter()
                .fold((0u64, 0u64), |(all, open), holder| {
                    let seq = self.registry.positions(holder);
                    let open_here = seq.iter().filter(|p| p.is_open()).count() as u64;
                    (all + seq.len() as u64, open + open_here)
                });

        Ok(StatusReport {
            schema_version: self.store.get_schema_version()?,
            custody: self.registry.custody().clone(),
            total_supply: self.ledger.total_supply(),
            custody_balance: self.registry.custody_balance(),
            total_locked: self.registry.total_locked(),
            holders: self.ledger.holders().len(),
            positions,
            open_positions,
            custody_consistent: self.registry.verify_custody().is_ok(),
            integrity_errors: integrity.errors,
        })
    }
}
