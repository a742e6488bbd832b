//! Notifications emitted by the ledger and the staking registry.

use crate::amount::TokenAmount;
use crate::holder::HolderId;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Observable events. Emitted for external consumers only; nothing inside
/// the workspace reacts to them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// New supply was credited to a holder.
    TokensMinted { to: HolderId, amount: TokenAmount },
    /// Supply was destroyed from a holder's balance.
    TokensBurned { burner: HolderId, amount: TokenAmount },
    /// A holder locked funds into a new position.
    PositionOpened {
        holder: HolderId,
        amount: TokenAmount,
        duration: u64,
        start_time: Timestamp,
    },
    /// A holder reclaimed an expired position.
    PositionSettled {
        holder: HolderId,
        amount: TokenAmount,
        index: u64,
    },
}

type Listener = Box<dyn Fn(&Event) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the emitting thread, after the emitter has
/// released its own locks, so a listener may call back into the emitter.
/// Keep handlers fast.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&Event) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(listener));
    }

    pub fn emit(&self, event: &Event) {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener(event);
        }
    }
}
