//! Per-holder mutual exclusion for mutating registry calls.
//!
//! A holder is "busy" while one of its `open`/`settle` calls is in flight.
//! Another thread asking for the same holder waits; the same thread asking
//! again (reentrancy through a ledger callback) is refused, since waiting
//! would deadlock.

use crate::error::StakingError;
use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};
use timelock_types::HolderId;

#[derive(Default)]
pub(crate) struct HolderLocks {
    busy: Mutex<HashMap<HolderId, ThreadId>>,
    released: Condvar,
}

impl HolderLocks {
    pub(crate) fn acquire(&self, holder: &HolderId) -> Result<HolderGuard<'_>, StakingError> {
        let me = thread::current().id();
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            match busy.get(holder) {
                None => {
                    busy.insert(holder.clone(), me);
                    return Ok(HolderGuard {
                        locks: self,
                        holder: holder.clone(),
                    });
                }
                Some(owner) if *owner == me => {
                    return Err(StakingError::Reentrant(holder.clone()));
                }
                Some(_) => {
                    busy = self
                        .released
                        .wait(busy)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }

    #[cfg(test)]
    fn is_busy(&self, holder: &HolderId) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(holder)
    }
}

/// Marks a holder busy until dropped.
pub(crate) struct HolderGuard<'a> {
    locks: &'a HolderLocks,
    holder: HolderId,
}

impl Drop for HolderGuard<'_> {
    fn drop(&mut self) {
        self.locks
            .busy
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.holder);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn holder(name: &str) -> HolderId {
        HolderId::parse(format!("tlk_{name}")).unwrap()
    }

    #[test]
    fn same_thread_reentry_is_rejected() {
        let locks = HolderLocks::default();
        let _outer = locks.acquire(&holder("a")).unwrap();
        match locks.acquire(&holder("a")) {
            Err(StakingError::Reentrant(h)) => assert_eq!(h, holder("a")),
            Err(other) => panic!("expected Reentrant, got {other:?}"),
            Ok(_) => panic!("expected Reentrant, got a guard"),
        };
    }

    #[test]
    fn different_holders_do_not_contend() {
        let locks = HolderLocks::default();
        let _a = locks.acquire(&holder("a")).unwrap();
        let _b = locks.acquire(&holder("b")).unwrap();
        assert!(locks.is_busy(&holder("a")));
        assert!(locks.is_busy(&holder("b")));
    }

    #[test]
    fn drop_releases_holder() {
        let locks = HolderLocks::default();
        {
            let _g = locks.acquire(&holder("a")).unwrap();
            assert!(locks.is_busy(&holder("a")));
        }
        assert!(!locks.is_busy(&holder("a")));
        assert!(locks.acquire(&holder("a")).is_ok());
    }

    #[test]
    fn other_thread_waits_for_release() {
        let locks = HolderLocks::default();
        let released = AtomicBool::new(false);
        let guard = locks.acquire(&holder("a")).unwrap();

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                let _g = locks.acquire(&holder("a")).unwrap();
                released.load(Ordering::SeqCst)
            });
            thread::sleep(Duration::from_millis(50));
            released.store(true, Ordering::SeqCst);
            drop(guard);
            assert!(waiter.join().unwrap(), "waiter ran before the guard was released");
        });
    }
}
