//! Reentrancy and cross-thread behaviour of the staking registry.
//!
//! `HookedLedger` runs a one-shot callback from inside `transfer`, after the
//! balances moved, the way a token with receive hooks would.

use std::sync::{Arc, Mutex, Weak};
use std::thread;

use timelock_ledger::{LedgerError, MemoryLedger, TokenLedger};
use timelock_nullables::NullClock;
use timelock_staking::{StakingError, StakingRegistry};
use timelock_types::{EventBus, HolderId, StakingParams, TokenAmount};

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct HookedLedger {
    inner: MemoryLedger,
    on_transfer: Mutex<Option<Hook>>,
}

impl HookedLedger {
    fn arm(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_transfer.lock().unwrap() = Some(Box::new(hook));
    }
}

impl TokenLedger for HookedLedger {
    fn balance_of(&self, holder: &HolderId) -> TokenAmount {
        self.inner.balance_of(holder)
    }

    fn total_supply(&self) -> TokenAmount {
        self.inner.total_supply()
    }

    fn transfer(
        &self,
        from: &HolderId,
        to: &HolderId,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        self.inner.transfer(from, to, amount)?;
        let hook = self.on_transfer.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        Ok(())
    }

    fn mint(&self, to: &HolderId, amount: TokenAmount) -> Result<(), LedgerError> {
        self.inner.mint(to, amount)
    }

    fn burn(&self, from: &HolderId, amount: TokenAmount) -> Result<(), LedgerError> {
        self.inner.burn(from, amount)
    }
}

fn holder(name: &str) -> HolderId {
    HolderId::parse(format!("tlk_{name}")).unwrap()
}

fn amt(raw: u128) -> TokenAmount {
    TokenAmount::new(raw)
}

fn hooked_registry() -> (Arc<HookedLedger>, Arc<StakingRegistry<HookedLedger>>) {
    let ledger = Arc::new(HookedLedger::default());
    let registry = Arc::new(StakingRegistry::new(
        Arc::clone(&ledger),
        Arc::new(NullClock::new(1_000)),
        StakingParams::default(),
        Arc::new(EventBus::new()),
    ));
    (ledger, registry)
}

#[derive(Default, Debug)]
struct Observed {
    settled_flag: Option<bool>,
    nested_settle_reentrant: bool,
    nested_open_reentrant: bool,
}

#[test]
fn nested_settle_sees_committed_flag_and_is_rejected() {
    let (ledger, registry) = hooked_registry();
    let a = holder("a");
    ledger.mint(&a, amt(100)).unwrap();
    registry.open(&a, amt(40), 0).unwrap();

    let observed = Arc::new(Mutex::new(Observed::default()));
    {
        let registry: Weak<_> = Arc::downgrade(&registry);
        let observed = Arc::clone(&observed);
        let a = a.clone();
        ledger.arm(move || {
            let registry = registry.upgrade().unwrap();
            let mut seen = observed.lock().unwrap();
            seen.settled_flag = Some(registry.get(&a, 0).unwrap().settled);
            seen.nested_settle_reentrant =
                matches!(registry.settle(&a, 0), Err(StakingError::Reentrant(_)));
            seen.nested_open_reentrant =
                matches!(registry.open(&a, amt(1), 0), Err(StakingError::Reentrant(_)));
        });
    }

    registry.settle(&a, 0).unwrap();

    let seen = observed.lock().unwrap();
    assert_eq!(seen.settled_flag, Some(true), "flag must be committed before payout");
    assert!(seen.nested_settle_reentrant);
    assert!(seen.nested_open_reentrant);
    assert_eq!(ledger.balance_of(&a), amt(100), "paid exactly once");
    assert_eq!(registry.custody_balance(), TokenAmount::ZERO);
    assert_eq!(registry.position_count(&a), 1);
    registry.verify_custody().unwrap();
}

#[test]
fn nested_open_during_open_is_rejected() {
    let (ledger, registry) = hooked_registry();
    let a = holder("a");
    ledger.mint(&a, amt(10)).unwrap();

    let nested = Arc::new(Mutex::new(None));
    {
        let registry = Arc::downgrade(&registry);
        let nested = Arc::clone(&nested);
        let a = a.clone();
        ledger.arm(move || {
            let registry = registry.upgrade().unwrap();
            *nested.lock().unwrap() = Some(registry.open(&a, amt(1), 0));
        });
    }

    assert_eq!(registry.open(&a, amt(5), 3).unwrap(), 0);
    assert!(matches!(
        nested.lock().unwrap().take(),
        Some(Err(StakingError::Reentrant(_)))
    ));
    assert_eq!(registry.position_count(&a), 1);
    assert_eq!(registry.custody_balance(), amt(5));
    registry.verify_custody().unwrap();
}

#[test]
fn nested_call_for_another_holder_is_allowed() {
    let (ledger, registry) = hooked_registry();
    let (a, b) = (holder("a"), holder("b"));
    ledger.mint(&a, amt(10)).unwrap();
    ledger.mint(&b, amt(20)).unwrap();
    registry.open(&a, amt(10), 0).unwrap();
    registry.open(&b, amt(20), 0).unwrap();

    let nested = Arc::new(Mutex::new(None));
    {
        let registry = Arc::downgrade(&registry);
        let nested = Arc::clone(&nested);
        let b = b.clone();
        ledger.arm(move || {
            let registry = registry.upgrade().unwrap();
            *nested.lock().unwrap() = Some(registry.settle(&b, 0));
        });
    }

    registry.settle(&a, 0).unwrap();
    assert!(matches!(nested.lock().unwrap().take(), Some(Ok(()))));
    assert_eq!(ledger.balance_of(&a), amt(10));
    assert_eq!(ledger.balance_of(&b), amt(20));
    assert_eq!(registry.custody_balance(), TokenAmount::ZERO);
}

#[test]
fn concurrent_opens_get_distinct_sequential_indices() {
    let ledger = Arc::new(MemoryLedger::default());
    let registry = StakingRegistry::new(
        Arc::clone(&ledger),
        Arc::new(NullClock::new(0)),
        StakingParams::default(),
        Arc::new(EventBus::new()),
    );
    let a = holder("a");
    ledger.mint(&a, amt(1_000)).unwrap();

    let mut indices: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    (0..10)
                        .map(|_| registry.open(&a, amt(1), 1).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });
    indices.sort_unstable();

    assert_eq!(indices, (0..80).collect::<Vec<u64>>());
    assert_eq!(registry.custody_balance(), amt(80));
    assert_eq!(ledger.balance_of(&a), amt(920));
    registry.verify_custody().unwrap();
}

#[test]
fn concurrent_settles_pay_exactly_once() {
    let ledger = Arc::new(MemoryLedger::default());
    let registry = StakingRegistry::new(
        Arc::clone(&ledger),
        Arc::new(NullClock::new(0)),
        StakingParams::default(),
        Arc::new(EventBus::new()),
    );
    let a = holder("a");
    ledger.mint(&a, amt(50)).unwrap();
    registry.open(&a, amt(50), 0).unwrap();

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|_| s.spawn(|| registry.settle(&a, 0))).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let already = results
        .iter()
        .filter(|r| matches!(r, Err(StakingError::AlreadySettled { index: 0 })))
        .count();
    assert_eq!(ok, 1);
    assert_eq!(already, 7);
    assert_eq!(ledger.balance_of(&a), amt(50));
    assert_eq!(registry.custody_balance(), TokenAmount::ZERO);
}
