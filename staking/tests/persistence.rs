//! Saving the ledger and the registry together, and recovering from a save
//! that fails part-way.

use std::sync::Arc;

use timelock_ledger::{MemoryLedger, TokenLedger};
use timelock_nullables::{NullClock, NullStore};
use timelock_staking::{StakingError, StakingRegistry};
use timelock_store::{commit_snapshots, StoreError};
use timelock_types::{EventBus, HolderId, StakingParams, TokenAmount};

fn holder(name: &str) -> HolderId {
    HolderId::parse(format!("tlk_{name}")).unwrap()
}

fn amt(n: u128) -> TokenAmount {
    TokenAmount::new(n)
}

struct Node {
    ledger: Arc<MemoryLedger>,
    registry: StakingRegistry<MemoryLedger>,
}

impl Node {
    fn fresh() -> Self {
        let bus = Arc::new(EventBus::new());
        let ledger = Arc::new(MemoryLedger::new(Arc::clone(&bus)));
        let registry = StakingRegistry::new(
            Arc::clone(&ledger),
            Arc::new(NullClock::new(0)),
            StakingParams::default(),
            bus,
        );
        Self { ledger, registry }
    }

    fn load(store: &NullStore) -> Self {
        let bus = Arc::new(EventBus::new());
        let ledger = Arc::new(MemoryLedger::load_from_store(store, Arc::clone(&bus)).unwrap());
        let registry = StakingRegistry::load_from_store(
            Arc::clone(&ledger),
            Arc::new(NullClock::new(0)),
            StakingParams::default(),
            bus,
            store,
        )
        .unwrap();
        Self { ledger, registry }
    }

    fn save(&self, store: &NullStore) -> Result<(), StoreError> {
        commit_snapshots(store, &[&*self.ledger, &self.registry])
    }
}

/// Two holders with one expired 50-token position each, saved.
fn two_open_positions(store: &NullStore) -> Node {
    let node = Node::fresh();
    for name in ["a", "b"] {
        node.ledger.mint(&holder(name), amt(50)).unwrap();
        node.registry.open(&holder(name), amt(50), 0).unwrap();
    }
    node.save(store).unwrap();
    node
}

#[test]
fn failed_save_after_settle_leaves_previous_state() {
    let store = NullStore::new();
    let node = two_open_positions(&store);
    let (a, b) = (holder("a"), holder("b"));

    node.registry.settle(&a, 0).unwrap();
    assert_eq!(node.ledger.balance_of(&a), amt(50));
    store.fail_position_writes(true);
    assert!(matches!(node.save(&store), Err(StoreError::Backend(_))));
    store.fail_position_writes(false);
    drop(node);

    // Nothing from the failed save landed: the settle is simply lost.
    let reloaded = Node::load(&store);
    reloaded.registry.verify_custody().unwrap();
    assert_eq!(reloaded.ledger.balance_of(&a), TokenAmount::ZERO);
    assert!(!reloaded.registry.get(&a, 0).unwrap().settled);

    reloaded.registry.settle(&a, 0).unwrap();
    assert!(matches!(
        reloaded.registry.settle(&a, 0),
        Err(StakingError::AlreadySettled { index: 0 })
    ));
    reloaded.registry.settle(&b, 0).unwrap();

    assert_eq!(reloaded.ledger.balance_of(&a), amt(50));
    assert_eq!(reloaded.ledger.balance_of(&b), amt(50));
    assert_eq!(reloaded.registry.custody_balance(), TokenAmount::ZERO);
    assert_eq!(reloaded.ledger.total_supply(), amt(100));
}

#[test]
fn settle_survives_a_successful_save() {
    let store = NullStore::new();
    let node = two_open_positions(&store);
    let a = holder("a");

    node.registry.settle(&a, 0).unwrap();
    node.save(&store).unwrap();
    drop(node);

    let reloaded = Node::load(&store);
    reloaded.registry.verify_custody().unwrap();
    assert_eq!(reloaded.ledger.balance_of(&a), amt(50));
    assert!(matches!(
        reloaded.registry.settle(&a, 0),
        Err(StakingError::AlreadySettled { index: 0 })
    ));
    reloaded.registry.settle(&holder("b"), 0).unwrap();
    assert_eq!(reloaded.ledger.balance_of(&holder("b")), amt(50));
}

#[test]
fn ledger_only_save_is_detected_on_reload() {
    let store = NullStore::new();
    let node = two_open_positions(&store);

    node.registry.settle(&holder("a"), 0).unwrap();
    commit_snapshots(&store, &[&*node.ledger]).unwrap();
    drop(node);

    let reloaded = Node::load(&store);
    assert!(matches!(
        reloaded.registry.verify_custody(),
        Err(StakingError::CustodyMismatch { .. })
    ));
}
