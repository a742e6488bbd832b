//! Nullable store — thread-safe in-memory storage for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use timelock_store::{BatchStore, LedgerStore, MetaStore, RegistryStore, StoreError, WriteBatch};
use timelock_types::{HolderId, TokenAmount};

/// An in-memory ledger + registry + meta store for testing.
///
/// Batches buffer their writes and apply them under the store's locks on
/// commit. [`fail_position_writes`](NullStore::fail_position_writes) makes
/// staging a position write fail, to simulate a save dying part-way.
pub struct NullStore {
    meta: Mutex<HashMap<String, Vec<u8>>>,
    balances: Mutex<BTreeMap<HolderId, TokenAmount>>,
    positions: Mutex<BTreeMap<HolderId, Vec<u8>>>,
    fail_positions: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            meta: Mutex::new(HashMap::new()),
            balances: Mutex::new(BTreeMap::new()),
            positions: Mutex::new(BTreeMap::new()),
            fail_positions: AtomicBool::new(false),
        }
    }

    /// While set, `put_positions` on a batch returns a backend error.
    pub fn fail_position_writes(&self, fail: bool) {
        self.fail_positions.store(fail, Ordering::SeqCst);
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

enum Staged {
    Meta(String, Vec<u8>),
    ClearBalances,
    Balance(HolderId, TokenAmount),
    Positions(HolderId, Vec<u8>),
}

struct NullBatch<'a> {
    store: &'a NullStore,
    staged: Vec<Staged>,
}

impl WriteBatch for NullBatch<'_> {
    fn put_meta(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.staged
            .push(Staged::Meta(key.to_string(), value.to_vec()));
        Ok(())
    }

    fn clear_balances(&mut self) -> Result<(), StoreError> {
        self.staged.push(Staged::ClearBalances);
        Ok(())
    }

    fn put_balance(&mut self, holder: &HolderId, amount: TokenAmount) -> Result<(), StoreError> {
        self.staged.push(Staged::Balance(holder.clone(), amount));
        Ok(())
    }

    fn put_positions(&mut self, holder: &HolderId, positions: &[u8]) -> Result<(), StoreError> {
        if self.store.fail_positions.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!(
                "write of positions for {holder} failed"
            )));
        }
        self.staged
            .push(Staged::Positions(holder.clone(), positions.to_vec()));
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let NullBatch { store, staged } = *self;
        let mut meta = store.meta.lock().unwrap();
        let mut balances = store.balances.lock().unwrap();
        let mut positions = store.positions.lock().unwrap();
        for op in staged {
            match op {
                Staged::Meta(key, value) => {
                    meta.insert(key, value);
                }
                Staged::ClearBalances => balances.clear(),
                Staged::Balance(holder, amount) => {
                    balances.insert(holder, amount);
                }
                Staged::Positions(holder, bytes) => {
                    positions.insert(holder, bytes);
                }
            }
        }
        Ok(())
    }
}

impl BatchStore for NullStore {
    fn write_batch(&self) -> Result<Box<dyn WriteBatch + '_>, StoreError> {
        Ok(Box::new(NullBatch {
            store: self,
            staged: Vec::new(),
        }))
    }
}

impl MetaStore for NullStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.meta
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().unwrap().get(key).cloned())
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        self.meta.lock().unwrap().remove(key);
        Ok(())
    }
}

impl LedgerStore for NullStore {
    fn get_balance(&self, holder: &HolderId) -> Result<Option<TokenAmount>, StoreError> {
        Ok(self.balances.lock().unwrap().get(holder).copied())
    }

    fn iter_balances(&self) -> Result<Vec<(HolderId, TokenAmount)>, StoreError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .iter()
            .map(|(h, a)| (h.clone(), *a))
            .collect())
    }
}

impl RegistryStore for NullStore {
    fn get_positions(&self, holder: &HolderId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.positions.lock().unwrap().get(holder).cloned())
    }

    fn iter_positions(&self) -> Result<Vec<(HolderId, Vec<u8>)>, StoreError> {
        Ok(self
            .positions
            .lock()
            .unwrap()
            .iter()
            .map(|(h, p)| (h.clone(), p.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holder(name: &str) -> HolderId {
        HolderId::parse(format!("tlk_{name}")).unwrap()
    }

    #[test]
    fn schema_version_defaults_to_zero() {
        let store = NullStore::new();
        assert_eq!(store.get_schema_version().unwrap(), 0);
        store.set_schema_version(3).unwrap();
        assert_eq!(store.get_schema_version().unwrap(), 3);
    }

    #[test]
    fn corrupt_schema_version_is_reported() {
        let store = NullStore::new();
        store.put_meta("schema_version", &[1, 2]).unwrap();
        assert!(matches!(
            store.get_schema_version(),
            Err(StoreError::Corruption(_))
        ));
    }

    #[test]
    fn committed_batch_is_visible_in_holder_order() {
        let store = NullStore::new();
        let mut batch = store.write_batch().unwrap();
        batch.put_balance(&holder("b"), TokenAmount::new(2)).unwrap();
        batch.put_balance(&holder("a"), TokenAmount::new(1)).unwrap();
        batch.put_positions(&holder("a"), &[7]).unwrap();
        assert!(store.iter_balances().unwrap().is_empty());
        batch.commit().unwrap();

        assert_eq!(
            store.iter_balances().unwrap(),
            vec![
                (holder("a"), TokenAmount::new(1)),
                (holder("b"), TokenAmount::new(2)),
            ]
        );
        assert_eq!(store.get_positions(&holder("a")).unwrap(), Some(vec![7]));
    }

    #[test]
    fn clear_balances_drops_stale_entries() {
        let store = NullStore::new();
        let mut batch = store.write_batch().unwrap();
        batch.put_balance(&holder("a"), TokenAmount::new(1)).unwrap();
        batch.commit().unwrap();

        let mut batch = store.write_batch().unwrap();
        batch.clear_balances().unwrap();
        batch.put_balance(&holder("b"), TokenAmount::new(3)).unwrap();
        batch.commit().unwrap();

        assert_eq!(store.get_balance(&holder("a")).unwrap(), None);
        assert_eq!(
            store.get_balance(&holder("b")).unwrap(),
            Some(TokenAmount::new(3))
        );
    }

    #[test]
    fn dropped_batch_writes_nothing() {
        let store = NullStore::new();
        {
            let mut batch = store.write_batch().unwrap();
            batch.put_meta("k", b"v").unwrap();
            batch.put_balance(&holder("a"), TokenAmount::new(1)).unwrap();
        }
        assert_eq!(store.get_meta("k").unwrap(), None);
        assert!(store.iter_balances().unwrap().is_empty());
    }

    #[test]
    fn injected_position_failure() {
        let store = NullStore::new();
        store.fail_position_writes(true);
        let mut batch = store.write_batch().unwrap();
        assert!(matches!(
            batch.put_positions(&holder("a"), &[1]),
            Err(StoreError::Backend(_))
        ));
        store.fail_position_writes(false);
        batch.put_positions(&holder("a"), &[1]).unwrap();
    }
}
