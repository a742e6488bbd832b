//! Write batching: every write of one save goes into a single LMDB write
//! transaction, so a save lands entirely or not at all.
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use heed::RwTxn;

use timelock_store::{BatchStore, StoreError, WriteBatch};
use timelock_types::{HolderId, TokenAmount};

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

/// A write batch over one LMDB write transaction.
pub struct LmdbWriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl<'a> LmdbWriteBatch<'a> {
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env.write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env })
    }
}

impl WriteBatch for LmdbWriteBatch<'_> {
    fn put_meta(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.env
            .meta_db
            .put(&mut self.txn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn clear_balances(&mut self) -> Result<(), StoreError> {
        self.env
            .balances_db
            .clear(&mut self.txn)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_balance(&mut self, holder: &HolderId, amount: TokenAmount) -> Result<(), StoreError> {
        self.env
            .balances_db
            .put(
                &mut self.txn,
                holder.as_str().as_bytes(),
                &amount.raw().to_le_bytes(),
            )
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_positions(&mut self, holder: &HolderId, positions: &[u8]) -> Result<(), StoreError> {
        self.env
            .positions_db
            .put(&mut self.txn, holder.as_str().as_bytes(), positions)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let LmdbWriteBatch { txn, .. } = *self;
        txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl BatchStore for LmdbEnvironment {
    fn write_batch(&self) -> Result<Box<dyn WriteBatch + '_>, StoreError> {
        Ok(Box::new(LmdbWriteBatch::new(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timelock_store::{LedgerStore, MetaStore, RegistryStore};

    fn holder(name: &str) -> HolderId {
        HolderId::parse(format!("tlk_{name}")).unwrap()
    }

    #[test]
    fn committed_batch_is_visible_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open_default(dir.path()).unwrap();
            let mut batch = env.write_batch().unwrap();
            batch.put_balance(&holder("a"), TokenAmount::new(5)).unwrap();
            batch.put_positions(&holder("a"), &[1, 2]).unwrap();
            batch.put_meta("custody", b"tlk_vault").unwrap();
            batch.commit().unwrap();
        }
        let env = LmdbEnvironment::open_default(dir.path()).unwrap();
        assert_eq!(
            env.get_balance(&holder("a")).unwrap(),
            Some(TokenAmount::new(5))
        );
        assert_eq!(env.get_positions(&holder("a")).unwrap(), Some(vec![1, 2]));
        assert_eq!(env.get_meta("custody").unwrap(), Some(b"tlk_vault".to_vec()));
    }

    #[test]
    fn dropped_batch_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open_default(dir.path()).unwrap();
        {
            let mut batch = env.write_batch().unwrap();
            batch.put_balance(&holder("a"), TokenAmount::new(5)).unwrap();
            batch.put_positions(&holder("a"), &[1]).unwrap();
        }
        assert_eq!(env.get_balance(&holder("a")).unwrap(), None);
        assert_eq!(env.get_positions(&holder("a")).unwrap(), None);
    }

    #[test]
    fn clear_balances_only_touches_balances() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open_default(dir.path()).unwrap();
        let mut batch = env.write_batch().unwrap();
        batch.put_balance(&holder("a"), TokenAmount::new(1)).unwrap();
        batch.put_positions(&holder("a"), &[3]).unwrap();
        batch.commit().unwrap();

        let mut batch = env.write_batch().unwrap();
        batch.clear_balances().unwrap();
        batch.put_balance(&holder("b"), TokenAmount::new(2)).unwrap();
        batch.commit().unwrap();

        assert_eq!(
            env.iter_balances().unwrap(),
            vec![(holder("b"), TokenAmount::new(2))]
        );
        assert_eq!(env.get_positions(&holder("a")).unwrap(), Some(vec![3]));
    }
}
