use timelock_store::{RegistryStore, StoreError};
use timelock_types::HolderId;

use crate::balance::decode_holder;
use crate::{LmdbEnvironment, LmdbError};

impl RegistryStore for LmdbEnvironment {
    fn get_positions(&self, holder: &HolderId) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .positions_db
            .get(&rtxn, holder.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn iter_positions(&self) -> Result<Vec<(HolderId, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for item in self.positions_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, val) = item.map_err(LmdbError::from)?;
            results.push((decode_holder(key)?, val.to_vec()));
        }
        Ok(results)
    }
}
