//! LMDB implementation of LedgerStore.
//!
//! Keys are the holder id's UTF-8 bytes; values are the raw `u128` balance
//! in little-endian order.

use timelock_store::{LedgerStore, StoreError};
use timelock_types::{HolderId, TokenAmount};

use crate::{LmdbEnvironment, LmdbError};

fn decode_amount(bytes: &[u8]) -> Result<TokenAmount, LmdbError> {
    let arr: [u8; 16] = bytes.try_into().map_err(|_| {
        LmdbError::Corruption(format!("balance has {} bytes, expected 16", bytes.len()))
    })?;
    Ok(TokenAmount::new(u128::from_le_bytes(arr)))
}

pub(crate) fn decode_holder(key: &[u8]) -> Result<HolderId, LmdbError> {
    let raw = std::str::from_utf8(key)
        .map_err(|e| LmdbError::Corruption(format!("holder key is not UTF-8: {e}")))?;
    HolderId::parse(raw).map_err(|e| LmdbError::Corruption(e.to_string()))
}

impl LedgerStore for LmdbEnvironment {
    fn get_balance(&self, holder: &HolderId) -> Result<Option<TokenAmount>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .balances_db
            .get(&rtxn, holder.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode_amount(bytes)?)),
            None => Ok(None),
        }
    }

    fn iter_balances(&self) -> Result<Vec<(HolderId, TokenAmount)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for item in self.balances_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, val) = item.map_err(LmdbError::from)?;
            results.push((decode_holder(key)?, decode_amount(val)?));
        }
        Ok(results)
    }
}
