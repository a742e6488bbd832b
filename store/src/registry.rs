use crate::meta::MetaStore;
use crate::StoreError;
use timelock_types::HolderId;

/// Read side of the persisted staking registry.
///
/// Uses opaque `Vec<u8>` so the store doesn't depend on the `timelock-staking`
/// crate. The registry serializes/deserializes each holder's position
/// sequence itself and writes it through [`WriteBatch`](crate::WriteBatch).
pub trait RegistryStore: MetaStore {
    fn get_positions(&self, holder: &HolderId) -> Result<Option<Vec<u8>>, StoreError>;
    fn iter_positions(&self) -> Result<Vec<(HolderId, Vec<u8>)>, StoreError>;
}
