//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::migration::Migrator;
use crate::LmdbError;

/// Default memory map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Named databases created in every environment.
pub const DATABASE_NAMES: &[&str] = &["balances", "positions", "meta"];

/// Wraps the LMDB environment and all database handles.
///
/// Reads run in their own LMDB read transaction. Ledger and registry writes
/// go through [`write_batch`](timelock_store::BatchStore::write_batch), one
/// write transaction per save.
pub struct LmdbEnvironment {
    pub(crate) env: Arc<Env>,
    pub(crate) balances_db: Database<Bytes, Bytes>,
    pub(crate) positions_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an environment at `path` and bring its schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process for this path
        // and never memory-mapped elsewhere while it is alive.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(DATABASE_NAMES.len() as u32)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let balances_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("balances"))?;
        let positions_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("positions"))?;
        let meta_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            balances_db,
            positions_db,
            meta_db,
            path: path.to_path_buf(),
        };
        Migrator::run(&environment)?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    /// Open with [`DEFAULT_MAP_SIZE`].
    pub fn open_default(path: &Path) -> Result<Self, LmdbError> {
        Self::open(path, DEFAULT_MAP_SIZE)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
