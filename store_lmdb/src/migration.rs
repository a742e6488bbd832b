//! Database schema migration engine.
//!
//! Tracks a monotonically increasing schema version in the meta store and
//! runs sequential migration steps to bring an older database up to date.

use timelock_store::MetaStore;

use crate::LmdbError;

/// The schema version that the current code expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Runs database migrations to bring the schema up to date.
pub struct Migrator;

impl Migrator {
    /// Check the stored schema version and run any needed migrations.
    ///
    /// - Version 0 means a fresh database (no version stored yet).
    /// - If the stored version matches `CURRENT_SCHEMA_VERSION`, this is a no-op.
    /// - A stored version *higher* than this code supports was written by a
    ///   newer build and is refused.
    pub fn run(meta_store: &impl MetaStore) -> Result<(), LmdbError> {
        Self::run_to(meta_store, CURRENT_SCHEMA_VERSION)
    }

    fn run_to(meta_store: &impl MetaStore, target: u32) -> Result<(), LmdbError> {
        let current = meta_store.get_schema_version()?;

        if current == target {
            tracing::debug!(version = current, "database schema is up to date");
            return Ok(());
        }

        if current > target {
            return Err(LmdbError::SchemaTooNew {
                found: current,
                supported: target,
            });
        }

        for version in current..target {
            tracing::info!(from = version, to = version + 1, "running migration");
            run_migration(version, version + 1)?;
        }

        meta_store.set_schema_version(target)?;
        tracing::info!(version = target, "migration complete");
        Ok(())
    }
}

fn run_migration(from: u32, to: u32) -> Result<(), LmdbError> {
    match (from, to) {
        // v1: balances, positions and meta databases; nothing to move.
        (0, 1) => Ok(()),
        _ => Err(LmdbError::UnknownMigration { from, to }),
    }
}
