//! redb-backed sequence store
//!
//! One table maps counter keys to `u32` values. Every `put` is its own
//! committed write transaction, so a value survives a crash as soon as
//! `put` returns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, TableDefinition};
use tracing::{debug, info, instrument};

use crate::SequenceStore;
use crate::error::{StorageError, StorageResult};

// Key: "s_<hex mac>" or "r_<hex mac>", Value: counter
pub const SEQUENCE_COUNTERS: TableDefinition<&str, u32> =
    TableDefinition::new("sequence_counters");

/// Durable sequence store on a redb database file
#[derive(Clone)]
pub struct RedbSequenceStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbSequenceStore {
    /// Open or create the database
    #[instrument(skip_all)]
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(&path).map_err(|e| StorageError::Database(e.to_string()))?;
        info!(path = %path.display(), "Opened sequence database");

        let store = Self {
            db: Arc::new(db),
            path,
        };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        write_txn
            .open_table(SEQUENCE_COUNTERS)
            .map_err(|e| StorageError::Database(e.to_string()))?;
        write_txn
            .commit()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        debug!("Initialized sequence table");
        Ok(())
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SequenceStore for RedbSequenceStore {
    fn get(&self, key: &str) -> StorageResult<u32> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let table = read_txn
            .open_table(SEQUENCE_COUNTERS)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let value = table
            .get(key)
            .map_err(|e| StorageError::Database(e.to_string()))?
            .map(|v| v.value())
            .unwrap_or(0);

        Ok(value)
    }

    fn put(&self, key: &str, value: u32) -> StorageResult<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        {
            let mut table = write_txn
                .open_table(SEQUENCE_COUNTERS)
                .map_err(|e| StorageError::Database(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| StorageError::Database(e.to_string()))?;
        }

        write_txn
            .commit()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }
}
