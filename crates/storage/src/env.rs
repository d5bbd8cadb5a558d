//! Store environment: one redb database file per store directory
//!
//! The environment owns the [`redb::Database`], creates the tables a store
//! needs and hands out read transactions and [`Writer`]s. redb allows a single
//! write transaction at a time and any number of snapshot readers.

use crate::error::{storage_error, StorageResultExt};
use crate::writer::{BatchLimits, Writer};
use planb_core::{Error, Result};
use redb::{
    Database, ReadTransaction, ReadableTable, TableDefinition, TableError, WriteTransaction,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// File holding the ordered tables of a store
pub const DATA_FILE_NAME: &str = "state.redb";

/// Table of `[name][time] -> value` records
pub const STATE_TABLE: &str = "state";

/// Table of counters and other store metadata
pub const META_TABLE: &str = "meta";

/// Byte-string table definition
pub type BytesTable<'a> = TableDefinition<'a, &'static [u8], &'static [u8]>;

/// Definition of the byte-string table called `name`
pub fn bytes_table(name: &str) -> BytesTable<'_> {
    TableDefinition::new(name)
}

/// A redb database plus the flags the engine enforces on top of it
pub struct PlanbEnv {
    db: Database,
    path: PathBuf,
    read_only: bool,
}

impl PlanbEnv {
    /// Create or open the data file in `dir` and make sure `tables` exist
    pub fn open(dir: &Path, tables: &[String]) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(DATA_FILE_NAME);
        let db = Database::create(&path).storage_err()?;
        let env = PlanbEnv {
            db,
            path,
            read_only: false,
        };
        env.create_tables(tables)?;
        info!(target: "planb::store", path = %env.path.display(), "Opened store environment");
        Ok(env)
    }

    /// Open an existing data file; every write is refused with [`Error::ReadOnly`]
    pub fn open_read_only(dir: &Path) -> Result<Self> {
        let path = dir.join(DATA_FILE_NAME);
        if !path.exists() {
            return Err(Error::config(format!("no store at {}", dir.display())));
        }
        let db = Database::open(&path).storage_err()?;
        info!(target: "planb::store", path = %path.display(), "Opened store environment read-only");
        Ok(PlanbEnv {
            db,
            path,
            read_only: true,
        })
    }

    fn create_tables(&self, tables: &[String]) -> Result<()> {
        let txn = self.db.begin_write().storage_err()?;
        for name in tables
            .iter()
            .map(String::as_str)
            .chain([STATE_TABLE, META_TABLE])
        {
            txn.open_table(bytes_table(name)).storage_err()?;
        }
        txn.commit().storage_err()
    }

    /// Path of the data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether writes are refused
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Current size of the data file in bytes
    pub fn file_size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Begin a snapshot read
    pub fn begin_read(&self) -> Result<ReadTransaction> {
        self.db.begin_read().storage_err()
    }

    /// Begin a batched writer; blocks while another writer is active
    pub fn writer(&self, limits: BatchLimits) -> Result<Writer<'_>> {
        if self.read_only {
            return Err(Error::ReadOnly(self.path.display().to_string()));
        }
        Ok(Writer::new(self, limits))
    }

    pub(crate) fn begin_write(&self) -> Result<WriteTransaction> {
        self.db.begin_write().storage_err()
    }

    /// Rewrite the data file to release pages freed by deletes
    ///
    /// Returns whether anything was reclaimed.
    pub fn compact(&mut self) -> Result<bool> {
        if self.read_only {
            return Err(Error::ReadOnly(self.path.display().to_string()));
        }
        self.db.compact().storage_err()
    }
}

/// Read access through either kind of transaction
///
/// Dictionary reads happen both on snapshot reads and inside the write
/// transaction that is assigning ids, where uncommitted entries must be seen.
#[derive(Clone, Copy)]
pub enum Txn<'a> {
    /// Snapshot read
    Read(&'a ReadTransaction),
    /// Inside the active write transaction
    Write(&'a WriteTransaction),
}

impl Txn<'_> {
    /// Value stored under `key` in table `table`
    ///
    /// A table that does not exist reads as empty.
    pub fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self {
            Txn::Read(txn) => match txn.open_table(bytes_table(table)) {
                Ok(t) => read_value(&t, key),
                Err(TableError::TableDoesNotExist(_)) => Ok(None),
                Err(e) => Err(storage_error(e)),
            },
            Txn::Write(txn) => {
                let t = txn.open_table(bytes_table(table)).storage_err()?;
                read_value(&t, key)
            }
        }
    }
}

fn read_value<T>(table: &T, key: &[u8]) -> Result<Option<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    Ok(table.get(key).storage_err()?.map(|guard| guard.value().to_vec()))
}
