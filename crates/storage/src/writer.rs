//! Batched writer over one redb write transaction at a time
//!
//! A [`Writer`] begins its write transaction lazily, accumulates changes and
//! commits them in batches bounded by entry count and age. The encode
//! buffers and pending hash assignments live here, so they are scoped to the
//! writer and dropped with it.
//!
//! Before each batch starts the data file size is checked against the
//! configured maximum and [`Error::StoreFull`] is returned once it is
//! exceeded.

use crate::env::{bytes_table, PlanbEnv};
use crate::error::StorageResultExt;
use crate::lookup::HashPending;
use planb_core::{Error, Result};
use redb::{ReadableTable, WriteTransaction};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default number of changes per committed batch
pub const DEFAULT_MAX_BATCH_ENTRIES: usize = 10_000;

/// Default age after which a batch is committed
pub const DEFAULT_MAX_BATCH_AGE: Duration = Duration::from_secs(10);

/// When a writer commits its current batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Changes per batch
    pub max_entries: usize,
    /// Maximum batch age
    pub max_age: Duration,
    /// Data file size at which new batches are refused (0 = unlimited)
    pub max_store_size: u64,
}

impl Default for BatchLimits {
    fn default() -> Self {
        BatchLimits {
            max_entries: DEFAULT_MAX_BATCH_ENTRIES,
            max_age: DEFAULT_MAX_BATCH_AGE,
            max_store_size: 0,
        }
    }
}

/// Reusable encode buffers
#[derive(Debug, Default)]
pub struct Buffers {
    /// Encoded key
    pub key: Vec<u8>,
    /// Encoded value
    pub value: Vec<u8>,
}

/// Batched writer; see the module docs
pub struct Writer<'env> {
    env: &'env PlanbEnv,
    txn: Option<WriteTransaction>,
    pending: HashPending,
    buffers: Buffers,
    limits: BatchLimits,
    changes: usize,
    started: Instant,
    committed: u64,
}

/// The active write transaction together with its pending hash assignments
pub struct WriteContext<'w> {
    /// Active write transaction
    pub txn: &'w WriteTransaction,
    /// Hash ids assigned in this transaction
    pub pending: &'w mut HashPending,
}

impl<'env> Writer<'env> {
    pub(crate) fn new(env: &'env PlanbEnv, limits: BatchLimits) -> Self {
        Writer {
            env,
            txn: None,
            pending: HashPending::default(),
            buffers: Buffers::default(),
            limits,
            changes: 0,
            started: Instant::now(),
            committed: 0,
        }
    }

    fn begin(&mut self) -> Result<()> {
        if self.txn.is_some() {
            return Ok(());
        }
        let max = self.limits.max_store_size;
        if max > 0 {
            let size = self.env.file_size()?;
            if size > max {
                return Err(Error::StoreFull { size, max });
            }
        }
        self.txn = Some(self.env.begin_write()?);
        self.started = Instant::now();
        Ok(())
    }

    /// Borrow the write context and the encode buffers at the same time
    pub fn split(&mut self) -> Result<(WriteContext<'_>, &mut Buffers)> {
        self.begin()?;
        let txn = self
            .txn
            .as_ref()
            .ok_or_else(|| Error::Storage("write transaction not started".to_string()))?;
        Ok((
            WriteContext {
                txn,
                pending: &mut self.pending,
            },
            &mut self.buffers,
        ))
    }

    /// Count one change toward the batch limits
    pub fn record_change(&mut self) {
        self.changes += 1;
    }

    /// Changes in the open batch
    pub fn pending_changes(&self) -> usize {
        self.changes
    }

    /// Total changes committed by this writer
    pub fn committed_changes(&self) -> u64 {
        self.committed
    }

    /// Whether the open batch has reached its entry or age limit
    pub fn should_commit(&self) -> bool {
        self.txn.is_some()
            && (self.changes >= self.limits.max_entries
                || self.started.elapsed() >= self.limits.max_age)
    }

    /// Commit if [`Writer::should_commit`]; returns whether it did
    pub fn try_commit(&mut self) -> Result<bool> {
        if self.should_commit() {
            self.commit()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Verify pending hash ids and commit the open batch, if any
    pub fn commit(&mut self) -> Result<()> {
        let Some(txn) = self.txn.take() else {
            return Ok(());
        };
        self.pending.verify(&txn)?;
        self.pending.persist_clashes(&txn)?;
        txn.commit().storage_err()?;
        debug!(target: "planb::writer", changes = self.changes, "Committed batch");
        self.committed += self.changes as u64;
        self.changes = 0;
        self.pending.clear();
        Ok(())
    }

    /// Discard the open batch
    pub fn abort(&mut self) -> Result<()> {
        self.pending.clear();
        self.changes = 0;
        if let Some(txn) = self.txn.take() {
            txn.abort().storage_err()?;
            debug!(target: "planb::writer", "Aborted batch");
        }
        Ok(())
    }
}

impl WriteContext<'_> {
    /// Store `value` under `key`
    ///
    /// With `overwrite` false an existing value is kept. Returns whether the
    /// table changed.
    pub fn put(&mut self, table: &str, key: &[u8], value: &[u8], overwrite: bool) -> Result<bool> {
        let mut t = self.txn.open_table(bytes_table(table)).storage_err()?;
        if !overwrite && t.get(key).storage_err()?.is_some() {
            return Ok(false);
        }
        let previous = t.insert(key, value).storage_err()?.map(|guard| guard.value() == value);
        Ok(previous != Some(true))
    }

    /// Remove `key`; returns whether it existed
    pub fn delete(&mut self, table: &str, key: &[u8]) -> Result<bool> {
        let mut t = self.txn.open_table(bytes_table(table)).storage_err()?;
        let existed = t.remove(key).storage_err()?.is_some();
        Ok(existed)
    }
}
