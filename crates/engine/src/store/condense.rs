//! Time based condensing of stored history
//!
//! One ascending pass over the state table, grouped by encoded name:
//!
//! - entries older than `delete_before` are removed outright
//! - an entry whose successor carries the same value bytes is removed when
//!   both fall at or before `condense_before`, leaving the later version to
//!   represent the run
//!
//! Freed pages stay in the file until [`TemporalStore::compact`].

use super::TemporalStore;
use crate::cancel::CancellationToken;
use planb_core::{Error, Result, Timestamp};
use planb_storage::env::bytes_table;
use planb_storage::{StorageResultExt, STATE_TABLE};
use redb::ReadableTable;
use tracing::{info, warn};

/// Outcome of [`TemporalStore::condense`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CondenseStats {
    /// Entries visited
    pub scanned: u64,
    /// Entries removed for being older than `delete_before`
    pub deleted: u64,
    /// Entries removed as redundant repeats of the same value
    pub condensed: u64,
}

impl CondenseStats {
    /// Entries removed in total
    pub fn removed(&self) -> u64 {
        self.deleted + self.condensed
    }
}

/// Last entry kept for the name being scanned
struct Retained {
    key: Vec<u8>,
    name_len: usize,
    time: Timestamp,
    value: Vec<u8>,
}

impl Retained {
    fn same_name(&self, key: &[u8], name_len: usize) -> bool {
        self.name_len == name_len && self.key[..name_len] == key[..name_len]
    }
}

impl TemporalStore {
    /// Remove history older than `delete_before` and collapse repeated
    /// values older than `condense_before`.
    ///
    /// Work done before a cancellation stays committed; the call then
    /// returns [`Error::Cancelled`].
    ///
    /// # Example
    /// ```text
    /// history (10,a) (20,a) (30,b)
    /// condense(25, 5)  -> (20,a) (30,b)
    /// condense(25, 15) -> (20,a) (30,b)   10 is older than 15
    /// ```
    pub fn condense(
        &self,
        condense_before: Timestamp,
        delete_before: Timestamp,
        cancel: &CancellationToken,
    ) -> Result<CondenseStats> {
        self.ensure_writable()?;
        let snapshot = self.env.begin_read()?;
        let table = snapshot
            .open_table(bytes_table(STATE_TABLE))
            .storage_err()?;
        let codec = &self.codec.key;

        let mut stats = CondenseStats::default();
        let outcome = self.write(|w| {
            let mut previous: Option<Retained> = None;
            for entry in table.iter().storage_err()? {
                if cancel.is_cancelled() {
                    w.commit()?;
                    return Err(Error::Cancelled);
                }
                let (k, v) = entry.storage_err()?;
                let key = k.value();
                stats.scanned += 1;

                let name_len = codec.name_bytes(key)?.len();
                let time = codec.decode_time(key)?;
                if time < delete_before {
                    w.delete_raw(key)?;
                    stats.deleted += 1;
                    previous = None;
                    continue;
                }

                if let Some(prev) = &previous {
                    if prev.same_name(key, name_len)
                        && prev.value == v.value()
                        && prev.time < condense_before
                        && time <= condense_before
                    {
                        w.delete_raw(&prev.key)?;
                        stats.condensed += 1;
                    }
                }
                previous = Some(Retained {
                    key: key.to_vec(),
                    name_len,
                    time,
                    value: v.value().to_vec(),
                });
            }
            Ok(())
        });

        match outcome {
            Ok(()) => {
                info!(
                    target: "planb::store",
                    path = %self.dir.display(),
                    scanned = stats.scanned,
                    deleted = stats.deleted,
                    condensed = stats.condensed,
                    "Condensed store"
                );
                Ok(stats)
            }
            Err(Error::Cancelled) => {
                warn!(
                    target: "planb::store",
                    path = %self.dir.display(),
                    scanned = stats.scanned,
                    removed = stats.removed(),
                    "Condense cancelled"
                );
                Err(Error::Cancelled)
            }
            Err(e) => Err(e),
        }
    }
}
