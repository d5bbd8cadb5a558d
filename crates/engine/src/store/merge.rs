//! Merging another store directory into this one
//!
//! Records without dictionary references are byte-identical in both stores
//! and are copied as they are. Records that point into the source's
//! dictionaries are decoded there and inserted again, so they pick up ids
//! from this store's dictionaries.

use super::TemporalStore;
use crate::cancel::CancellationToken;
use planb_core::{Error, Result};
use planb_storage::env::bytes_table;
use planb_storage::{StorageResultExt, Txn, STATE_TABLE};
use redb::ReadableTable;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of [`TemporalStore::merge`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Records copied without decoding
    pub copied: u64,
    /// Records decoded and inserted again
    pub reencoded: u64,
}

impl MergeStats {
    /// Records read from the source
    pub fn merged(&self) -> u64 {
        self.copied + self.reencoded
    }
}

impl TemporalStore {
    /// Merge the store in `source_dir` into this store, then delete
    /// `source_dir`.
    ///
    /// The source must have the same schema. It is only deleted once every
    /// batch has committed; on error or cancellation it is left in place and
    /// records merged so far remain in this store.
    ///
    /// # Errors
    ///
    /// - [`Error::SchemaMismatch`] if the schemas differ
    /// - [`Error::Config`] if `source_dir` is this store or holds no store
    /// - [`Error::Cancelled`] if `cancel` fired
    pub fn merge<P: AsRef<Path>>(
        &self,
        source_dir: P,
        cancel: &CancellationToken,
    ) -> Result<MergeStats> {
        let source_dir = source_dir.as_ref();
        self.ensure_writable()?;
        if same_directory(&self.dir, source_dir) {
            return Err(Error::config(format!(
                "cannot merge {} into itself",
                source_dir.display()
            )));
        }

        let source = TemporalStore::open_read_only(source_dir)?;
        self.settings.check_schema(&source.settings)?;

        let stats = self.copy_from(&source, cancel);
        drop(source);
        let stats = match stats {
            Ok(stats) => stats,
            Err(Error::Cancelled) => {
                warn!(
                    target: "planb::store",
                    source = %source_dir.display(),
                    "Merge cancelled, source retained"
                );
                return Err(Error::Cancelled);
            }
            Err(e) => return Err(e),
        };

        std::fs::remove_dir_all(source_dir)?;
        info!(
            target: "planb::store",
            source = %source_dir.display(),
            destination = %self.dir.display(),
            copied = stats.copied,
            reencoded = stats.reencoded,
            "Merged store"
        );
        Ok(stats)
    }

    fn copy_from(&self, source: &TemporalStore, cancel: &CancellationToken) -> Result<MergeStats> {
        let snapshot = source.env.begin_read()?;
        let table = snapshot
            .open_table(bytes_table(STATE_TABLE))
            .storage_err()?;
        let mut stats = MergeStats::default();

        self.write(|w| {
            for entry in table.iter().storage_err()? {
                if cancel.is_cancelled() {
                    w.commit()?;
                    return Err(Error::Cancelled);
                }
                let (k, v) = entry.storage_err()?;
                let (key, value) = (k.value(), v.value());
                if source.codec.references_dictionary(key, value) {
                    let key = source.codec.key.decode(Txn::Read(&snapshot), key)?;
                    let value = source.codec.value.decode(Txn::Read(&snapshot), value)?;
                    w.insert(&key, &value)?;
                    stats.reencoded += 1;
                } else {
                    w.put_raw(key, value)?;
                    stats.copied += 1;
                }
            }
            Ok(())
        })?;
        Ok(stats)
    }
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use crate::{CancellationToken, StoreSettings, TemporalStore};
    use planb_core::{Error, Key, Timestamp, Val};
    use tempfile::TempDir;

    #[test]
    fn merge_into_itself_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = TemporalStore::open(dir.path(), StoreSettings::default()).unwrap();
        let result = store.merge(dir.path(), &CancellationToken::new());
        assert!(matches!(result, Err(Error::Config(_))));
        assert!(dir.path().exists());
    }

    #[test]
    fn merge_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let store = TemporalStore::open(dir.path().join("dest"), StoreSettings::default()).unwrap();
        let result = store.merge(dir.path().join("absent"), &CancellationToken::new());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn merged_counts_split_by_form() {
        let dir = TempDir::new().unwrap();
        let dest = TemporalStore::open(dir.path().join("dest"), StoreSettings::default()).unwrap();
        {
            let source =
                TemporalStore::open(dir.path().join("src"), StoreSettings::default()).unwrap();
            let t = Timestamp::from_millis(1);
            source.insert(&Key::new("short", t), &Val::Int(1)).unwrap();
            source
                .insert(&Key::new("long".repeat(20), t), &Val::Int(2))
                .unwrap();
        }
        let stats = dest
            .merge(dir.path().join("src"), &CancellationToken::new())
            .unwrap();
        assert_eq!(stats.copied, 1);
        assert_eq!(stats.reencoded, 1);
        assert_eq!(stats.merged(), 2);
        assert!(!dir.path().join("src").exists());
    }
}
