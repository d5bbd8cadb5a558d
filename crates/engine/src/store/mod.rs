//! Temporal state store
//!
//! A [`TemporalStore`] is one directory holding `planb.toml` and the redb
//! data file. It encodes keys and values through the codecs its settings
//! select, writes them in batched transactions and answers exact and as-of
//! reads from snapshot transactions.
//!
//! # Example
//!
//! ```ignore
//! use planb_engine::TemporalStore;
//!
//! let store = TemporalStore::builder()
//!     .path("/data/reference")
//!     .key_type(EncodingType::String)
//!     .open()?;
//!
//! store.insert(&Key::new("meter-1", Timestamp::from_millis(10)), &Val::from("on"))?;
//! let state = store.get_state(&Val::from("meter-1"), Timestamp::from_millis(25))?;
//! ```

mod builder;
mod condense;
mod config;
mod merge;
mod writer;

pub use builder::StoreBuilder;
pub use condense::CondenseStats;
pub use merge::MergeStats;
pub use config::{StoreSettings, CONFIG_FILE_NAME};
pub use writer::StoreWriter;

use planb_core::{Error, Key, Result, TemporalState, Timestamp, Val};
use planb_storage::env::bytes_table;
use planb_storage::lookup::{clash_key, read_counter};
use planb_storage::{
    storage_error, PlanbEnv, RecordCodec, StorageResultExt, Txn, KEYS_DICTIONARY, META_TABLE,
    STATE_TABLE, VALUES_DICTIONARY,
};
use redb::{ReadableTableMetadata, TableError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Embedded temporal key-value store; see the module docs
pub struct TemporalStore {
    dir: PathBuf,
    settings: StoreSettings,
    env: PlanbEnv,
    codec: RecordCodec,
}

/// Snapshot of a store's size and configuration
#[derive(Debug, Clone, Serialize)]
pub struct StoreInfo {
    /// Store directory
    pub path: PathBuf,
    /// Settings in effect
    pub settings: StoreSettings,
    /// Whether the store was opened read-only
    pub read_only: bool,
    /// Size of the data file in bytes
    pub file_size: u64,
    /// Entries per table
    pub tables: BTreeMap<String, u64>,
    /// Hash clashes resolved per dictionary
    pub hash_clashes: BTreeMap<String, u64>,
}

impl StoreInfo {
    /// Number of state records
    pub fn entries(&self) -> u64 {
        self.tables.get(STATE_TABLE).copied().unwrap_or(0)
    }
}

impl TemporalStore {
    /// Builder for programmatic settings
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Open the store in `dir`, creating it with `settings` if absent.
    ///
    /// An existing store must have the same schema. Its operational settings
    /// (batch limits, size limit, overwrite) are taken from `settings`.
    ///
    /// # Errors
    ///
    /// [`Error::SchemaMismatch`] if the stored schema differs,
    /// [`Error::Config`] if `settings` are invalid.
    pub fn open<P: AsRef<Path>>(dir: P, settings: StoreSettings) -> Result<Self> {
        let dir = dir.as_ref();
        settings.validate()?;
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            let stored = StoreSettings::from_file(&config_path)?;
            stored.check_schema(&settings)?;
        } else {
            std::fs::create_dir_all(dir)?;
            settings.write_to_file(&config_path)?;
        }
        Self::open_with(dir, settings, false)
    }

    /// Open an existing store with the settings in its `planb.toml`.
    pub fn open_existing<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let settings = StoreSettings::from_file(&dir.join(CONFIG_FILE_NAME))?;
        Self::open_with(dir, settings, false)
    }

    /// Open an existing store for reading only.
    ///
    /// Every write, merge into, condense and compact fails with
    /// [`Error::ReadOnly`].
    pub fn open_read_only<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let settings = StoreSettings::from_file(&dir.join(CONFIG_FILE_NAME))?;
        Self::open_with(dir, settings, true)
    }

    fn open_with(dir: &Path, settings: StoreSettings, read_only: bool) -> Result<Self> {
        let env = if read_only {
            PlanbEnv::open_read_only(dir)?
        } else {
            PlanbEnv::open(dir, &settings.dictionary_tables())?
        };
        let codec = settings.record_codec();
        info!(
            target: "planb::store",
            path = %dir.display(),
            key_type = ?settings.key_type,
            value_type = ?settings.value_type,
            precision = ?settings.temporal_precision,
            read_only,
            "Opened temporal store"
        );
        Ok(TemporalStore {
            dir: dir.to_path_buf(),
            settings,
            env,
            codec,
        })
    }

    /// Store directory
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Settings in effect
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Whether the store was opened read-only
    pub fn is_read_only(&self) -> bool {
        self.env.is_read_only()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Run `f` with a batched writer.
    ///
    /// Commits what is left on `Ok`, discards the open batch on `Err`.
    /// Batches committed before the error stay committed.
    ///
    /// # Example
    /// ```text
    /// let changed = store.write(|w| {
    ///     w.insert(&key_a, &value_a)?;
    ///     w.insert(&key_b, &value_b)
    /// })?;
    /// ```
    pub fn write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreWriter<'_>) -> Result<T>,
    {
        let mut writer = StoreWriter {
            writer: self.env.writer(self.settings.batch_limits())?,
            codec: &self.codec,
            overwrite: self.settings.overwrite,
        };
        match f(&mut writer) {
            Ok(value) => {
                writer.writer.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = writer.writer.abort() {
                    warn!(target: "planb::writer", error = %abort, "Failed to abort batch");
                }
                Err(e)
            }
        }
    }

    /// Insert one record and commit it.
    ///
    /// Returns whether the stored state changed.
    pub fn insert(&self, key: &Key, value: &Val) -> Result<bool> {
        self.write(|w| w.insert(key, value))
    }

    /// Insert many records with one writer; returns how many changed state
    pub fn insert_all<'a, I>(&self, states: I) -> Result<u64>
    where
        I: IntoIterator<Item = &'a TemporalState>,
    {
        self.write(|w| {
            let mut changed = 0;
            for state in states {
                if w.insert_state(state)? {
                    changed += 1;
                }
            }
            Ok(changed)
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Value stored under exactly `key`
    pub fn get(&self, key: &Key) -> Result<Option<Val>> {
        let txn = self.env.begin_read()?;
        let mut probe = Vec::new();
        if !self.codec.key.encode_existing(Txn::Read(&txn), key, &mut probe)? {
            return Ok(None);
        }
        let table = txn.open_table(bytes_table(STATE_TABLE)).storage_err()?;
        let stored = table.get(probe.as_slice()).storage_err()?.map(|v| v.value().to_vec());
        stored
            .map(|bytes| self.codec.value.decode(Txn::Read(&txn), &bytes))
            .transpose()
    }

    /// Latest state of `name` at or before `time`
    ///
    /// Scans backward from `[name][time]`; the first entry is the answer if
    /// it belongs to `name`.
    pub fn get_state(&self, name: &Val, time: Timestamp) -> Result<Option<TemporalState>> {
        let txn = self.env.begin_read()?;
        let mut probe = Vec::new();
        let key = Key::new(name.clone(), time);
        if !self.codec.key.encode_existing(Txn::Read(&txn), &key, &mut probe)? {
            return Ok(None);
        }
        let name_len = probe.len() - self.codec.key.time().width();

        let table = txn.open_table(bytes_table(STATE_TABLE)).storage_err()?;
        let found = match table.range::<&[u8]>(..=probe.as_slice()).storage_err()?.next_back() {
            Some(entry) => {
                let (k, v) = entry.storage_err()?;
                let k = k.value();
                if k.len() == probe.len() && k[..name_len] == probe[..name_len] {
                    Some((k.to_vec(), v.value().to_vec()))
                } else {
                    None
                }
            }
            None => None,
        };
        let Some((key_bytes, value_bytes)) = found else {
            return Ok(None);
        };
        let key = self.codec.key.decode(Txn::Read(&txn), &key_bytes)?;
        let value = self.codec.value.decode(Txn::Read(&txn), &value_bytes)?;
        Ok(Some(TemporalState::new(key, value)))
    }

    /// All versions of `name`, oldest first
    pub fn history(&self, name: &Val) -> Result<Vec<TemporalState>> {
        let txn = self.env.begin_read()?;
        let mut prefix = Vec::new();
        if !self.codec.key.encode_name(Txn::Read(&txn), name, &mut prefix)? {
            return Ok(Vec::new());
        }
        let table = txn.open_table(bytes_table(STATE_TABLE)).storage_err()?;
        let mut states = Vec::new();
        for entry in table.range::<&[u8]>(prefix.as_slice()..).storage_err()? {
            let (k, v) = entry.storage_err()?;
            if !k.value().starts_with(&prefix) {
                break;
            }
            let key = self.codec.key.decode(Txn::Read(&txn), k.value())?;
            let value = self.codec.value.decode(Txn::Read(&txn), v.value())?;
            states.push(TemporalState::new(key, value));
        }
        Ok(states)
    }

    /// Number of stored records
    pub fn count(&self) -> Result<u64> {
        let txn = self.env.begin_read()?;
        let table = txn.open_table(bytes_table(STATE_TABLE)).storage_err()?;
        table.len().storage_err()
    }

    /// Entry counts, file size and settings
    pub fn info(&self) -> Result<StoreInfo> {
        let txn = self.env.begin_read()?;
        let mut tables = BTreeMap::new();
        let names = std::iter::once(STATE_TABLE.to_string()).chain(self.settings.dictionary_tables());
        for name in names {
            let entries = match txn.open_table(bytes_table(&name)) {
                Ok(table) => table.len().storage_err()?,
                Err(TableError::TableDoesNotExist(_)) => 0,
                Err(e) => return Err(storage_error(e)),
            };
            tables.insert(name, entries);
        }

        let mut hash_clashes = BTreeMap::new();
        for dictionary in [KEYS_DICTIONARY, VALUES_DICTIONARY] {
            if let Some(bytes) = Txn::Read(&txn).get(META_TABLE, &clash_key(dictionary))? {
                hash_clashes.insert(dictionary.to_string(), read_counter(&bytes));
            }
        }

        Ok(StoreInfo {
            path: self.dir.clone(),
            settings: self.settings.clone(),
            read_only: self.is_read_only(),
            file_size: self.env.file_size()?,
            tables,
            hash_clashes,
        })
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Release file pages freed by deletes, e.g. after [`TemporalStore::condense`]
    ///
    /// Returns whether anything was reclaimed.
    pub fn compact(&mut self) -> Result<bool> {
        let before = self.env.file_size()?;
        let compacted = self.env.compact()?;
        info!(
            target: "planb::store",
            before,
            after = self.env.file_size()?,
            "Compacted store"
        );
        Ok(compacted)
    }

    pub(crate) fn env(&self) -> &PlanbEnv {
        &self.env
    }

    pub(crate) fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.is_read_only() {
            return Err(Error::ReadOnly(self.dir.display().to_string()));
        }
        Ok(())
    }
}
