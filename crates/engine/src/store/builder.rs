//! Store builder for fluent configuration

use std::path::PathBuf;
use std::time::Duration;

use planb_core::{Error, Result};
use planb_storage::{EncodingType, HashLength, TemporalPrecision};

use super::{StoreSettings, TemporalStore};

// ============================================================================
// Store Builder Pattern
// ============================================================================

/// Builder for [`TemporalStore`] settings
///
/// ```ignore
/// use planb_engine::TemporalStore;
///
/// // Defaults: variable keys and values, long hashes, millisecond precision
/// let store = TemporalStore::open("/data/states", StoreSettings::default())?;
///
/// // Builder for a custom schema
/// let store = TemporalStore::builder()
///     .path("/data/sessions")
///     .key_type(EncodingType::UidLookup)
///     .value_type(EncodingType::String)
///     .precision(TemporalPrecision::Second)
///     .open()?;
/// ```
///
/// Schema settings only take effect when the store is created; reopening
/// an existing store with a different schema fails.
#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    /// Store directory (required for open())
    path: Option<PathBuf>,
    settings: StoreSettings,
}

impl StoreBuilder {
    /// Create new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set store directory
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Representation of key names
    pub fn key_type(mut self, encoding: EncodingType) -> Self {
        self.settings.key_type = encoding;
        self
    }

    /// Representation of values
    pub fn value_type(mut self, encoding: EncodingType) -> Self {
        self.settings.value_type = encoding;
        self
    }

    /// Width of hash lookup ids
    pub fn hash_length(mut self, length: HashLength) -> Self {
        self.settings.hash_length = length;
        self
    }

    /// Resolution of effective times
    pub fn precision(mut self, precision: TemporalPrecision) -> Self {
        self.settings.temporal_precision = precision;
        self
    }

    /// Maximum encoded key length in bytes
    pub fn max_key_length(mut self, length: usize) -> Self {
        self.settings.max_key_length = length;
        self
    }

    /// Refuse writes once the data file exceeds `bytes` (0 = unlimited)
    pub fn max_store_size(mut self, bytes: u64) -> Self {
        self.settings.max_store_size = bytes;
        self
    }

    /// Whether inserting an existing key replaces its value
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.settings.overwrite = overwrite;
        self
    }

    /// Commit a batch after this many changes
    pub fn max_batch_entries(mut self, entries: usize) -> Self {
        self.settings.max_batch_entries = entries;
        self
    }

    /// Commit a batch once it is this old
    pub fn max_batch_age(mut self, age: Duration) -> Self {
        self.settings.max_batch_age_ms = u64::try_from(age.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Settings built so far
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Open or create the store
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No path was configured
    /// - The settings are invalid or differ from the stored schema
    pub fn open(self) -> Result<TemporalStore> {
        let path = self
            .path
            .ok_or_else(|| Error::config("StoreBuilder::open() requires a path"))?;
        TemporalStore::open(path, self.settings)
    }
}
