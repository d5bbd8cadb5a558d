//! Store configuration via `planb.toml`
//!
//! The settings file is written into the store directory when the store is
//! created. Schema fields (key and value encodings, hash length, precision,
//! maximum key length) are fixed from then on: reopening or merging with
//! different values fails with [`Error::SchemaMismatch`]. The operational
//! fields can be edited between opens.

use planb_core::{Error, Limits, Result, DEFAULT_MAX_KEY_LENGTH};
use planb_storage::{
    BatchLimits, Dictionary, EncodingType, HashLength, RecordCodec, TemporalPrecision, TimeCodec,
    KEYS_DICTIONARY, VALUES_DICTIONARY,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name placed in the store directory.
pub const CONFIG_FILE_NAME: &str = "planb.toml";

fn default_max_key_length() -> usize {
    DEFAULT_MAX_KEY_LENGTH
}

fn default_overwrite() -> bool {
    true
}

fn default_max_batch_entries() -> usize {
    planb_storage::writer::DEFAULT_MAX_BATCH_ENTRIES
}

fn default_max_batch_age_ms() -> u64 {
    planb_storage::writer::DEFAULT_MAX_BATCH_AGE.as_millis() as u64
}

/// Store settings loaded from `planb.toml`.
///
/// # Example
///
/// ```toml
/// key_type = "variable"
/// value_type = "variable"
/// hash_length = "long"
/// temporal_precision = "millisecond"
/// max_key_length = 511
///
/// # 0 = unlimited
/// max_store_size = 0
/// overwrite = true
/// max_batch_entries = 10000
/// max_batch_age_ms = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Representation of key names
    #[serde(default)]
    pub key_type: EncodingType,
    /// Representation of values
    #[serde(default)]
    pub value_type: EncodingType,
    /// Width of hash lookup ids
    #[serde(default)]
    pub hash_length: HashLength,
    /// Resolution of effective times
    #[serde(default)]
    pub temporal_precision: TemporalPrecision,
    /// Maximum encoded key length in bytes
    #[serde(default = "default_max_key_length")]
    pub max_key_length: usize,
    /// Data file size at which writes are refused, in bytes (0 = unlimited)
    #[serde(default)]
    pub max_store_size: u64,
    /// Whether inserting an existing key replaces its value
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
    /// Changes per committed batch
    #[serde(default = "default_max_batch_entries")]
    pub max_batch_entries: usize,
    /// Maximum batch age in milliseconds
    #[serde(default = "default_max_batch_age_ms")]
    pub max_batch_age_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            key_type: EncodingType::default(),
            value_type: EncodingType::default(),
            hash_length: HashLength::default(),
            temporal_precision: TemporalPrecision::default(),
            max_key_length: default_max_key_length(),
            max_store_size: 0,
            overwrite: default_overwrite(),
            max_batch_entries: default_max_batch_entries(),
            max_batch_age_ms: default_max_batch_age_ms(),
        }
    }
}

impl StoreSettings {
    /// Key size limits
    pub fn limits(&self) -> Limits {
        Limits::with_max_key_length(self.max_key_length)
    }

    /// Batch limits handed to writers
    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits {
            max_entries: self.max_batch_entries,
            max_age: Duration::from_millis(self.max_batch_age_ms),
            max_store_size: self.max_store_size,
        }
    }

    /// Dictionary of key names
    pub fn keys_dictionary(&self) -> Dictionary {
        Dictionary::new(KEYS_DICTIONARY, self.hash_length, self.limits())
    }

    /// Dictionary of values
    pub fn values_dictionary(&self) -> Dictionary {
        Dictionary::new(VALUES_DICTIONARY, self.hash_length, self.limits())
    }

    /// Dictionary tables the schema needs
    pub fn dictionary_tables(&self) -> Vec<String> {
        let mut tables = self.keys_dictionary().tables_for(self.key_type);
        tables.extend(self.values_dictionary().tables_for(self.value_type));
        tables
    }

    /// Key and value codecs of the schema
    pub fn record_codec(&self) -> RecordCodec {
        RecordCodec::new(
            self.key_type,
            &self.keys_dictionary(),
            self.value_type,
            &self.values_dictionary(),
            self.temporal_precision,
            self.limits(),
        )
    }

    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the maximum key length leaves no room for
    /// a name or a batch limit is zero.
    pub fn validate(&self) -> Result<()> {
        let time_width = TimeCodec::new(self.temporal_precision).width();
        if self.max_key_length <= time_width + 1 {
            return Err(Error::config(format!(
                "max_key_length {} leaves no room for a name next to a {time_width} byte time",
                self.max_key_length
            )));
        }
        if self.max_batch_entries == 0 {
            return Err(Error::config("max_batch_entries must be at least 1"));
        }
        Ok(())
    }

    /// Compare the schema fields of two settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] naming every field that differs.
    pub fn check_schema(&self, other: &StoreSettings) -> Result<()> {
        let mut differences = Vec::new();
        if self.key_type != other.key_type {
            differences.push(format!("key_type {:?} != {:?}", self.key_type, other.key_type));
        }
        if self.value_type != other.value_type {
            differences.push(format!(
                "value_type {:?} != {:?}",
                self.value_type, other.value_type
            ));
        }
        if self.hash_length != other.hash_length {
            differences.push(format!(
                "hash_length {:?} != {:?}",
                self.hash_length, other.hash_length
            ));
        }
        if self.temporal_precision != other.temporal_precision {
            differences.push(format!(
                "temporal_precision {:?} != {:?}",
                self.temporal_precision, other.temporal_precision
            ));
        }
        if self.max_key_length != other.max_key_length {
            differences.push(format!(
                "max_key_length {} != {}",
                self.max_key_length, other.max_key_length
            ));
        }
        if differences.is_empty() {
            Ok(())
        } else {
            Err(Error::SchemaMismatch(differences.join(", ")))
        }
    }

    /// Read and parse settings from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read settings file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let settings: StoreSettings = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse settings file '{}': {}",
                path.display(),
                e
            ))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize these settings to TOML and write them to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "Failed to write settings file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
