//! Binary codecs for stored keys and values
//!
//! - [`value`]: `[tag][payload]` layout of a single [`planb_core::Val`]
//! - [`time`]: fixed-width effective times per [`TemporalPrecision`]
//! - [`key`]: `[name][time]` keys, one name codec per [`EncodingType`]
//! - [`state`]: the value half of a record, optionally dictionary backed
//!
//! # Usage
//!
//! ```ignore
//! use planb_storage::codec::{KeyCodec, ValueCodec};
//!
//! let keys = KeyCodec::new(EncodingType::Variable, &dictionary, precision, limits);
//! let (mut ctx, buffers) = writer.split()?;
//! keys.encode(&mut ctx, &key, &mut buffers.key)?;
//! ```

pub mod key;
pub mod state;
pub mod time;
pub mod value;

pub use key::{name_codec, KeyCodec, NameCodec};
pub use state::ValueCodec;
pub use time::TimeCodec;

use crate::lookup::Dictionary;
use crate::schema::{EncodingType, TemporalPrecision};
use planb_core::Limits;

/// Key and value codecs of one store schema
pub struct RecordCodec {
    /// Key codec
    pub key: KeyCodec,
    /// Value codec
    pub value: ValueCodec,
}

impl RecordCodec {
    /// Codecs for a schema; the dictionaries may be shared with other stores
    pub fn new(
        key_encoding: EncodingType,
        keys: &Dictionary,
        value_encoding: EncodingType,
        values: &Dictionary,
        precision: TemporalPrecision,
        limits: Limits,
    ) -> Self {
        RecordCodec {
            key: KeyCodec::new(key_encoding, keys, precision, limits),
            value: ValueCodec::new(value_encoding, values),
        }
    }

    /// Whether a stored record refers to dictionary entries
    ///
    /// Records that do not can be copied byte for byte into another store
    /// with the same schema.
    pub fn references_dictionary(&self, key: &[u8], value: &[u8]) -> bool {
        let key_refers = match self.key.encoding() {
            EncodingType::UidLookup | EncodingType::HashLookup => true,
            EncodingType::Variable => key.first() != Some(&key::VARIABLE_DIRECT),
            _ => false,
        };
        key_refers || self.value.references_dictionary(value)
    }
}
