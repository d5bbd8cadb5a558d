//! Value-deduplication dictionaries
//!
//! A store has two dictionaries, one for key names and one for values. Each
//! combines a [`UidLookup`] and a [`HashLookup`]; which of them is used depends
//! on the configured encoding.

mod hash;
mod uid;

pub use hash::{clash_key, read_counter, HashLookup, HashPending};
pub use uid::{decode_id, UidLookup, UID_WIDTH};

use crate::schema::{EncodingType, HashLength};
use planb_core::Limits;

/// Dictionary holding key names
pub const KEYS_DICTIONARY: &str = "keys";

/// Dictionary holding values
pub const VALUES_DICTIONARY: &str = "values";

/// UID and hash lookup under one dictionary name
#[derive(Debug, Clone)]
pub struct Dictionary {
    name: String,
    /// Sequence-assigned ids
    pub uid: UidLookup,
    /// Content-hash ids
    pub hash: HashLookup,
}

impl Dictionary {
    /// Dictionary `name`
    pub fn new(name: &str, hash_length: HashLength, limits: Limits) -> Self {
        Dictionary {
            name: name.to_string(),
            uid: UidLookup::new(name, limits),
            hash: HashLookup::new(name, hash_length),
        }
    }

    /// Dictionary name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tables needed when values are stored with `encoding`
    pub fn tables_for(&self, encoding: EncodingType) -> Vec<String> {
        let mut tables = Vec::new();
        if encoding.uses_uid_lookup() {
            tables.extend(self.uid.tables().iter().map(|t| t.to_string()));
        }
        if encoding.uses_hash_lookup() {
            tables.push(self.hash.table().to_string());
        }
        tables
    }
}
