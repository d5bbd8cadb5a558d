//! Storage layer for Plan B
//!
//! This crate implements the on-disk representation of temporal state:
//! - Codecs: value, time, key and value-schema encodings
//! - Lookups: UID and hash dictionaries that deduplicate names and values
//! - PlanbEnv: redb database with the state, meta and dictionary tables
//! - Writer: batched write transactions with scoped encode buffers
//!
//! # Layout
//!
//! One redb file per store directory holds every table. Records live in
//! `state` as `[name][time] -> value`; dictionaries live in `keys_*` and
//! `values_*`; counters live in `meta`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod env;
pub mod error;
pub mod lookup;
pub mod schema;
pub mod writer;

pub use codec::{KeyCodec, RecordCodec, TimeCodec, ValueCodec};
pub use error::{storage_error, StorageResultExt};
pub use env::{PlanbEnv, Txn, DATA_FILE_NAME, META_TABLE, STATE_TABLE};
pub use lookup::{Dictionary, HashPending, KEYS_DICTIONARY, VALUES_DICTIONARY};
pub use schema::{EncodingType, HashLength, TemporalPrecision};
pub use writer::{BatchLimits, Buffers, WriteContext, Writer};
