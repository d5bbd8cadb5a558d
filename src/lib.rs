//! Plan B - embedded temporal state store
//!
//! Plan B keeps the history of named values: every record is a name, the
//! instant it became effective and its value. Reads answer "what was the
//! state of this name at time T" with one backward scan.
//!
//! # Quick Start
//!
//! ```ignore
//! use planb::{Key, StoreSettings, TemporalStore, Timestamp, Val};
//!
//! let store = TemporalStore::open("/data/reference", StoreSettings::default())?;
//! store.insert(&Key::new("meter-1", Timestamp::from_millis(10)), &Val::from("on"))?;
//!
//! let state = store.get_state(&Val::from("meter-1"), Timestamp::from_millis(25))?;
//! ```
//!
//! # Architecture
//!
//! - `planb-core`: values, timestamps, keys and errors
//! - `planb-storage`: record codecs, dictionaries and the redb environment
//! - `planb-engine`: the store, merge, condense and search

pub use planb_core::{Error, Key, Limits, Result, TemporalState, Timestamp, Val, ValType};
pub use planb_engine::{
    CancellationToken, CondenseStats, Condition, Field, MergeStats, Operator, SearchCriteria,
    StoreBuilder, StoreInfo, StoreSettings, StoreWriter, TemporalStore, CONFIG_FILE_NAME,
};
pub use planb_storage::{EncodingType, HashLength, TemporalPrecision};
