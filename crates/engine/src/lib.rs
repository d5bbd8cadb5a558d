//! Temporal store engine for Plan B
//!
//! This crate builds the store operations on top of the storage layer:
//! - TemporalStore: open, insert, get, as-of get, history, count, info, compact
//! - Merge: fold another store directory into this one
//! - Condense: time based removal of old and repeated history
//! - Search: predicate evaluation over lazily decoded records
//! - StoreSettings: the `planb.toml` schema file
//!
//! The engine is the only component that knows about:
//! - Store directories and their settings files
//! - Batch commit policy and cancellation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod search;
pub mod store;

pub use cancel::CancellationToken;
pub use search::{Condition, Field, Operator, SearchCriteria};
pub use store::{
    CondenseStats, MergeStats, StoreBuilder, StoreInfo, StoreSettings, StoreWriter, TemporalStore,
    CONFIG_FILE_NAME,
};
