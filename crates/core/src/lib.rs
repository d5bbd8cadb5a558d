//! Core types for the Plan B temporal state store
//!
//! This crate defines the foundational types used throughout the system:
//! - Val / ValType: tagged scalar values and their stable tags
//! - Timestamp: nanosecond effective times
//! - Key / TemporalState: versioned records
//! - Limits: key size limits
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod timestamp;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use limits::{Limits, DEFAULT_MAX_KEY_LENGTH, MAX_HASH_PROBES, VARIABLE_INLINE_THRESHOLD};
pub use timestamp::Timestamp;
pub use types::{Key, TemporalState};
pub use value::{Val, ValType};
