//! Mapping of redb errors into [`planb_core::Error`]
//!
//! The core crate knows nothing about the storage engine, so every redb
//! result is converted at the call site with [`StorageResultExt::storage_err`].

use planb_core::{Error, Result};

/// Convert any redb error into [`Error::Storage`]
pub fn storage_error(e: impl Into<redb::Error>) -> Error {
    Error::Storage(e.into().to_string())
}

/// Extension for results carrying a redb error
pub trait StorageResultExt<T> {
    /// Map the error into [`Error::Storage`]
    fn storage_err(self) -> Result<T>;
}

impl<T, E: Into<redb::Error>> StorageResultExt<T> for std::result::Result<T, E> {
    fn storage_err(self) -> Result<T> {
        self.map_err(storage_error)
    }
}
