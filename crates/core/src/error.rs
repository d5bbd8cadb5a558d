//! Error types for the Plan B engine
//!
//! Every failure surfaced by the codecs, dictionaries and the store engine is
//! an [`Error`]. We use `thiserror` for the `Display` and `Error`
//! implementations. The engine never retries; retry policy belongs to callers.

use std::io;
use thiserror::Error;

/// Result type alias for Plan B operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the Plan B engine
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (directory creation, deletion, settings file)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A value could not be converted to the kind the schema demands
    #[error("Unable to convert '{value}' to {expected}")]
    Encoding {
        /// Kind the schema expected
        expected: String,
        /// Literal offending value
        value: String,
    },

    /// An encoded key or dictionary entry exceeds the configured maximum
    #[error("Key too long: {actual} bytes exceeds maximum of {max}")]
    KeyTooLong {
        /// Encoded length
        actual: usize,
        /// Configured maximum
        max: usize,
    },

    /// A time cannot be represented at the store's temporal precision
    #[error("Time out of range: {0}")]
    TimeOutOfRange(String),

    /// A hash lookup id could not be assigned or no longer maps to its content
    #[error("Hash collision: {0}")]
    HashCollision(String),

    /// Stored bytes could not be decoded
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Settings of two stores (or of a store and its caller) disagree
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A write was attempted on a store opened read-only
    #[error("Store is read only: {0}")]
    ReadOnly(String),

    /// The store file has grown past its configured maximum size
    #[error("Store full: {size} bytes exceeds maximum of {max}")]
    StoreFull {
        /// Current file size
        size: u64,
        /// Configured maximum
        max: u64,
    },

    /// A long running operation observed its cancellation flag
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid or unreadable configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Error raised by the underlying ordered store
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Encoding failure naming the expected kind and the offending value
    pub fn encoding(expected: impl std::fmt::Display, value: impl std::fmt::Display) -> Self {
        Error::Encoding {
            expected: expected.to_string(),
            value: value.to_string(),
        }
    }

    /// Corruption detected while decoding stored bytes
    pub fn corruption(message: impl Into<String>) -> Self {
        Error::Corruption(message.into())
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_encoding() {
        let err = Error::encoding("byte", "abc");
        let msg = err.to_string();
        assert!(msg.contains("byte"));
        assert!(msg.contains("'abc'"));
    }

    #[test]
    fn test_error_display_key_too_long() {
        let err = Error::KeyTooLong {
            actual: 600,
            max: 511,
        };
        let msg = err.to_string();
        assert!(msg.contains("600"));
        assert!(msg.contains("511"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_pattern_matching() {
        let err = Error::StoreFull { size: 20, max: 10 };
        match err {
            Error::StoreFull { size, max } => {
                assert_eq!(size, 20);
                assert_eq!(max, 10);
            }
            _ => panic!("Wrong error variant"),
        }
    }
}
