//! Size limits for keys and dictionary entries
//!
//! Limits are part of a store's schema: they are fixed at creation and
//! enforced before any write is attempted. Violations return
//! [`Error::KeyTooLong`].

use crate::error::{Error, Result};

/// Default maximum encoded key length in bytes (LMDB compatible)
pub const DEFAULT_MAX_KEY_LENGTH: usize = 511;

/// Encoded names up to this many bytes are inlined by the variable key codec
pub const VARIABLE_INLINE_THRESHOLD: usize = 32;

/// Slots tried by the hash lookup before a write fails
pub const MAX_HASH_PROBES: u64 = 16;

/// Size limits for keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum encoded key length in bytes (default: 511)
    pub max_key_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }
}

impl Limits {
    /// Create limits with a custom maximum key length
    pub fn with_max_key_length(max_key_length: usize) -> Self {
        Limits { max_key_length }
    }

    /// Validate an encoded key length
    pub fn validate_key_length(&self, len: usize) -> Result<()> {
        if len > self.max_key_length {
            return Err(Error::KeyTooLong {
                actual: len,
                max: self.max_key_length,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        assert_eq!(Limits::default().max_key_length, 511);
    }

    #[test]
    fn test_validate_key_length() {
        let limits = Limits::with_max_key_length(10);
        assert!(limits.validate_key_length(10).is_ok());
        assert!(matches!(
            limits.validate_key_length(11),
            Err(Error::KeyTooLong { actual: 11, max: 10 })
        ));
    }
}
