//! Schema choices fixed when a store is created
//!
//! These enums are persisted in the store's settings file and must match
//! between a store and anything merged into it.

use planb_core::ValType;
use serde::{Deserialize, Serialize};

/// Representation of a key name or a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingType {
    /// Single byte, 0 or 1
    Boolean,
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Inline UTF-8, bounded by the maximum key length
    String,
    /// Sequence-assigned dictionary id
    UidLookup,
    /// Content-hash dictionary id
    HashLookup,
    /// Inline when small, dictionary id otherwise
    #[default]
    Variable,
}

impl EncodingType {
    /// Whether this representation needs the UID dictionary
    pub fn uses_uid_lookup(self) -> bool {
        matches!(self, EncodingType::UidLookup | EncodingType::Variable)
    }

    /// Whether this representation needs the hash dictionary
    pub fn uses_hash_lookup(self) -> bool {
        matches!(self, EncodingType::HashLookup | EncodingType::Variable)
    }

    /// Whether this representation stores dictionary ids
    pub fn uses_lookup(self) -> bool {
        self.uses_uid_lookup() || self.uses_hash_lookup()
    }

    /// Value kind of the fixed-width representations
    pub fn fixed_val_type(self) -> Option<ValType> {
        match self {
            EncodingType::Boolean => Some(ValType::Boolean),
            EncodingType::Byte => Some(ValType::Byte),
            EncodingType::Short => Some(ValType::Short),
            EncodingType::Int => Some(ValType::Int),
            EncodingType::Long => Some(ValType::Long),
            EncodingType::Float => Some(ValType::Float),
            EncodingType::Double => Some(ValType::Double),
            EncodingType::String
            | EncodingType::UidLookup
            | EncodingType::HashLookup
            | EncodingType::Variable => None,
        }
    }
}

/// Width of hash lookup ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashLength {
    /// 4-byte ids
    Short,
    /// 8-byte ids
    #[default]
    Long,
}

impl HashLength {
    /// Id width in bytes
    pub const fn width(self) -> usize {
        match self {
            HashLength::Short => 4,
            HashLength::Long => 8,
        }
    }
}

/// Resolution at which effective times are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalPrecision {
    /// Nanoseconds
    Nanosecond,
    /// Milliseconds
    #[default]
    Millisecond,
    /// Seconds
    Second,
    /// Minutes
    Minute,
    /// Hours
    Hour,
    /// Days
    Day,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_usage() {
        assert!(EncodingType::Variable.uses_uid_lookup());
        assert!(EncodingType::Variable.uses_hash_lookup());
        assert!(EncodingType::UidLookup.uses_uid_lookup());
        assert!(!EncodingType::UidLookup.uses_hash_lookup());
        assert!(!EncodingType::Long.uses_uid_lookup());
        assert!(!EncodingType::String.uses_hash_lookup());
        assert!(EncodingType::HashLookup.uses_lookup());
        assert!(!EncodingType::Double.uses_lookup());
    }

    #[test]
    fn test_fixed_val_type() {
        assert_eq!(EncodingType::Int.fixed_val_type(), Some(ValType::Int));
        assert_eq!(EncodingType::String.fixed_val_type(), None);
        assert_eq!(EncodingType::Variable.fixed_val_type(), None);
    }

    #[test]
    fn test_hash_width() {
        assert_eq!(HashLength::Short.width(), 4);
        assert_eq!(HashLength::Long.width(), 8);
    }
}
