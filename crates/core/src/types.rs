//! Temporal key and state records
//!
//! A [`Key`] names one version of an entity: the entity identifier plus the
//! instant from which that version is valid. Keys sharing a name form a
//! version history ordered by effective time.

use crate::timestamp::Timestamp;
use crate::value::Val;

/// Composite key: entity name + effective time
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    /// Entity identifier (usually a Byte/Int/Long/String value)
    pub name: Val,
    /// Instant from which this version is valid
    pub effective_time: Timestamp,
}

impl Key {
    /// Create a new key
    pub fn new(name: impl Into<Val>, effective_time: Timestamp) -> Self {
        Self {
            name: name.into(),
            effective_time,
        }
    }
}

/// One versioned fact: a key and the value valid from its effective time
///
/// Superseded by inserting a later version for the same name, never mutated
/// in place.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalState {
    /// Name and effective time
    pub key: Key,
    /// Stored value
    pub value: Val,
}

impl TemporalState {
    /// Create a new state record
    pub fn new(key: Key, value: impl Into<Val>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// Entity name
    pub fn name(&self) -> &Val {
        &self.key.name
    }

    /// Effective time
    pub fn effective_time(&self) -> Timestamp {
        self.key.effective_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_new() {
        let key = Key::new("sensor-1", Timestamp::from_secs(10));
        assert_eq!(key.name, Val::String("sensor-1".into()));
        assert_eq!(key.effective_time.as_secs(), 10);
    }

    #[test]
    fn test_state_accessors() {
        let state = TemporalState::new(Key::new(7i64, Timestamp::from_millis(5)), "on");
        assert_eq!(state.name(), &Val::Long(7));
        assert_eq!(state.effective_time(), Timestamp::from_millis(5));
        assert_eq!(state.value, Val::String("on".into()));
    }
}
