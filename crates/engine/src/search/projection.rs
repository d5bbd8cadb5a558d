//! Lazily decoded view of one stored record

use super::criteria::Field;
use once_cell::unsync::OnceCell;
use planb_core::{Result, Val};
use planb_storage::{RecordCodec, Txn};

/// Raw record whose fields are decoded on first access
///
/// Conditions and projections touching the same field share one decode;
/// fields nobody asks for are never decoded.
pub(crate) struct LazyEntry<'a> {
    codec: &'a RecordCodec,
    txn: Txn<'a>,
    key: &'a [u8],
    value: &'a [u8],
    name: OnceCell<Val>,
    time: OnceCell<Val>,
    value_type: OnceCell<Val>,
    decoded: OnceCell<Val>,
}

impl<'a> LazyEntry<'a> {
    pub(crate) fn new(codec: &'a RecordCodec, txn: Txn<'a>, key: &'a [u8], value: &'a [u8]) -> Self {
        LazyEntry {
            codec,
            txn,
            key,
            value,
            name: OnceCell::new(),
            time: OnceCell::new(),
            value_type: OnceCell::new(),
            decoded: OnceCell::new(),
        }
    }

    pub(crate) fn get(&self, field: Field) -> Result<&Val> {
        match field {
            Field::Key => self.name.get_or_try_init(|| -> Result<Val> {
                Ok(self.codec.key.decode(self.txn, self.key)?.name)
            }),
            Field::EffectiveTime => self.time.get_or_try_init(|| -> Result<Val> {
                let millis = self.codec.key.decode_time(self.key)?.as_millis();
                Ok(Val::Date(i64::try_from(millis).unwrap_or(i64::MAX)))
            }),
            Field::ValueType => self.value_type.get_or_try_init(|| -> Result<Val> {
                let kind = self.codec.value.decode_type(self.value)?;
                Ok(Val::String(kind.name().to_string()))
            }),
            Field::Value => self
                .decoded
                .get_or_try_init(|| self.codec.value.decode(self.txn, self.value)),
        }
    }

    pub(crate) fn project(&self, fields: &[Field]) -> Result<Vec<Val>> {
        fields.iter().map(|&f| self.get(f).cloned()).collect()
    }
}
