//! Sequence-assigned dictionary
//!
//! Two tables per dictionary:
//! - `<name>_uid`: id -> content
//! - `<name>_uid_index`: content -> id
//!
//! Ids are 4-byte big-endian integers taken from a counter persisted in the
//! meta table under `<name>.next_uid`. Entries are never removed.
//!
//! Content of any length can be stored. The variable encodings route content
//! longer than `max_key_length` to the hash dictionary instead, see
//! [`UidLookup::prefers`].

use crate::env::{Txn, META_TABLE};
use crate::writer::WriteContext;
use planb_core::{Error, Limits, Result};
use tracing::trace;

/// Width of a UID in bytes
pub const UID_WIDTH: usize = 4;

/// UID dictionary
#[derive(Debug, Clone)]
pub struct UidLookup {
    table: String,
    index_table: String,
    counter_key: Vec<u8>,
    limits: Limits,
}

impl UidLookup {
    /// Dictionary `name`; `limits.max_key_length` only affects [`Self::prefers`]
    pub fn new(name: &str, limits: Limits) -> Self {
        UidLookup {
            table: format!("{name}_uid"),
            index_table: format!("{name}_uid_index"),
            counter_key: format!("{name}.next_uid").into_bytes(),
            limits,
        }
    }

    /// Tables this dictionary stores entries in
    pub fn tables(&self) -> [&str; 2] {
        [&self.table, &self.index_table]
    }

    /// Whether a variable encoding should store `content` here rather than
    /// in the hash dictionary
    pub fn prefers(&self, content: &[u8]) -> bool {
        content.len() <= self.limits.max_key_length
    }

    /// Id of `content`, assigning the next id if it is new
    pub fn put(&self, ctx: &mut WriteContext<'_>, content: &[u8]) -> Result<u32> {
        let txn = Txn::Write(ctx.txn);
        if let Some(id) = txn.get(&self.index_table, content)? {
            return decode_id(&id);
        }

        let next = match txn.get(META_TABLE, &self.counter_key)? {
            Some(bytes) => decode_id(&bytes)?,
            None => 0,
        };
        let following = next
            .checked_add(1)
            .ok_or_else(|| Error::Storage(format!("{} ids exhausted", self.table)))?;

        let id = next.to_be_bytes();
        ctx.put(&self.table, &id, content, true)?;
        ctx.put(&self.index_table, content, &id, true)?;
        ctx.put(META_TABLE, &self.counter_key, &following.to_be_bytes(), true)?;
        trace!(target: "planb::lookup", table = %self.table, id = next, "Assigned uid");
        Ok(next)
    }

    /// Id of `content` without assigning one
    pub fn find(&self, txn: Txn<'_>, content: &[u8]) -> Result<Option<u32>> {
        txn.get(&self.index_table, content)?
            .map(|id| decode_id(&id))
            .transpose()
    }

    /// Content stored under `id`
    pub fn get(&self, txn: Txn<'_>, id: u32) -> Result<Vec<u8>> {
        txn.get(&self.table, &id.to_be_bytes())?
            .ok_or_else(|| Error::corruption(format!("{} has no entry {id}", self.table)))
    }
}

/// Read a 4-byte big-endian id
pub fn decode_id(bytes: &[u8]) -> Result<u32> {
    let array: [u8; UID_WIDTH] = bytes
        .get(..UID_WIDTH)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| Error::corruption(format!("uid of {} bytes", bytes.len())))?;
    Ok(u32::from_be_bytes(array))
}
