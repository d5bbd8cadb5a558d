//! Content-hash dictionary
//!
//! Table `<name>_hash` maps an id derived from the content's xxh3 hash to the
//! content. Ids are 4 or 8 bytes wide depending on [`HashLength`].
//!
//! # Collisions
//!
//! When the slot for a content's hash holds different content the next slot
//! (`hash + 1`, wrapping within the id width) is tried, up to
//! [`MAX_HASH_PROBES`] slots. Reads follow the same sequence and stop at the
//! first empty slot. Entries are never removed, so the sequence stays intact.
//!
//! Every id assigned inside a write transaction is recorded in a
//! [`HashPending`]. Before the transaction commits each pending id is read
//! back and compared with its content; a mismatch fails the commit with
//! [`Error::HashCollision`]. Resolved clashes are counted in the meta table
//! under `<name>.hash_clashes`.

use crate::env::{Txn, META_TABLE};
use crate::error::StorageResultExt;
use crate::schema::HashLength;
use crate::writer::WriteContext;
use byteorder::{BigEndian, ByteOrder};
use planb_core::{Error, Result, MAX_HASH_PROBES};
use redb::{ReadableTable, WriteTransaction};
use std::collections::BTreeMap;
use tracing::warn;
use xxhash_rust::xxh3::xxh3_64;

/// Hash dictionary
#[derive(Debug, Clone)]
pub struct HashLookup {
    name: String,
    table: String,
    length: HashLength,
}

impl HashLookup {
    /// Dictionary `name` with ids of `length`
    pub fn new(name: &str, length: HashLength) -> Self {
        HashLookup {
            name: name.to_string(),
            table: format!("{name}_hash"),
            length,
        }
    }

    /// Table this dictionary stores entries in
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Id width in bytes
    pub fn width(&self) -> usize {
        self.length.width()
    }

    /// First slot tried for `content`
    pub fn base_id(&self, content: &[u8]) -> u64 {
        let hash = xxh3_64(content);
        match self.length {
            HashLength::Long => hash,
            HashLength::Short => u64::from((hash ^ (hash >> 32)) as u32),
        }
    }

    fn slot(&self, base: u64, probe: u64) -> u64 {
        match self.length {
            HashLength::Long => base.wrapping_add(probe),
            HashLength::Short => u64::from((base as u32).wrapping_add(probe as u32)),
        }
    }

    /// Append `id` in its stored width
    pub fn write_id(&self, id: u64, buf: &mut Vec<u8>) {
        let width = self.width();
        let mut scratch = [0u8; 8];
        BigEndian::write_uint(&mut scratch[..width], id, width);
        buf.extend_from_slice(&scratch[..width]);
    }

    /// Read an id from the front of `bytes`
    pub fn read_id(&self, bytes: &[u8]) -> Result<u64> {
        let width = self.width();
        if bytes.len() < width {
            return Err(Error::corruption(format!(
                "hash id of {} bytes, expected {width}",
                bytes.len()
            )));
        }
        Ok(BigEndian::read_uint(bytes, width))
    }

    fn id_bytes(&self, id: u64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.width());
        self.write_id(id, &mut buf);
        buf
    }

    /// Id of `content`, storing it in the first free slot if it is new
    pub fn put(&self, ctx: &mut WriteContext<'_>, content: &[u8]) -> Result<u64> {
        let base = self.base_id(content);
        let txn = Txn::Write(ctx.txn);
        for probe in 0..MAX_HASH_PROBES {
            let id = self.slot(base, probe);
            let key = self.id_bytes(id);
            match txn.get(&self.table, &key)? {
                Some(existing) if existing == content => return Ok(id),
                Some(_) => continue,
                None => {
                    ctx.put(&self.table, &key, content, true)?;
                    ctx.pending.record(&self.table, key, content);
                    if probe > 0 {
                        ctx.pending.record_clash(&self.name);
                        warn!(
                            target: "planb::lookup",
                            table = %self.table,
                            probes = probe,
                            "Hash clash resolved by probing"
                        );
                    }
                    return Ok(id);
                }
            }
        }
        Err(Error::HashCollision(format!(
            "{} has no free slot within {MAX_HASH_PROBES} probes of {base:#x}",
            self.table
        )))
    }

    /// Id of `content` without storing it
    pub fn find(&self, txn: Txn<'_>, content: &[u8]) -> Result<Option<u64>> {
        let base = self.base_id(content);
        for probe in 0..MAX_HASH_PROBES {
            let id = self.slot(base, probe);
            match txn.get(&self.table, &self.id_bytes(id))? {
                Some(existing) if existing == content => return Ok(Some(id)),
                Some(_) => continue,
                None => return Ok(None),
            }
        }
        Ok(None)
    }

    /// Content stored under `id`
    pub fn get(&self, txn: Txn<'_>, id: u64) -> Result<Vec<u8>> {
        txn.get(&self.table, &self.id_bytes(id))?
            .ok_or_else(|| Error::corruption(format!("{} has no entry {id:#x}", self.table)))
    }
}

#[derive(Debug)]
struct PendingEntry {
    table: String,
    id: Vec<u8>,
    content: Vec<u8>,
}

/// Hash ids assigned by the open write transaction
#[derive(Debug, Default)]
pub struct HashPending {
    entries: Vec<PendingEntry>,
    clashes: BTreeMap<String, u64>,
}

impl HashPending {
    /// Remember that `id` in `table` was assigned to `content`
    pub fn record(&mut self, table: &str, id: Vec<u8>, content: &[u8]) {
        self.entries.push(PendingEntry {
            table: table.to_string(),
            id,
            content: content.to_vec(),
        });
    }

    /// Count a clash in dictionary `name`
    pub fn record_clash(&mut self, name: &str) {
        *self.clashes.entry(name.to_string()).or_default() += 1;
    }

    /// Number of pending assignments
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every pending id still maps to its content
    pub fn verify(&self, txn: &WriteTransaction) -> Result<()> {
        let txn = Txn::Write(txn);
        for entry in &self.entries {
            let stored = txn.get(&entry.table, &entry.id)?;
            if stored.as_deref() != Some(entry.content.as_slice()) {
                return Err(Error::HashCollision(format!(
                    "{} id {:02x?} no longer maps to its content",
                    entry.table, entry.id
                )));
            }
        }
        Ok(())
    }

    /// Add the counted clashes to the totals in the meta table
    pub fn persist_clashes(&self, txn: &WriteTransaction) -> Result<()> {
        if self.clashes.is_empty() {
            return Ok(());
        }
        let mut meta = txn
            .open_table(crate::env::bytes_table(META_TABLE))
            .storage_err()?;
        for (name, count) in &self.clashes {
            let key = clash_key(name);
            let previous = meta
                .get(key.as_slice())
                .storage_err()?
                .map(|guard| read_counter(guard.value()))
                .unwrap_or(0);
            let total = previous + count;
            meta.insert(key.as_slice(), total.to_be_bytes().as_slice())
                .storage_err()?;
        }
        Ok(())
    }

    /// Forget everything; called after commit or abort
    pub fn clear(&mut self) {
        self.entries.clear();
        self.clashes.clear();
    }
}

/// Meta table key of the clash counter of dictionary `name`
pub fn clash_key(name: &str) -> Vec<u8> {
    format!("{name}.hash_clashes").into_bytes()
}

/// Decode a clash counter value
pub fn read_counter(bytes: &[u8]) -> u64 {
    if bytes.len() == 8 {
        BigEndian::read_u64(bytes)
    } else {
        0
    }
}
