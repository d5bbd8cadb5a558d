//! Scoped writer handed to [`super::TemporalStore::write`] closures

use planb_core::{Key, Result, TemporalState, Val};
use planb_storage::{RecordCodec, Writer, STATE_TABLE};

/// Writes records through the store's codecs in batches
///
/// Batches commit when they reach the configured entry count or age; the
/// remainder commits when the closure returns `Ok`.
pub struct StoreWriter<'s> {
    pub(crate) writer: Writer<'s>,
    pub(crate) codec: &'s RecordCodec,
    pub(crate) overwrite: bool,
}

impl StoreWriter<'_> {
    /// Insert `value` under `key`
    ///
    /// Returns whether the stored state changed: inserting an identical
    /// record, or an existing key with overwrite disabled, leaves it as is.
    pub fn insert(&mut self, key: &Key, value: &Val) -> Result<bool> {
        let changed = {
            let (mut ctx, buffers) = self.writer.split()?;
            self.codec.key.encode(&mut ctx, key, &mut buffers.key)?;
            self.codec.value.encode(&mut ctx, value, &mut buffers.value)?;
            ctx.put(STATE_TABLE, &buffers.key, &buffers.value, self.overwrite)?
        };
        self.writer.record_change();
        self.writer.try_commit()?;
        Ok(changed)
    }

    /// Insert a [`TemporalState`]
    pub fn insert_state(&mut self, state: &TemporalState) -> Result<bool> {
        self.insert(&state.key, &state.value)
    }

    /// Store an already encoded record
    pub(crate) fn put_raw(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        let changed = {
            let (mut ctx, _) = self.writer.split()?;
            ctx.put(STATE_TABLE, key, value, self.overwrite)?
        };
        self.writer.record_change();
        self.writer.try_commit()?;
        Ok(changed)
    }

    /// Remove an encoded record
    pub(crate) fn delete_raw(&mut self, key: &[u8]) -> Result<bool> {
        let existed = {
            let (mut ctx, _) = self.writer.split()?;
            ctx.delete(STATE_TABLE, key)?
        };
        self.writer.record_change();
        self.writer.try_commit()?;
        Ok(existed)
    }

    /// Commit the open batch now
    pub fn commit(&mut self) -> Result<()> {
        self.writer.commit()
    }

    /// Changes committed so far
    pub fn committed_changes(&self) -> u64 {
        self.writer.committed_changes()
    }
}
