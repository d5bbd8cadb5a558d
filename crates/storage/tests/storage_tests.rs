//! Integration tests for the storage layer
//!
//! These tests drive the public codec, dictionary and writer API against a
//! real redb environment:
//! - Dictionary counters survive reopening the environment
//! - Encoded keys sort by name, then by time, in the state table
//! - Batched writers respect their limits

use planb_core::{Error, Key, Limits, Timestamp, Val};
use planb_storage::env::bytes_table;
use planb_storage::{
    BatchLimits, Dictionary, EncodingType, HashLength, PlanbEnv, RecordCodec, TemporalPrecision,
    Txn, KEYS_DICTIONARY, STATE_TABLE, VALUES_DICTIONARY,
};
use proptest::prelude::*;
use redb::ReadableTable;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn dictionaries() -> (Dictionary, Dictionary) {
    (
        Dictionary::new(KEYS_DICTIONARY, HashLength::Long, Limits::default()),
        Dictionary::new(VALUES_DICTIONARY, HashLength::Long, Limits::default()),
    )
}

fn open_env(dir: &TempDir, keys: &Dictionary, values: &Dictionary) -> PlanbEnv {
    let mut tables = keys.tables_for(EncodingType::Variable);
    tables.extend(values.tables_for(EncodingType::Variable));
    PlanbEnv::open(dir.path(), &tables).unwrap()
}

fn record_codec(key_type: EncodingType) -> RecordCodec {
    let (keys, values) = dictionaries();
    RecordCodec::new(
        key_type,
        &keys,
        EncodingType::Variable,
        &values,
        TemporalPrecision::Millisecond,
        Limits::default(),
    )
}

/// Insert records and return the keys in table order, decoded
fn stored_order(key_type: EncodingType, keys: &[Key]) -> Vec<Key> {
    let dir = TempDir::new().unwrap();
    let (k, v) = dictionaries();
    let env = open_env(&dir, &k, &v);
    let codec = record_codec(key_type);

    let mut writer = env.writer(BatchLimits::default()).unwrap();
    for key in keys {
        let (mut ctx, buffers) = writer.split().unwrap();
        codec.key.encode(&mut ctx, key, &mut buffers.key).unwrap();
        codec.value.encode(&mut ctx, &Val::Null, &mut buffers.value).unwrap();
        ctx.put(STATE_TABLE, &buffers.key, &buffers.value, true).unwrap();
    }
    writer.commit().unwrap();

    let txn = env.begin_read().unwrap();
    let table = txn.open_table(bytes_table(STATE_TABLE)).unwrap();
    table
        .iter()
        .unwrap()
        .map(|entry| {
            let (key, _) = entry.unwrap();
            codec.key.decode(Txn::Read(&txn), key.value()).unwrap()
        })
        .collect()
}

// ============================================================================
// Dictionaries
// ============================================================================

#[test]
fn test_uid_counter_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let (keys, values) = dictionaries();
    {
        let env = open_env(&dir, &keys, &values);
        let mut writer = env.writer(BatchLimits::default()).unwrap();
        {
            let (mut ctx, _) = writer.split().unwrap();
            assert_eq!(keys.uid.put(&mut ctx, b"a").unwrap(), 0);
            assert_eq!(keys.uid.put(&mut ctx, b"b").unwrap(), 1);
            assert_eq!(values.uid.put(&mut ctx, b"a").unwrap(), 0);
        }
        writer.commit().unwrap();
    }

    let env = open_env(&dir, &keys, &values);
    let mut writer = env.writer(BatchLimits::default()).unwrap();
    {
        let (mut ctx, _) = writer.split().unwrap();
        assert_eq!(keys.uid.put(&mut ctx, b"c").unwrap(), 2);
        assert_eq!(keys.uid.put(&mut ctx, b"a").unwrap(), 0);
    }
    writer.commit().unwrap();

    let txn = env.begin_read().unwrap();
    assert_eq!(keys.uid.find(Txn::Read(&txn), b"b").unwrap(), Some(1));
    assert_eq!(keys.uid.get(Txn::Read(&txn), 2).unwrap(), b"c".to_vec());
    assert_eq!(values.uid.find(Txn::Read(&txn), b"c").unwrap(), None);
}

#[test]
fn test_aborted_batch_assigns_nothing() {
    let dir = TempDir::new().unwrap();
    let (keys, values) = dictionaries();
    let env = open_env(&dir, &keys, &values);

    let mut writer = env.writer(BatchLimits::default()).unwrap();
    {
        let (mut ctx, _) = writer.split().unwrap();
        keys.uid.put(&mut ctx, b"a").unwrap();
        keys.hash.put(&mut ctx, b"a").unwrap();
    }
    writer.abort().unwrap();

    let txn = env.begin_read().unwrap();
    assert_eq!(keys.uid.find(Txn::Read(&txn), b"a").unwrap(), None);
    assert_eq!(keys.hash.find(Txn::Read(&txn), b"a").unwrap(), None);
}

// ============================================================================
// Key order
// ============================================================================

#[test]
fn test_same_name_sorted_by_time() {
    let keys: Vec<Key> = [30u64, 10, 20, 0]
        .iter()
        .map(|&t| Key::new("n", Timestamp::from_millis(t)))
        .collect();
    let times: Vec<u64> = stored_order(EncodingType::Variable, &keys)
        .iter()
        .map(|k| k.effective_time.as_millis())
        .collect();
    assert_eq!(times, vec![0, 10, 20, 30]);
}

#[test]
fn test_dictionary_names_stay_grouped() {
    let long = "x".repeat(60);
    let keys = vec![
        Key::new(long.as_str(), Timestamp::from_millis(2)),
        Key::new("short", Timestamp::from_millis(1)),
        Key::new(long.as_str(), Timestamp::from_millis(1)),
        Key::new("short", Timestamp::from_millis(2)),
    ];
    let order = stored_order(EncodingType::Variable, &keys);
    assert_eq!(order.len(), 4);
    for pair in order.chunks(2) {
        assert_eq!(pair[0].name, pair[1].name);
        assert!(pair[0].effective_time < pair[1].effective_time);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_long_keys_sort_by_name_then_time(
        entries in proptest::collection::btree_set((any::<i64>(), 0u64..1_000_000), 1..40)
    ) {
        let keys: Vec<Key> = entries
            .iter()
            .rev()
            .map(|&(name, t)| Key::new(Val::Long(name), Timestamp::from_millis(t)))
            .collect();
        let expected: Vec<Key> = entries
            .iter()
            .map(|&(name, t)| Key::new(Val::Long(name), Timestamp::from_millis(t)))
            .collect();
        prop_assert_eq!(stored_order(EncodingType::Long, &keys), expected);
    }
}

// ============================================================================
// Writer limits
// ============================================================================

#[test]
fn test_writer_commits_by_age() {
    let dir = TempDir::new().unwrap();
    let (keys, values) = dictionaries();
    let env = open_env(&dir, &keys, &values);
    let limits = BatchLimits {
        max_age: Duration::ZERO,
        ..BatchLimits::default()
    };
    let mut writer = env.writer(limits).unwrap();
    {
        let (mut ctx, _) = writer.split().unwrap();
        ctx.put(STATE_TABLE, b"k", b"v", true).unwrap();
    }
    writer.record_change();
    assert!(writer.try_commit().unwrap());
    assert_eq!(writer.committed_changes(), 1);
    assert!(!writer.try_commit().unwrap());
}

#[test]
fn test_writer_refuses_full_store() {
    let dir = TempDir::new().unwrap();
    let (keys, values) = dictionaries();
    let env = open_env(&dir, &keys, &values);
    let limits = BatchLimits {
        max_store_size: 1,
        ..BatchLimits::default()
    };
    let mut writer = env.writer(limits).unwrap();
    assert!(matches!(writer.split(), Err(Error::StoreFull { max: 1, .. })));
}

#[test]
fn test_read_only_env_refuses_writers() {
    let dir = TempDir::new().unwrap();
    let (keys, values) = dictionaries();
    drop(open_env(&dir, &keys, &values));

    let env = PlanbEnv::open_read_only(dir.path()).unwrap();
    assert!(env.is_read_only());
    assert!(matches!(
        env.writer(BatchLimits::default()),
        Err(Error::ReadOnly(_))
    ));
}
