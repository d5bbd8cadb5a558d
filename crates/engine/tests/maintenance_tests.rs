//! Integration tests for merge, condense and dictionary behaviour
//!
//! These tests verify:
//! - Condense removes old and repeated history per name
//! - Merge copies plain records and re-encodes dictionary records
//! - The merge source is deleted only after a successful merge
//! - Dictionaries deduplicate and survive forced hash collisions
//! - Cancellation leaves committed work in place

use planb_core::{Error, Key, Timestamp, Val};
use planb_engine::{CancellationToken, StoreSettings, TemporalStore};
use planb_storage::lookup::HashLookup;
use planb_storage::{EncodingType, HashLength, VALUES_DICTIONARY};
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn ms(t: u64) -> Timestamp {
    Timestamp::from_millis(t)
}

fn open(path: &Path, key_type: EncodingType, value_type: EncodingType) -> TemporalStore {
    TemporalStore::builder()
        .path(path)
        .key_type(key_type)
        .value_type(value_type)
        .open()
        .unwrap()
}

fn history(store: &TemporalStore, name: impl Into<Val>) -> Vec<(u64, Val)> {
    store
        .history(&name.into())
        .unwrap()
        .into_iter()
        .map(|s| (s.effective_time().as_millis(), s.value))
        .collect()
}

fn abc_store(path: &Path) -> TemporalStore {
    let store = TemporalStore::open(path, StoreSettings::default()).unwrap();
    store.insert(&Key::new("n", ms(10)), &Val::from("a")).unwrap();
    store.insert(&Key::new("n", ms(20)), &Val::from("a")).unwrap();
    store.insert(&Key::new("n", ms(30)), &Val::from("b")).unwrap();
    store
}

// ============================================================================
// Condense
// ============================================================================

#[test]
fn test_condense_collapses_repeats() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let store = abc_store(temp_dir.path());

    let stats = store
        .condense(ms(25), ms(5), &CancellationToken::new())
        .unwrap();
    assert_eq!(stats.condensed, 1);
    assert_eq!(stats.deleted, 0);
    assert_eq!(
        history(&store, "n"),
        vec![(20, Val::from("a")), (30, Val::from("b"))]
    );
    assert_eq!(
        store.get_state(&Val::from("n"), ms(25)).unwrap().unwrap().value,
        Val::from("a")
    );
}

#[test]
fn test_condense_deletes_before_horizon() {
    let temp_dir = TempDir::new().unwrap();
    let store = abc_store(temp_dir.path());

    let stats = store
        .condense(ms(25), ms(15), &CancellationToken::new())
        .unwrap();
    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.condensed, 0);
    assert_eq!(
        history(&store, "n"),
        vec![(20, Val::from("a")), (30, Val::from("b"))]
    );
    assert_eq!(store.get_state(&Val::from("n"), ms(15)).unwrap(), None);
}

#[test]
fn test_condense_is_repeatable() {
    let temp_dir = TempDir::new().unwrap();
    let store = abc_store(temp_dir.path());
    let cancel = CancellationToken::new();
    store.condense(ms(25), ms(5), &cancel).unwrap();
    let again = store.condense(ms(25), ms(5), &cancel).unwrap();
    assert_eq!(again.removed(), 0);
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn test_condense_then_compact() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = TemporalStore::open(temp_dir.path(), StoreSettings::default()).unwrap();
    for i in 0..500 {
        store.insert(&Key::new("n", ms(i)), &Val::from("same")).unwrap();
    }
    let stats = store
        .condense(ms(1_000), ms(0), &CancellationToken::new())
        .unwrap();
    assert_eq!(stats.condensed, 499);
    store.compact().unwrap();
    assert_eq!(history(&store, "n"), vec![(499, Val::from("same"))]);
}

#[test]
fn test_condense_cancelled() {
    let temp_dir = TempDir::new().unwrap();
    let store = abc_store(temp_dir.path());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = store.condense(ms(25), ms(15), &cancel);
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(store.count().unwrap(), 3);
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn test_merge_plain_stores() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let dest = open(&temp_dir.path().join("dest"), EncodingType::Long, EncodingType::Double);
    dest.insert(&Key::new(Val::Long(1), ms(10)), &Val::Double(1.0)).unwrap();
    {
        let source = open(&temp_dir.path().join("src"), EncodingType::Long, EncodingType::Double);
        source.insert(&Key::new(Val::Long(1), ms(20)), &Val::Double(2.0)).unwrap();
        source.insert(&Key::new(Val::Long(2), ms(10)), &Val::Double(3.0)).unwrap();
    }

    let stats = dest
        .merge(temp_dir.path().join("src"), &CancellationToken::new())
        .unwrap();
    assert_eq!(stats.copied, 2);
    assert_eq!(stats.reencoded, 0);
    assert!(!temp_dir.path().join("src").exists());

    assert_eq!(dest.count().unwrap(), 3);
    assert_eq!(
        history(&dest, Val::Long(1)),
        vec![(10, Val::Double(1.0)), (20, Val::Double(2.0))]
    );
}

#[test]
fn test_merge_dictionary_stores() {
    let temp_dir = TempDir::new().unwrap();
    let dest = open(
        &temp_dir.path().join("dest"),
        EncodingType::UidLookup,
        EncodingType::HashLookup,
    );
    dest.insert(&Key::new("d1", ms(10)), &Val::from("dest value")).unwrap();
    {
        let source = open(
            &temp_dir.path().join("src"),
            EncodingType::UidLookup,
            EncodingType::HashLookup,
        );
        // ids 0 and 1 in the source; "d1" holds id 0 in the destination
        source.insert(&Key::new("s1", ms(10)), &Val::from("source value")).unwrap();
        source.insert(&Key::new("d1", ms(20)), &Val::from("dest value")).unwrap();
        source.insert(&Key::new("s2", ms(10)), &Val::Null).unwrap();
    }

    let stats = dest
        .merge(temp_dir.path().join("src"), &CancellationToken::new())
        .unwrap();
    assert_eq!(stats.merged(), 3);
    assert_eq!(stats.reencoded, 3);

    assert_eq!(
        history(&dest, "d1"),
        vec![(10, Val::from("dest value")), (20, Val::from("dest value"))]
    );
    assert_eq!(history(&dest, "s1"), vec![(10, Val::from("source value"))]);
    assert_eq!(history(&dest, "s2"), vec![(10, Val::Null)]);

    let info = dest.info().unwrap();
    assert_eq!(info.tables["keys_uid"], 3);
    assert_eq!(info.tables["values_hash"], 2);
}

#[test]
fn test_merge_schema_mismatch_keeps_source() {
    let temp_dir = TempDir::new().unwrap();
    let dest = open(&temp_dir.path().join("dest"), EncodingType::Long, EncodingType::Double);
    drop(open(&temp_dir.path().join("src"), EncodingType::Int, EncodingType::Double));

    let result = dest.merge(temp_dir.path().join("src"), &CancellationToken::new());
    assert!(matches!(result, Err(Error::SchemaMismatch(_))));
    assert!(temp_dir.path().join("src").exists());
}

#[test]
fn test_merge_cancelled_keeps_source() {
    let temp_dir = TempDir::new().unwrap();
    let dest = TemporalStore::open(temp_dir.path().join("dest"), StoreSettings::default()).unwrap();
    drop(abc_store(&temp_dir.path().join("src")));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = dest.merge(temp_dir.path().join("src"), &cancel);
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(temp_dir.path().join("src").exists());
    assert_eq!(dest.count().unwrap(), 0);

    // the source is still intact and can be merged later
    let stats = dest
        .merge(temp_dir.path().join("src"), &CancellationToken::new())
        .unwrap();
    assert_eq!(stats.merged(), 3);
}

// ============================================================================
// Dictionaries
// ============================================================================

#[test]
fn test_values_are_deduplicated() {
    let temp_dir = TempDir::new().unwrap();
    let store = open(temp_dir.path(), EncodingType::String, EncodingType::UidLookup);
    let shared = Val::from("a long and frequently repeated value".repeat(4));
    for i in 0..100 {
        store.insert(&Key::new(format!("n{i}"), ms(1)), &shared).unwrap();
    }
    store.insert(&Key::new("other", ms(1)), &Val::from("unique")).unwrap();

    let info = store.info().unwrap();
    assert_eq!(info.entries(), 101);
    assert_eq!(info.tables["values_uid"], 2);
    assert_eq!(info.tables["values_uid_index"], 2);
    assert_eq!(store.get(&Key::new("n57", ms(1))).unwrap(), Some(shared));
}

/// Two strings whose short hash ids collide
fn colliding_strings(lookup: &HashLookup) -> (String, String) {
    let mut seen: HashMap<u64, String> = HashMap::new();
    for i in 0u64.. {
        let candidate = format!("value-{i}");
        let id = lookup.base_id(&content_of(&candidate));
        if let Some(first) = seen.insert(id, candidate.clone()) {
            return (first, candidate);
        }
    }
    unreachable!("u64 candidates exhausted")
}

/// Dictionary content of a string value: its payload bytes
fn content_of(text: &str) -> Vec<u8> {
    let mut content = Vec::new();
    planb_storage::codec::value::encode_payload(&Val::from(text), &mut content);
    content
}

#[test]
fn test_forced_hash_collision_is_probed() {
    let temp_dir = TempDir::new().unwrap();
    let store = TemporalStore::builder()
        .path(temp_dir.path())
        .value_type(EncodingType::HashLookup)
        .hash_length(HashLength::Short)
        .open()
        .unwrap();
    let (first, second) =
        colliding_strings(&HashLookup::new(VALUES_DICTIONARY, HashLength::Short));

    store.insert(&Key::new("a", ms(1)), &Val::from(first.as_str())).unwrap();
    store.insert(&Key::new("b", ms(1)), &Val::from(second.as_str())).unwrap();
    store.insert(&Key::new("c", ms(1)), &Val::from(first.as_str())).unwrap();

    assert_eq!(store.get(&Key::new("a", ms(1))).unwrap(), Some(Val::from(first.as_str())));
    assert_eq!(store.get(&Key::new("b", ms(1))).unwrap(), Some(Val::from(second.as_str())));
    assert_eq!(store.get(&Key::new("c", ms(1))).unwrap(), Some(Val::from(first)));

    let info = store.info().unwrap();
    assert_eq!(info.tables["values_hash"], 2);
    assert_eq!(info.hash_clashes.get(VALUES_DICTIONARY), Some(&1));
}
