//! Smoke test of the re-exported API

use planb::{
    CancellationToken, Condition, EncodingType, Field, Key, SearchCriteria, TemporalStore,
    Timestamp, Val,
};
use tempfile::TempDir;

#[test]
fn test_store_through_facade() {
    let temp_dir = TempDir::new().unwrap();
    let store = TemporalStore::builder()
        .path(temp_dir.path())
        .key_type(EncodingType::String)
        .open()
        .unwrap();

    for (t, v) in [(10, "a"), (20, "a"), (30, "b")] {
        store
            .insert(&Key::new("meter", Timestamp::from_millis(t)), &Val::from(v))
            .unwrap();
    }
    store
        .condense(
            Timestamp::from_millis(25),
            Timestamp::from_millis(0),
            &CancellationToken::new(),
        )
        .unwrap();

    let mut rows = Vec::new();
    let criteria = SearchCriteria::for_name("meter").with(Condition::equals(Field::Value, "a"));
    store
        .search(&criteria, &[Field::EffectiveTime], |row| {
            rows.push(row);
            true
        })
        .unwrap();
    assert_eq!(rows, vec![vec![Val::Date(20)]]);
}
