//! Predicate search over stored records
//!
//! This module contains:
//! - `criteria`: fields, operators, conditions and search criteria
//! - `projection`: lazily decoded record view used while evaluating them
//!
//! A search scans the state table in key order, bounded to one name when the
//! criteria name one, and pushes the requested fields of every matching record
//! to a consumer until the consumer returns `false`.

mod criteria;
mod projection;

pub use criteria::{Condition, Field, Operator, SearchCriteria};

use crate::store::TemporalStore;
use planb_core::{Result, Val};
use planb_storage::env::bytes_table;
use planb_storage::{StorageResultExt, Txn, STATE_TABLE};
use projection::LazyEntry;
use tracing::debug;

impl TemporalStore {
    /// Stream the `fields` of every record matching `criteria`
    ///
    /// Rows arrive in key order: by name, then by effective time. Returns the
    /// number of rows handed to `consumer`.
    ///
    /// # Example
    /// ```ignore
    /// let criteria = SearchCriteria::for_name("meter-1")
    ///     .with(Condition::new(Field::Value, Operator::GreaterThan, 100));
    /// let mut rows = Vec::new();
    /// store.search(&criteria, &[Field::EffectiveTime, Field::Value], |row| {
    ///     rows.push(row);
    ///     true
    /// })?;
    /// ```
    pub fn search<F>(&self, criteria: &SearchCriteria, fields: &[Field], mut consumer: F) -> Result<u64>
    where
        F: FnMut(Vec<Val>) -> bool,
    {
        let txn = self.env().begin_read()?;
        let codec = self.codec();
        let mut prefix = Vec::new();
        if let Some(name) = &criteria.name {
            if !codec.key.encode_name(Txn::Read(&txn), name, &mut prefix)? {
                return Ok(0);
            }
        }

        let table = txn.open_table(bytes_table(STATE_TABLE)).storage_err()?;
        let mut scanned = 0u64;
        let mut rows = 0u64;
        for entry in table.range::<&[u8]>(prefix.as_slice()..).storage_err()? {
            let (k, v) = entry.storage_err()?;
            if !k.value().starts_with(&prefix) {
                break;
            }
            scanned += 1;
            let record = LazyEntry::new(codec, Txn::Read(&txn), k.value(), v.value());
            if !satisfies(&record, &criteria.conditions)? {
                continue;
            }
            rows += 1;
            if !consumer(record.project(fields)?) {
                break;
            }
        }
        debug!(target: "planb::store", scanned, rows, "Search finished");
        Ok(rows)
    }
}

fn satisfies(record: &LazyEntry<'_>, conditions: &[Condition]) -> Result<bool> {
    for condition in conditions {
        if !condition.matches(record.get(condition.field)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreSettings;
    use planb_core::{Key, Timestamp};
    use tempfile::TempDir;

    fn ms(t: u64) -> Timestamp {
        Timestamp::from_millis(t)
    }

    fn populated(dir: &TempDir) -> TemporalStore {
        let store = TemporalStore::open(dir.path(), StoreSettings::default()).unwrap();
        store.insert(&Key::new("b", ms(10)), &Val::Int(1)).unwrap();
        store.insert(&Key::new("a", ms(20)), &Val::from("x")).unwrap();
        store.insert(&Key::new("a", ms(10)), &Val::Null).unwrap();
        store.insert(&Key::new("b", ms(30)), &Val::Int(7)).unwrap();
        store
    }

    fn collect(store: &TemporalStore, criteria: &SearchCriteria, fields: &[Field]) -> Vec<Vec<Val>> {
        let mut rows = Vec::new();
        store
            .search(criteria, fields, |row| {
                rows.push(row);
                true
            })
            .unwrap();
        rows
    }

    #[test]
    fn full_scan_in_key_order() {
        let dir = TempDir::new().unwrap();
        let store = populated(&dir);
        let rows = collect(&store, &SearchCriteria::all(), &Field::ALL);
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0],
            vec![Val::from("a"), Val::Date(10), Val::from("null"), Val::Null]
        );
        assert_eq!(rows[3][0], Val::from("b"));
        assert_eq!(rows[3][3], Val::Int(7));
    }

    #[test]
    fn name_bounded_scan() {
        let dir = TempDir::new().unwrap();
        let store = populated(&dir);
        let rows = collect(&store, &SearchCriteria::for_name("b"), &[Field::EffectiveTime]);
        assert_eq!(rows, vec![vec![Val::Date(10)], vec![Val::Date(30)]]);
        assert!(collect(&store, &SearchCriteria::for_name("zzz"), &Field::ALL).is_empty());
    }

    #[test]
    fn conditions_filter_rows() {
        let dir = TempDir::new().unwrap();
        let store = populated(&dir);
        let criteria = SearchCriteria::all()
            .with(Condition::equals(Field::ValueType, "integer"))
            .with(Condition::new(Field::Value, Operator::GreaterThan, 3));
        let rows = collect(&store, &criteria, &[Field::Key, Field::Value]);
        assert_eq!(rows, vec![vec![Val::from("b"), Val::Int(7)]]);

        let nulls = SearchCriteria::all().with(Condition::is_null(Field::Value));
        assert_eq!(collect(&store, &nulls, &[Field::Key]), vec![vec![Val::from("a")]]);
    }

    #[test]
    fn effective_time_is_projected_in_millis() {
        let dir = TempDir::new().unwrap();
        let settings = StoreSettings {
            temporal_precision: planb_storage::TemporalPrecision::Nanosecond,
            ..StoreSettings::default()
        };
        let store = TemporalStore::open(dir.path(), settings).unwrap();
        let exact = Timestamp::from_nanos(20_000_999);
        store.insert(&Key::new("n", exact), &Val::Int(1)).unwrap();

        let rows = collect(&store, &SearchCriteria::all(), &[Field::EffectiveTime]);
        assert_eq!(rows, vec![vec![Val::Date(20)]]);
        let at_millis = SearchCriteria::all().with(Condition::equals(Field::EffectiveTime, Val::Date(20)));
        assert_eq!(collect(&store, &at_millis, &[Field::Key]).len(), 1);

        let history = store.history(&Val::from("n")).unwrap();
        assert_eq!(history[0].effective_time(), exact);
    }

    #[test]
    fn consumer_stops_the_scan() {
        let dir = TempDir::new().unwrap();
        let store = populated(&dir);
        let mut seen = 0;
        let rows = store
            .search(&SearchCriteria::all(), &[Field::Key], |_| {
                seen += 1;
                seen < 2
            })
            .unwrap();
        assert_eq!(rows, 2);
        assert_eq!(seen, 2);
    }
}
