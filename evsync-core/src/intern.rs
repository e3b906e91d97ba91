//! Merging fetched records into the store.

use tracing::info;

use crate::error::SyncResult;
use crate::store::RecordStore;
use crate::value::{Record, Store, record_key};

/// Result of an intern call: the merged store and the keys it gained.
#[derive(Debug, Clone, PartialEq)]
pub struct InternOutcome {
    pub store: Store,
    /// Newly inserted keys, in batch order.
    pub added: Vec<String>,
}

impl RecordStore {
    /// Insert every record whose key is not in the store yet and return the
    /// full merged store.
    ///
    /// Existing entries, resolved or not, are never overwritten. Within a
    /// batch the first record with a given key wins.
    pub fn intern(&self, records: &[Record], key_field: &str) -> SyncResult<Store> {
        Ok(self.intern_new(records, key_field)?.store)
    }

    /// Like `intern`, but also report which keys were added.
    pub fn intern_new(&self, records: &[Record], key_field: &str) -> SyncResult<InternOutcome> {
        // Keys are checked for the whole batch before anything is written.
        let keyed = records
            .iter()
            .map(|record| Ok((record_key(record, key_field)?, record)))
            .collect::<SyncResult<Vec<_>>>()?;

        let mut store = self.load()?;
        let mut added = Vec::new();

        for (key, record) in keyed {
            if store.contains_key(&key) {
                continue;
            }
            // Stored as it will load back, so repeated calls agree.
            store.insert(key.clone(), Some(self.codec().normalize(record)));
            added.push(key);
        }

        self.save(&store)?;

        info!(
            fetched = records.len(),
            added = added.len(),
            total = store.len(),
            "interned records"
        );

        Ok(InternOutcome { store, added })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::store::tests::temp_store;
    use crate::value::Value;

    fn event(id: &str, title: &str) -> Record {
        let mut r = Record::new();
        r.insert("id".into(), id.into());
        r.insert("title".into(), title.into());
        r
    }

    #[test]
    fn test_intern_into_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        let merged = store.intern(&[event("a", "X")], "id").unwrap();

        let mut expected = Store::new();
        expected.insert("a".into(), Some(event("a", "X")));
        assert_eq!(merged, expected);
        assert_eq!(store.load().unwrap(), expected);
    }

    #[test]
    fn test_intern_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store.intern(&[event("a", "X")], "id").unwrap();

        let outcome = store.intern_new(&[event("a", "Y")], "id").unwrap();

        assert!(outcome.added.is_empty());
        assert_eq!(outcome.store["a"], Some(event("a", "X")));
    }

    #[test]
    fn test_intern_does_not_resurrect_tombstones() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store.intern(&[event("a", "X")], "id").unwrap();
        store.mark_resolved("a").unwrap();

        let merged = store.intern(&[event("a", "X")], "id").unwrap();
        assert_eq!(merged["a"], None);
    }

    #[test]
    fn test_intern_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let batch = vec![event("a", "X"), event("b", "Y")];

        let once = store.intern(&batch, "id").unwrap();
        let twice = store.intern(&batch, "id").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_intern_is_idempotent_for_undecoded_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let mut raw = event("a", "X");
        raw.insert("when".into(), Value::from("2025-03-20T15:00:00Z"));

        let once = store.intern(&[raw.clone()], "id").unwrap();
        let file_once = std::fs::read_to_string(store.path()).unwrap();
        let twice = store.intern(&[raw], "id").unwrap();
        let file_twice = std::fs::read_to_string(store.path()).unwrap();

        assert_eq!(once, twice);
        assert_eq!(once, store.load().unwrap());
        assert_eq!(file_once, file_twice);
        assert!(matches!(
            once["a"].as_ref().unwrap()["when"],
            Value::Timestamp(_)
        ));
    }

    #[test]
    fn test_first_duplicate_in_batch_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        let outcome = store
            .intern_new(&[event("a", "first"), event("b", "B"), event("a", "second")], "id")
            .unwrap();

        assert_eq!(outcome.added, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(outcome.store["a"], Some(event("a", "first")));
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store.intern(&[event("a", "X")], "id").unwrap();
        let before = store.load().unwrap();

        assert_eq!(store.intern(&[], "id").unwrap(), before);
        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn test_missing_key_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let mut keyless = Record::new();
        keyless.insert("title".into(), Value::from("no id"));

        let result = store.intern(&[event("a", "X"), keyless], "id");

        assert!(matches!(result, Err(SyncError::MissingKey { field }) if field == "id"));
        assert!(store.load().unwrap().is_empty());
    }
}
