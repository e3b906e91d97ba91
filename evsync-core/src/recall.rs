//! Picking unresolved records back out of the store.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{SyncError, SyncResult};
use crate::store::RecordStore;
use crate::value::Record;

impl RecordStore {
    /// Return a uniformly random unresolved record with its key.
    pub fn recall(&self) -> SyncResult<(String, Record)> {
        self.recall_with(&mut rand::thread_rng())
    }

    /// `recall` with an explicit random source.
    pub fn recall_with<R: Rng + ?Sized>(&self, rng: &mut R) -> SyncResult<(String, Record)> {
        let pending = self.pending()?;
        pending
            .choose(rng)
            .cloned()
            .ok_or(SyncError::EmptyStore)
    }

    /// Every unresolved record, in key order.
    pub fn pending(&self) -> SyncResult<Vec<(String, Record)>> {
        Ok(self
            .load()?
            .into_iter()
            .filter_map(|(key, entry)| entry.map(|record| (key, record)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::temp_store;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn event(id: &str) -> Record {
        let mut r = Record::new();
        r.insert("id".into(), id.into());
        r
    }

    #[test]
    fn test_recall_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        assert!(matches!(store.recall(), Err(SyncError::EmptyStore)));
    }

    #[test]
    fn test_recall_all_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store.intern(&[event("a"), event("b")], "id").unwrap();
        store.mark_resolved("a").unwrap();
        store.mark_resolved("b").unwrap();

        assert!(matches!(store.recall(), Err(SyncError::EmptyStore)));
    }

    #[test]
    fn test_recall_never_returns_tombstones() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store
            .intern(&[event("a"), event("b"), event("c")], "id")
            .unwrap();
        store.mark_resolved("b").unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let (key, record) = store.recall_with(&mut rng).unwrap();
            assert_ne!(key, "b");
            assert_eq!(record, event(&key));
            seen.insert(key);
        }
        assert_eq!(seen, HashSet::from(["a".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_pending_in_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store
            .intern(&[event("c"), event("a"), event("b")], "id")
            .unwrap();
        store.mark_resolved("b").unwrap();

        let keys: Vec<_> = store.pending().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }
}
