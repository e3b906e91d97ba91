//! Marking stored records as resolved.

use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::store::RecordStore;
use crate::value::Record;

impl RecordStore {
    /// Replace the record under `key` with a tombstone and return what was
    /// stored before (`None` if the key was already resolved).
    ///
    /// Resolution is one-way. Call this only after the calendar has
    /// confirmed the submission.
    pub fn mark_resolved(&self, key: &str) -> SyncResult<Option<Record>> {
        let mut store = self.load()?;

        let entry = store
            .get_mut(key)
            .ok_or_else(|| SyncError::UnknownKey(key.to_string()))?;
        let prior = entry.take();

        self.save(&store)?;

        debug!(key, was_pending = prior.is_some(), "marked record resolved");
        Ok(prior)
    }
}
