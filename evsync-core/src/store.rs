//! Persisted record store.
//!
//! The store is a single JSON object mapping record keys to records, with
//! `null` marking a resolved key. Every operation reads and writes the whole
//! file; nothing is cached between operations.
//!
//! There is no locking. Two processes working on the same file race and the
//! last writer wins.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::temporal::TemporalCodec;
use crate::value::{Record, Store};

/// Handle to a store file on disk.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    codec: TemporalCodec,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>, codec: TemporalCodec) -> Self {
        RecordStore {
            path: path.into(),
            codec,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn codec(&self) -> &TemporalCodec {
        &self.codec
    }

    /// Create an empty store if the file does not exist yet.
    /// Returns true if a new file was written.
    pub fn init(&self) -> SyncResult<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| SyncError::Persistence {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        self.save(&Store::new())?;
        Ok(true)
    }

    /// Read the entire store, decoding timestamps.
    pub fn load(&self) -> SyncResult<Store> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.corrupt(e))?;

        let json: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e))?;

        let serde_json::Value::Object(entries) = json else {
            return Err(self.corrupt("top-level value is not an object"));
        };

        let mut store = Store::new();
        for (key, value) in entries {
            let entry = match value {
                serde_json::Value::Null => None,
                serde_json::Value::Object(map) => Some(self.codec.decode_object(map)),
                other => {
                    return Err(self.corrupt(format!(
                        "entry '{key}' is neither a record nor null: {other}"
                    )));
                }
            };
            store.insert(key, entry);
        }

        debug!(path = %self.path.display(), entries = store.len(), "loaded record store");
        Ok(store)
    }

    /// Write the entire store, encoding timestamps.
    ///
    /// The serialized blob is built in memory and written to a sibling temp
    /// file, which then replaces the store file. A failed write leaves the
    /// previous file untouched.
    pub fn save(&self, store: &Store) -> SyncResult<()> {
        let json: serde_json::Map<String, serde_json::Value> = store
            .iter()
            .map(|(key, entry)| (key.clone(), self.encode_entry(entry.as_ref())))
            .collect();

        let content = serde_json::to_string_pretty(&json).map_err(|e| SyncError::Persistence {
            path: self.path.clone(),
            source: std::io::Error::other(e),
        })?;

        let temp = self.temp_path();
        std::fs::write(&temp, content).map_err(|source| SyncError::Persistence {
            path: temp.clone(),
            source,
        })?;
        std::fs::rename(&temp, &self.path).map_err(|source| SyncError::Persistence {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), entries = store.len(), "saved record store");
        Ok(())
    }

    fn encode_entry(&self, entry: Option<&Record>) -> serde_json::Value {
        match entry {
            Some(record) => serde_json::Value::Object(self.codec.encode_record(record)),
            None => serde_json::Value::Null,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn corrupt(&self, reason: impl ToString) -> SyncError {
        SyncError::CorruptStore {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}
