//! In-memory record model.
//!
//! Records are loosely typed field maps, like the JSON they come from, with
//! one extra variant: timestamps are held as native instants and only turn
//! back into text when written out (see `temporal`).

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::error::{SyncError, SyncResult};

/// A single event's structured data.
pub type Record = BTreeMap<String, Value>;

/// Key → record, or `None` once the key has been resolved (tombstone).
pub type Store = BTreeMap<String, Option<Record>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Timestamp(DateTime<FixedOffset>),
    Array(Vec<Value>),
    Object(Record),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Record> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(t: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Record> for Value {
    fn from(map: Record) -> Self {
        Value::Object(map)
    }
}

/// Store key of a record, read from `key_field`.
///
/// Strings are used as-is and numbers by their decimal text; anything else
/// (including a missing field or `null`) is a `MissingKey` error.
pub fn record_key(record: &Record, key_field: &str) -> SyncResult<String> {
    match record.get(key_field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(SyncError::MissingKey {
            field: key_field.to_string(),
        }),
    }
}

/// Follow a path of object fields, e.g. `["start", "dateTime"]`.
pub fn lookup<'a>(record: &'a Record, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = record.get(*first)?;
    for field in rest {
        current = current.as_object()?.get(*field)?;
    }
    Some(current)
}
