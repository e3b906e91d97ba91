//! Timestamp decoding and encoding.
//!
//! Every string that looks like a date-time is turned into a
//! `Value::Timestamp` on the way in, and every timestamp is written back as
//! text on the way out. Decoding is best effort: anything that does not
//! parse simply stays a string.
//!
//! Encoding works at second precision, so `decode(encode(t)) == t` holds for
//! any `t` without a sub-second part.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat};

use crate::error::{SyncError, SyncResult};
use crate::value::{Record, Value};

/// Patterns carrying an explicit UTC offset.
const OFFSET_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Patterns without an offset; these are read as UTC.
const NAIVE_PATTERNS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Shortest string that can hold `YYYY-MM-DDTHH:MM:SS`.
const MIN_TIMESTAMP_LEN: usize = 19;

#[derive(Debug, Clone, Default)]
pub struct TemporalCodec {
    /// strftime pattern for encoding; ISO-8601 with offset when `None`.
    output: Option<String>,
    /// Additional strftime patterns tried when decoding.
    extra_patterns: Vec<String>,
}

impl TemporalCodec {
    /// Codec writing ISO-8601 at second precision.
    pub fn iso() -> Self {
        Self::default()
    }

    /// Codec writing timestamps with an explicit strftime pattern.
    pub fn with_format(pattern: &str) -> SyncResult<Self> {
        validate_pattern(pattern)?;
        Ok(Self {
            output: Some(pattern.to_string()),
            extra_patterns: Vec::new(),
        })
    }

    /// Also recognize `patterns` when decoding.
    pub fn with_extra_patterns<I, S>(mut self, patterns: I) -> SyncResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for pattern in patterns {
            let pattern = pattern.into();
            validate_pattern(&pattern)?;
            self.extra_patterns.push(pattern);
        }
        Ok(self)
    }

    /// Parse `s` as a timestamp, if it matches a recognized pattern.
    pub fn parse_timestamp(&self, s: &str) -> Option<DateTime<FixedOffset>> {
        let s = s.trim();

        if let Some(t) = self.parse_extra(s) {
            return Some(t);
        }

        if s.len() < MIN_TIMESTAMP_LEN || !s.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }

        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Some(t);
        }

        for pattern in OFFSET_PATTERNS {
            if let Ok(t) = DateTime::parse_from_str(s, pattern) {
                return Some(t);
            }
        }

        for pattern in NAIVE_PATTERNS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
                return Some(naive.and_utc().fixed_offset());
            }
        }

        None
    }

    fn parse_extra(&self, s: &str) -> Option<DateTime<FixedOffset>> {
        for pattern in &self.extra_patterns {
            if let Ok(t) = DateTime::parse_from_str(s, pattern) {
                return Some(t);
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
                return Some(naive.and_utc().fixed_offset());
            }
        }
        None
    }

    /// Render a timestamp as text. Sub-second components are dropped.
    pub fn format_timestamp(&self, t: &DateTime<FixedOffset>) -> String {
        match &self.output {
            Some(pattern) => t.format(pattern).to_string(),
            None => t.to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }

    /// Convert parsed JSON into a `Value`, turning timestamp strings into
    /// timestamps at every depth.
    pub fn decode(&self, json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => match self.parse_timestamp(&s) {
                Some(t) => Value::Timestamp(t),
                None => Value::String(s),
            },
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.decode(v)).collect())
            }
            serde_json::Value::Object(map) => Value::Object(self.decode_object(map)),
        }
    }

    pub fn decode_object(&self, map: serde_json::Map<String, serde_json::Value>) -> Record {
        map.into_iter().map(|(k, v)| (k, self.decode(v))).collect()
    }

    /// Convert a `Value` back into JSON, formatting timestamps at every depth.
    pub fn encode(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(t) => serde_json::Value::String(self.format_timestamp(t)),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(|v| self.encode(v)).collect())
            }
            Value::Object(map) => serde_json::Value::Object(self.encode_record(map)),
        }
    }

    pub fn encode_record(&self, record: &Record) -> serde_json::Map<String, serde_json::Value> {
        record
            .iter()
            .map(|(k, v)| (k.clone(), self.encode(v)))
            .collect()
    }

    /// `record` as it reads back after being written with this codec.
    pub fn normalize(&self, record: &Record) -> Record {
        self.decode_object(self.encode_record(record))
    }
}

fn validate_pattern(pattern: &str) -> SyncResult<()> {
    if pattern.is_empty() || StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(SyncError::Config(format!(
            "Invalid timestamp pattern: '{pattern}'"
        )));
    }
    Ok(())
}
