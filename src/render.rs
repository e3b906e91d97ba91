//! Terminal rendering for evsync types.
//!
//! Extension traits that add colored output to evsync-core types using
//! owo_colors.

use evsync_core::shape::{KEY_FIELD, start_of};
use evsync_core::{Record, Store, SyncError, TemporalCodec, Value};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Record {
    fn render(&self) -> String {
        let summary = self
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or("(untitled)");
        let id = self.get(KEY_FIELD).and_then(Value::as_str).unwrap_or("?");

        let mut line = format!("📅 {} {}", summary.bold(), id.dimmed());

        if let Some(start) = start_of(self) {
            line.push_str(&format!("\n   {}", start.format("%a %b %-d %Y, %H:%M")));
        }
        if let Some(location) = self.get("location").and_then(Value::as_str) {
            line.push_str(&format!("\n   {}", location.dimmed()));
        }

        line
    }
}

/// Error line for a failed event; upstream bodies only when verbose.
pub fn render_error(error: &SyncError, verbose: bool) -> String {
    let mut line = error.to_string().red().to_string();

    if verbose
        && let SyncError::Upstream { body, .. } = error
        && !body.is_empty()
    {
        line.push_str(&format!("\n{}", body.dimmed()));
    }

    line
}

/// Pretty JSON for a set of store entries, `null` for resolved keys.
pub fn render_json<'a>(
    entries: impl IntoIterator<Item = (&'a String, Option<&'a Record>)>,
    codec: &TemporalCodec,
) -> String {
    let map: serde_json::Map<String, serde_json::Value> = entries
        .into_iter()
        .map(|(key, entry)| {
            let json = match entry {
                Some(record) => serde_json::Value::Object(codec.encode_record(record)),
                None => serde_json::Value::Null,
            };
            (key.clone(), json)
        })
        .collect();

    serde_json::to_string_pretty(&serde_json::Value::Object(map)).unwrap_or_default()
}

/// Pretty JSON for a whole store.
pub fn render_store(store: &Store, codec: &TemporalCodec) -> String {
    render_json(store.iter().map(|(k, v)| (k, v.as_ref())), codec)
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
