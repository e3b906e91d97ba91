//! Turning Action Network events into Google Calendar events.

use chrono::{DateTime, FixedOffset};

use crate::error::{SyncError, SyncResult};
use crate::temporal::TemporalCodec;
use crate::value::{Record, Value, lookup};

/// Store key field of shaped records.
pub const KEY_FIELD: &str = "id";

/// Prefix Action Network puts on its identifiers.
const SOURCE_ID_PREFIX: &str = "action_network:";

/// Private extended property carrying the source identifier.
pub const SOURCE_ID_PROPERTY: &str = "action-network-id";

pub const DEFAULT_TIME_ZONE: &str = "US/Eastern";

const DEFAULT_DURATION_HOURS: i64 = 2;

/// How source events map onto calendar events.
#[derive(Debug, Clone)]
pub struct ShapeOptions {
    time_zone: String,
    duration: chrono::Duration,
}

impl Default for ShapeOptions {
    fn default() -> Self {
        ShapeOptions {
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            duration: chrono::Duration::hours(DEFAULT_DURATION_HOURS),
        }
    }
}

impl ShapeOptions {
    pub fn new(time_zone: &str, duration: std::time::Duration) -> SyncResult<Self> {
        time_zone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| SyncError::Config(format!("Unknown time zone: '{time_zone}'")))?;

        let duration = chrono::Duration::from_std(duration)
            .map_err(|_| SyncError::Config("Event duration is out of range".into()))?;

        Ok(ShapeOptions {
            time_zone: time_zone.to_string(),
            duration,
        })
    }

    pub fn time_zone(&self) -> &str {
        &self.time_zone
    }

    pub fn duration(&self) -> chrono::Duration {
        self.duration
    }
}

/// Build a calendar event from a raw source event.
pub fn shape_event(raw: &Record, options: &ShapeOptions) -> SyncResult<Record> {
    let source_id = raw
        .get("identifiers")
        .and_then(Value::as_array)
        .and_then(|ids| ids.first())
        .and_then(Value::as_str)
        .ok_or_else(|| SyncError::MalformedRecord("event has no identifiers".into()))?;

    let title = raw
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(source_id, "title"))?;

    let start = raw
        .get("start_date")
        .and_then(Value::as_timestamp)
        .ok_or_else(|| malformed(source_id, "start_date"))?;

    let end = start.checked_add_signed(options.duration).ok_or_else(|| {
        SyncError::MalformedRecord(format!("event {source_id} ends out of range"))
    })?;

    let mut event = Record::new();
    event.insert(KEY_FIELD.into(), calendar_id(source_id).into());
    event.insert("start".into(), event_time(start, &options.time_zone));
    event.insert("end".into(), event_time(end, &options.time_zone));
    event.insert("summary".into(), title.into());

    if let Some(description) = raw.get("description").and_then(Value::as_str) {
        event.insert("description".into(), description.into());
    }

    let mut private = Record::new();
    private.insert(SOURCE_ID_PROPERTY.into(), source_id.into());
    let mut properties = Record::new();
    properties.insert("private".into(), Value::Object(private));
    properties.insert("shared".into(), Value::Object(Record::new()));
    event.insert("extendedProperties".into(), Value::Object(properties));

    let location = raw
        .get("address_lines")
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    if !location.is_empty() {
        event.insert("location".into(), location.into());
    }

    Ok(event)
}

/// Calendar-side id: source identifier without prefix or hyphens.
fn calendar_id(source_id: &str) -> String {
    source_id
        .strip_prefix(SOURCE_ID_PREFIX)
        .unwrap_or(source_id)
        .replace('-', "")
}

fn event_time(at: DateTime<FixedOffset>, time_zone: &str) -> Value {
    let mut time = Record::new();
    time.insert("dateTime".into(), Value::Timestamp(at));
    time.insert("timeZone".into(), time_zone.into());
    Value::Object(time)
}

fn malformed(source_id: &str, field: &str) -> SyncError {
    SyncError::MalformedRecord(format!("event {source_id} has no usable '{field}'"))
}

/// Start instant of a shaped event, used to order submissions.
pub fn start_of(event: &Record) -> Option<DateTime<FixedOffset>> {
    lookup(event, &["start", "dateTime"]).and_then(Value::as_timestamp)
}

/// Request body for the calendar: everything but the id, with timestamps
/// rendered by `codec`.
pub fn outgoing_body(
    event: &Record,
    codec: &TemporalCodec,
) -> serde_json::Map<String, serde_json::Value> {
    let mut body = codec.encode_record(event);
    body.remove(KEY_FIELD);
    body
}
