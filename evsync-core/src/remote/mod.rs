//! HTTP collaborators: the event source and the calendar.

pub mod action_network;
mod filter;
pub mod google;

pub use action_network::ActionNetworkClient;
pub use filter::SourceFilter;
pub use google::GoogleCalendarClient;

use url::Url;

use crate::error::{SyncError, SyncResult};
use crate::value::Record;

/// Where new events come from.
pub trait SourceApi {
    /// Fetch events created upstream, optionally narrowed by `filter`.
    fn fetch(
        &self,
        filter: Option<&SourceFilter>,
    ) -> impl Future<Output = SyncResult<Vec<Record>>> + Send;
}

/// Where shaped events go.
pub trait CalendarApi {
    /// Create `event` on the calendar and return the created event.
    fn submit(&self, event: &Record) -> impl Future<Output = SyncResult<Record>> + Send;
}

/// Append path segments to `base`, percent-encoding each one.
///
/// A trailing empty segment keeps a trailing slash (`events/`).
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> SyncResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SyncError::Config(format!("Base URL cannot take a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turn a non-success response into `SyncError::Upstream`.
pub(crate) async fn check_status(
    method: &str,
    response: reqwest::Response,
) -> SyncResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();

    Err(SyncError::Upstream {
        method: method.to_string(),
        url,
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_segments() {
        let base = Url::parse("https://www.googleapis.com/calendar/v3/").unwrap();
        let url = endpoint(&base, &["calendars", "team@group.calendar.google.com", "events"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/team@group.calendar.google.com/events"
        );
    }

    #[test]
    fn test_endpoint_keeps_trailing_slash() {
        let base = Url::parse("https://actionnetwork.org/api/v2").unwrap();
        let url = endpoint(&base, &["events", ""]).unwrap();
        assert_eq!(url.as_str(), "https://actionnetwork.org/api/v2/events/");
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let base = Url::parse("https://example.com/").unwrap();
        let url = endpoint(&base, &["calendars", "a/b#c"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/calendars/a%2Fb%23c");
    }
}
