//! Google Calendar v3 events client.

use reqwest::header::AUTHORIZATION;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use super::{CalendarApi, check_status, endpoint};
use crate::auth::AuthSession;
use crate::error::{SyncError, SyncResult};
use crate::shape::outgoing_body;
use crate::temporal::TemporalCodec;
use crate::value::Record;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3/";

/// Google wants local wall-clock times next to an explicit `timeZone`.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base: Url,
    calendar_id: String,
    scope: String,
    codec: TemporalCodec,
    auth: Mutex<AuthSession>,
}

impl GoogleCalendarClient {
    pub fn new(
        base: Url,
        calendar_id: &str,
        scope: &str,
        codec: TemporalCodec,
        auth: AuthSession,
    ) -> Self {
        GoogleCalendarClient {
            http: reqwest::Client::new(),
            base,
            calendar_id: calendar_id.to_string(),
            scope: scope.to_string(),
            codec,
            auth: Mutex::new(auth),
        }
    }

    async fn insert(
        &self,
        url: &Url,
        body: &serde_json::Map<String, serde_json::Value>,
        auth: &mut AuthSession,
    ) -> SyncResult<Record> {
        let bearer = auth.current_bearer_header().await?;

        let response = self
            .http
            .post(url.clone())
            .header(AUTHORIZATION, bearer)
            .query(&[("scope", self.scope.as_str()), ("sendUpdates", "none")])
            .json(body)
            .send()
            .await?;

        let created: serde_json::Value = check_status("POST", response).await?.json().await?;
        match created {
            serde_json::Value::Object(created) => Ok(self.codec.decode_object(created)),
            other => Err(SyncError::Transport(format!(
                "Unexpected response from calendar: {other}"
            ))),
        }
    }
}

impl CalendarApi for GoogleCalendarClient {
    async fn submit(&self, event: &Record) -> SyncResult<Record> {
        let url = endpoint(&self.base, &["calendars", &self.calendar_id, "events"])?;
        let body = outgoing_body(event, &self.codec);
        let mut auth = self.auth.lock().await;

        debug!(%url, "creating calendar event");

        match self.insert(&url, &body, &mut auth).await {
            // A token revoked or expired early: fetch a fresh one and resend once.
            Err(e) if e.status() == Some(401) => {
                warn!("calendar rejected access token, refreshing");
                auth.invalidate();
                self.insert(&url, &body, &mut auth).await
            }
            result => result,
        }
    }
}
