//! Action Network (OSDI) events client.

use tracing::{debug, warn};
use url::Url;

use super::{SourceApi, SourceFilter, check_status, endpoint};
use crate::error::{SyncError, SyncResult};
use crate::temporal::TemporalCodec;
use crate::value::Record;

const API_TOKEN_HEADER: &str = "OSDI-API-Token";

const EVENTS_KEY: &str = "osdi:events";

pub const DEFAULT_MAX_PAGES: usize = 20;

pub struct ActionNetworkClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
    codec: TemporalCodec,
    max_pages: usize,
}

impl ActionNetworkClient {
    pub fn new(base: Url, api_key: impl Into<String>, codec: TemporalCodec) -> Self {
        ActionNetworkClient {
            http: reqwest::Client::new(),
            base,
            api_key: api_key.into(),
            codec,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }
}

impl SourceApi for ActionNetworkClient {
    async fn fetch(&self, filter: Option<&SourceFilter>) -> SyncResult<Vec<Record>> {
        let mut url = endpoint(&self.base, &["events", ""])?;
        if let Some(filter) = filter {
            url.query_pairs_mut()
                .append_pair("filter", &filter.to_string());
        }

        let mut events = Vec::new();
        let mut page = 0;

        loop {
            if page == self.max_pages {
                warn!(%url, max_pages = self.max_pages, "page limit reached, remaining events not fetched");
                break;
            }
            page += 1;
            debug!(%url, page, "fetching events");

            let response = self
                .http
                .get(url.clone())
                .header(API_TOKEN_HEADER, &self.api_key)
                .send()
                .await?;
            let body: serde_json::Value = check_status("GET", response).await?.json().await?;

            let (batch, next) = parse_page(&self.codec, body)?;
            events.extend(batch);

            match next {
                Some(href) => {
                    url = Url::parse(&href)
                        .map_err(|e| SyncError::Transport(format!("Bad next link {href}: {e}")))?;
                }
                None => break,
            }
        }

        Ok(events)
    }
}

/// Pull the events and the next-page link out of one response page.
fn parse_page(
    codec: &TemporalCodec,
    mut body: serde_json::Value,
) -> SyncResult<(Vec<Record>, Option<String>)> {
    let next = body
        .pointer("/_links/next/href")
        .and_then(|v| v.as_str())
        .map(String::from);

    let events = match body
        .get_mut("_embedded")
        .and_then(|embedded| embedded.get_mut(EVENTS_KEY))
        .map(serde_json::Value::take)
    {
        Some(serde_json::Value::Array(items)) => items,
        Some(serde_json::Value::Null) | None => Vec::new(),
        Some(other) => {
            return Err(SyncError::MalformedRecord(format!(
                "'{EVENTS_KEY}' is not a list: {other}"
            )));
        }
    };

    let records = events
        .into_iter()
        .map(|event| match event {
            serde_json::Value::Object(map) => Ok(codec.decode_object(map)),
            other => Err(SyncError::MalformedRecord(format!(
                "event is not an object: {other}"
            ))),
        })
        .collect::<SyncResult<Vec<_>>>()?;

    Ok((records, next))
}
