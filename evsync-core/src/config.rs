//! Per-profile configuration.
//!
//! Each profile (production, test) has its own file:
//!   ~/.config/evsync/production.toml
//!   ~/.config/evsync/test.toml
//!
//! Any value can be overridden from the environment, e.g.
//! `EVSYNC_SOURCE__API_KEY` for `[source] api_key`.

use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::auth::{AuthSession, DEFAULT_SCOPE, ServiceAccount};
use crate::error::{SyncError, SyncResult};
use crate::remote::action_network::DEFAULT_MAX_PAGES;
use crate::remote::google::{DEFAULT_BASE_URL, DEFAULT_TIMESTAMP_FORMAT};
use crate::remote::{ActionNetworkClient, GoogleCalendarClient};
use crate::shape::{DEFAULT_TIME_ZONE, ShapeOptions};
use crate::store::RecordStore;
use crate::temporal::TemporalCodec;

const DEFAULT_SOURCE_BASE_URL: &str = "https://actionnetwork.org/api/v2/";

const DEFAULT_EVENT_DURATION: &str = "2h";

const ENV_PREFIX: &str = "EVSYNC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Production,
    Test,
}

impl Profile {
    pub fn name(self) -> &'static str {
        match self {
            Profile::Production => "production",
            Profile::Test => "test",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(skip)]
    pub profile: Profile,

    /// Record store file; defaults to the platform data dir.
    pub store_file: Option<PathBuf>,

    /// Extra strftime patterns recognized as timestamps.
    #[serde(default)]
    pub timestamp_patterns: Vec<String>,

    pub source: SourceConfig,
    pub calendar: CalendarConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_base_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_base_url")]
    pub base_url: String,
    pub calendar_id: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// How long each event lasts, e.g. "2h" or "90m".
    #[serde(default = "default_event_duration")]
    pub event_duration: String,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Falls back to `client_email` from the key file.
    pub service_account_email: Option<String>,
    pub key_file: PathBuf,
    #[serde(default = "default_scope")]
    pub scope: String,
    pub token_uri: Option<String>,
    pub token_cache: Option<PathBuf>,
}

fn default_source_base_url() -> String {
    DEFAULT_SOURCE_BASE_URL.to_string()
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_calendar_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_time_zone() -> String {
    DEFAULT_TIME_ZONE.to_string()
}

fn default_event_duration() -> String {
    DEFAULT_EVENT_DURATION.to_string()
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

impl SyncConfig {
    pub fn config_dir() -> SyncResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join("evsync"))
    }

    pub fn profile_path(profile: Profile) -> SyncResult<PathBuf> {
        Ok(Self::config_dir()?.join(format!("{}.toml", profile.name())))
    }

    /// Load the profile's config file, or `explicit` if given.
    pub fn load(profile: Profile, explicit: Option<&Path>) -> SyncResult<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::profile_path(profile)?,
        };

        if !path.exists() {
            return Err(SyncError::Config(format!(
                "Config file not found at {}\n\nCreate it with:\n\n{}",
                path.display(),
                Self::template(profile)
            )));
        }

        let mut config = Self::from_file(&path)?;
        config.profile = profile;
        Ok(config)
    }

    /// Read `path`, then apply `EVSYNC_*` environment overrides.
    pub fn from_file(path: &Path) -> SyncResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))
    }

    pub fn template(profile: Profile) -> String {
        format!(
            "\
# evsync {profile} configuration

# store_file = \"~/.local/share/evsync/{profile}.json\"

[source]
api_key = \"your-action-network-api-key\"

[calendar]
calendar_id = \"your-calendar@group.calendar.google.com\"
# time_zone = \"{DEFAULT_TIME_ZONE}\"
# event_duration = \"{DEFAULT_EVENT_DURATION}\"

[auth]
key_file = \"~/.config/evsync/service-account.json\"
# token_cache = \"~/.cache/evsync/{profile}-token.toml\"
"
        )
    }

    pub fn store_path(&self) -> SyncResult<PathBuf> {
        match &self.store_file {
            Some(path) => Ok(expand(path)),
            None => Ok(dirs::data_dir()
                .ok_or_else(|| SyncError::Config("Could not determine data directory".into()))?
                .join("evsync")
                .join(format!("{}.json", self.profile.name()))),
        }
    }

    /// Codec used for the store file and for decoding API responses.
    pub fn store_codec(&self) -> SyncResult<TemporalCodec> {
        TemporalCodec::iso().with_extra_patterns(self.timestamp_patterns.iter().cloned())
    }

    pub fn store(&self) -> SyncResult<RecordStore> {
        Ok(RecordStore::new(self.store_path()?, self.store_codec()?))
    }

    pub fn shape_options(&self) -> SyncResult<ShapeOptions> {
        let duration = humantime::parse_duration(&self.calendar.event_duration).map_err(|e| {
            SyncError::Config(format!(
                "Invalid event_duration '{}': {e}",
                self.calendar.event_duration
            ))
        })?;
        ShapeOptions::new(&self.calendar.time_zone, duration)
    }

    pub fn source_client(&self) -> SyncResult<ActionNetworkClient> {
        Ok(ActionNetworkClient::new(
            parse_url(&self.source.base_url)?,
            &self.source.api_key,
            self.store_codec()?,
        )
        .with_max_pages(self.source.max_pages))
    }

    pub fn calendar_client(&self) -> SyncResult<GoogleCalendarClient> {
        let codec = TemporalCodec::with_format(&self.calendar.timestamp_format)?
            .with_extra_patterns(self.timestamp_patterns.iter().cloned())?;

        Ok(GoogleCalendarClient::new(
            parse_url(&self.calendar.base_url)?,
            &self.calendar.calendar_id,
            &self.auth.scope,
            codec,
            self.auth_session()?,
        ))
    }

    pub fn auth_session(&self) -> SyncResult<AuthSession> {
        let account = ServiceAccount::from_key_file(
            &expand(&self.auth.key_file),
            self.auth.service_account_email.as_deref(),
            &self.auth.scope,
            self.auth.token_uri.as_deref(),
        )?;

        let session = AuthSession::new(account);
        Ok(match &self.auth.token_cache {
            Some(path) => session.with_cache(expand(path)),
            None => session,
        })
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn parse_url(s: &str) -> SyncResult<Url> {
    Url::parse(s).map_err(|e| SyncError::Config(format!("Invalid URL '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("test.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    const MINIMAL: &str = r#"
store_file = "/tmp/evsync-test.json"

[source]
api_key = "an-key"

[calendar]
calendar_id = "team@group.calendar.google.com"

[auth]
key_file = "/tmp/key.json"
"#;

    #[test]
    fn test_defaults_are_filled_in() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig::from_file(&write_config(&dir, MINIMAL)).unwrap();

        assert_eq!(config.source.base_url, DEFAULT_SOURCE_BASE_URL);
        assert_eq!(config.source.max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(config.calendar.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.calendar.time_zone, "US/Eastern");
        assert_eq!(config.calendar.timestamp_format, "%Y-%m-%dT%H:%M:%S");
        assert_eq!(config.auth.scope, DEFAULT_SCOPE);
        assert_eq!(config.store_path().unwrap(), PathBuf::from("/tmp/evsync-test.json"));
    }

    #[test]
    fn test_shape_options_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SyncConfig::from_file(&write_config(&dir, MINIMAL)).unwrap();
        assert_eq!(
            config.shape_options().unwrap().duration(),
            chrono::Duration::hours(2)
        );

        config.calendar.event_duration = "forever".into();
        assert!(matches!(config.shape_options(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_missing_required_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[source]\napi_key = \"x\"\n");
        assert!(matches!(SyncConfig::from_file(&path), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_missing_file_shows_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let Err(SyncError::Config(message)) = SyncConfig::load(Profile::Test, Some(&path)) else {
            panic!("expected a config error");
        };
        assert!(message.contains("[calendar]"));
        assert!(message.contains("test.json"));
    }

    #[test]
    fn test_template_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, &SyncConfig::template(Profile::Production));
        let config = SyncConfig::from_file(&path).unwrap();
        assert_eq!(config.source.api_key, "your-action-network-api-key");
    }
}
