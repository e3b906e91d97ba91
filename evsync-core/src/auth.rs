//! Service-account session for the Google Calendar API.
//!
//! Holds a bearer token and replaces it when it expires: a short-lived
//! RS256 assertion is signed with the service account's private key and
//! exchanged at the token endpoint for an access token.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::remote::check_status;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Identity used to sign assertions.
#[derive(Clone)]
pub struct ServiceAccount {
    pub email: String,
    pub scope: String,
    pub token_uri: String,
    private_key: String,
}

/// The parts of a Google service-account key file we use.
#[derive(Deserialize)]
struct KeyFile {
    private_key: String,
    client_email: Option<String>,
    token_uri: Option<String>,
}

impl ServiceAccount {
    pub fn new(email: &str, private_key_pem: &str, scope: &str, token_uri: &str) -> Self {
        ServiceAccount {
            email: email.to_string(),
            scope: scope.to_string(),
            token_uri: token_uri.to_string(),
            private_key: private_key_pem.to_string(),
        }
    }

    /// Load a service-account key file (the JSON downloaded from the cloud
    /// console). `email` and `token_uri` override the file's values.
    pub fn from_key_file(
        path: &Path,
        email: Option<&str>,
        scope: &str,
        token_uri: Option<&str>,
    ) -> SyncResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Auth(format!("Could not read key file {}: {e}", path.display()))
        })?;
        let key: KeyFile = serde_json::from_str(&contents).map_err(|e| {
            SyncError::Auth(format!("Could not parse key file {}: {e}", path.display()))
        })?;

        let email = email
            .map(String::from)
            .or(key.client_email)
            .ok_or_else(|| SyncError::Auth("No service account email configured".into()))?;
        let token_uri = token_uri
            .map(String::from)
            .or(key.token_uri)
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        Ok(ServiceAccount {
            email,
            scope: scope.to_string(),
            token_uri,
            private_key: key.private_key,
        })
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

pub struct AuthSession {
    http: reqwest::Client,
    account: ServiceAccount,
    token: Option<CachedToken>,
    cache_path: Option<PathBuf>,
}

impl AuthSession {
    pub fn new(account: ServiceAccount) -> Self {
        AuthSession {
            http: reqwest::Client::new(),
            account,
            token: None,
            cache_path: None,
        }
    }

    /// Persist tokens at `path` so later runs can reuse them.
    /// An unreadable cache is ignored.
    pub fn with_cache(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.token = match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<CachedToken>(&contents) {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable token cache");
                    None
                }
            },
            Err(_) => None,
        };
        self.cache_path = Some(path);
        self
    }

    /// `Authorization` header value, refreshing the token first if needed.
    pub async fn current_bearer_header(&mut self) -> SyncResult<String> {
        let now = Utc::now();
        let cached = self
            .token
            .as_ref()
            .filter(|token| token.is_fresh(now))
            .map(|token| token.access_token.clone());

        let token = match cached {
            Some(token) => token,
            None => self.refresh(now).await?,
        };
        Ok(format!("Bearer {token}"))
    }

    /// Forget the current token, e.g. after the API rejected it.
    pub fn invalidate(&mut self) {
        self.token = None;
    }

    async fn refresh(&mut self, now: DateTime<Utc>) -> SyncResult<String> {
        debug!(account = %self.account.email, "requesting new access token");

        let assertion = self.assertion(now)?;
        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let response: TokenResponse = check_status("POST", response).await?.json().await?;

        let token = CachedToken {
            access_token: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in),
        };
        self.save_cache(&token);
        let access_token = token.access_token.clone();
        self.token = Some(token);

        Ok(access_token)
    }

    fn assertion(&self, now: DateTime<Utc>) -> SyncResult<String> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.account.email,
            scope: &self.account.scope,
            aud: &self.account.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes())
            .map_err(|e| SyncError::Auth(format!("Invalid private key: {e}")))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SyncError::Auth(format!("Could not sign assertion: {e}")))
    }

    fn save_cache(&self, token: &CachedToken) {
        let Some(path) = &self.cache_path else {
            return;
        };
        if let Err(e) = write_cache(path, token) {
            warn!(path = %path.display(), error = %e, "could not save token cache");
        }
    }
}

fn write_cache(path: &Path, token: &CachedToken) -> std::io::Result<()> {
    let contents = toml::to_string_pretty(token).map_err(std::io::Error::other)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;

    // Owner-only, the file holds a live access token:
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Throwaway RSA key used only to sign test assertions.
    const SERVICE_KEY_PEM: &str = include_str!("../testdata/service_key.pem");

    /// Account that can sign assertions for `token_uri`.
    pub(crate) fn signing_account(token_uri: &str) -> ServiceAccount {
        ServiceAccount::new(
            "bot@project.iam.gserviceaccount.com",
            SERVICE_KEY_PEM,
            DEFAULT_SCOPE,
            token_uri,
        )
    }

    pub(crate) fn token_response(access_token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "expires_in": 3600,
            "token_type": "Bearer"
        }))
    }

    fn account() -> ServiceAccount {
        ServiceAccount::new("bot@project.iam.gserviceaccount.com", "not a key", DEFAULT_SCOPE, DEFAULT_TOKEN_URI)
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.toml");
        let token = CachedToken {
            access_token: "cached".into(),
            expires_at: Utc::now() + Duration::minutes(30),
        };
        write_cache(&path, &token).unwrap();

        let mut session = AuthSession::new(account()).with_cache(&path);

        assert_eq!(session.current_bearer_header().await.unwrap(), "Bearer cached");
    }

    #[tokio::test]
    async fn test_expired_token_needs_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.toml");
        let token = CachedToken {
            access_token: "stale".into(),
            expires_at: Utc::now() + Duration::seconds(10),
        };
        write_cache(&path, &token).unwrap();

        let mut session = AuthSession::new(account()).with_cache(&path);

        // Refreshing has to sign a new assertion, which fails on the bogus key
        // before any request is sent.
        assert!(matches!(
            session.current_bearer_header().await,
            Err(SyncError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_invalidate_drops_token() {
        let mut session = AuthSession::new(account());
        session.token = Some(CachedToken {
            access_token: "live".into(),
            expires_at: Utc::now() + Duration::hours(1),
        });
        assert_eq!(session.current_bearer_header().await.unwrap(), "Bearer live");

        session.invalidate();
        assert!(session.current_bearer_header().await.is_err());
    }

    #[test]
    fn test_garbled_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let session = AuthSession::new(account()).with_cache(&path);
        assert!(session.token.is_none());
    }

    #[test]
    fn test_key_file_fills_in_email() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        std::fs::write(
            &path,
            r#"{"private_key": "pem", "client_email": "bot@example.iam.gserviceaccount.com"}"#,
        )
        .unwrap();

        let account = ServiceAccount::from_key_file(&path, None, DEFAULT_SCOPE, None).unwrap();
        assert_eq!(account.email, "bot@example.iam.gserviceaccount.com");
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);

        let account =
            ServiceAccount::from_key_file(&path, Some("other@example.com"), DEFAULT_SCOPE, None)
                .unwrap();
        assert_eq!(account.email, "other@example.com");
    }

    #[tokio::test]
    async fn test_refresh_exchanges_signed_assertion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion=ey"))
            .respond_with(token_response("fresh"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.toml");
        let token_uri = format!("{}/token", server.uri());
        let mut session = AuthSession::new(signing_account(&token_uri)).with_cache(&cache);

        assert_eq!(session.current_bearer_header().await.unwrap(), "Bearer fresh");
        // Served from memory; the endpoint is hit once.
        assert_eq!(session.current_bearer_header().await.unwrap(), "Bearer fresh");

        let reloaded = AuthSession::new(signing_account(&token_uri)).with_cache(&cache);
        assert_eq!(reloaded.token.unwrap().access_token, "fresh");
    }

    #[tokio::test]
    async fn test_rejected_assertion_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let mut session =
            AuthSession::new(signing_account(&format!("{}/token", server.uri())));

        let Err(SyncError::Upstream { status, body, .. }) = session.current_bearer_header().await
        else {
            panic!("expected an upstream error");
        };
        assert_eq!(status, 400);
        assert_eq!(body, "invalid_grant");
    }
}
