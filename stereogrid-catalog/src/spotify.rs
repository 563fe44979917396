//! Spotify Web API client
//!
//! Client-credentials token exchange, catalog search and single-track
//! lookup. Every call is attempted once; any transport failure or non-2xx
//! response surfaces as a [`SpotifyError`].
//!
//! The access token is cached in memory until shortly before Spotify says it
//! expires, measured on the injected [`Clock`].

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use stereogrid_common::time::Clock;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = concat!("stereogrid/", env!("CARGO_PKG_VERSION"));

/// Seconds shaved off the advertised token lifetime
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Spotify client errors
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Spotify credentials are not configured")]
    MissingCredentials,

    #[error("Spotify request failed: {0}")]
    Network(String),

    #[error("Spotify API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected Spotify response: {0}")]
    Parse(String),
}

/// Connection settings
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub timeout: Duration,
    pub accounts_url: String,
    pub api_base_url: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            timeout: Duration::from_secs(stereogrid_common::config::DEFAULT_SPOTIFY_TIMEOUT_SECS),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl SpotifyConfig {
    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id, secret))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    config: SpotifyConfig,
    clock: Arc<dyn Clock>,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("accounts_url", &self.config.accounts_url)
            .field("api_base_url", &self.config.api_base_url)
            .field("has_credentials", &self.config.has_credentials())
            .finish()
    }
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig, clock: Arc<dyn Clock>) -> Result<Self, SpotifyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
            clock,
            token: Mutex::new(None),
        })
    }

    /// Bearer token for the Web API, exchanging credentials when the cached
    /// one is missing or stale
    pub async fn access_token(&self) -> Result<String, SpotifyError> {
        let mut cached = self.token.lock().await;
        let now = self.clock.now();

        if let Some(token) = cached.as_ref() {
            if now < token.expires_at {
                debug!("Using cached Spotify access token");
                return Ok(token.value.clone());
            }
        }

        let fresh = self.request_token(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn request_token(&self, now: DateTime<Utc>) -> Result<CachedToken, SpotifyError> {
        let (client_id, client_secret) = self
            .config
            .credentials()
            .ok_or(SpotifyError::MissingCredentials)?;

        debug!(url = %self.config.accounts_url, "Requesting Spotify access token");

        let response = self
            .http_client
            .post(&self.config.accounts_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        let token: TokenResponse = read_json(response).await?;
        Ok(CachedToken {
            value: token.access_token,
            expires_at: token_expiry(now, token.expires_in),
        })
    }

    /// Catalog search
    ///
    /// `types` is Spotify's comma-separated list (`track,artist,album`).
    pub async fn search(
        &self,
        query: &str,
        types: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Value, SpotifyError> {
        let url = format!("{}/search", self.config.api_base_url);
        let limit = limit.to_string();
        let offset = offset.to_string();
        let params = [
            ("q", query),
            ("type", types),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
        ];

        debug!(query = query, types = types, "Searching Spotify catalog");
        self.get_json(&url, &params).await
    }

    /// Full track record for a Spotify track id
    pub async fn track_details(&self, track_id: &str) -> Result<Value, SpotifyError> {
        let url = format!("{}/tracks/{}", self.config.api_base_url, track_id);

        debug!(track_id = track_id, "Fetching Spotify track");
        self.get_json(&url, &[]).await
    }

    async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, SpotifyError> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        read_json(response).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SpotifyError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SpotifyError::Api {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| SpotifyError::Parse(e.to_string()))
}

/// Moment a token issued at `now` stops being reused
///
/// A lifetime that cannot be represented expires the token immediately, so
/// it is used for one call and never cached.
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    let lifetime = expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS).max(0);
    ChronoDuration::try_seconds(lifetime)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(now)
}
