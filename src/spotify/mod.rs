//! # Spotify Integration Module
//!
//! This module is the upstream side of the archive: everything the update
//! pipeline knows about Spotify goes through the [`PlaylistSource`] trait.
//!
//! ## Overview
//!
//! ```text
//! Update pipeline (FileUpdater, caches)
//!          ↓
//! PlaylistSource trait
//!          ↓
//! SpotifyClient (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! The pipeline only needs two capabilities: the current state of one
//! playlist, and the set of playlists the authenticated user owns. Keeping
//! them behind a trait lets tests script upstream responses without a
//! network.
//!
//! ## Error Handling
//!
//! Every failure is reduced to a [`FetchError`]:
//!
//! | Upstream condition | Result |
//! |---|---|
//! | 400, 404 | `NotFound` |
//! | 401, 403 | `AuthFailure` |
//! | 429 | retried after `Retry-After`, then `RateLimited` |
//! | 502, 503, 504 | retried after a pause, then `Transient` |
//! | other 5xx, network errors, timeouts, malformed JSON | `Transient` |
//!
//! Every request is bounded by [`REQUEST_TIMEOUT`], so a stalled connection
//! cannot hold a fetch slot forever.
//!
//! ## Authentication
//!
//! The client sends a bearer token taken from `SPOTIFY_ACCESS_TOKEN`.
//! Issuing and refreshing that token is outside the scope of this tool.
//!
//! ## Dependencies
//!
//! - **reqwest** - HTTP client with JSON support
//! - **serde_json** - decoding of API payloads
//! - **tokio** - sleeping between retries
//! - **async-trait** - object-safe async trait for the source seam

use std::{collections::BTreeSet, time::Duration};

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    config,
    error::{FetchError, SetupError},
    log::Logger,
    types::{PlaylistId, PlaylistSnapshot},
};

pub mod playlists;

/// Upstream capability consumed by the update pipeline.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Current name, description and ordered tracks of one playlist.
    async fn fetch_playlist(&self, id: &PlaylistId) -> Result<PlaylistSnapshot, FetchError>;

    /// IDs of every playlist owned by the authenticated user.
    async fn fetch_owned_playlist_ids(&self) -> Result<BTreeSet<PlaylistId>, FetchError>;
}

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry policy for throttled and flaky responses.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Longest `Retry-After` we are willing to wait for.
    pub max_retry_after: Duration,
    /// Pause before retrying a 502/503/504.
    pub server_error_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_retry_after: Duration::from_secs(120),
            server_error_backoff: Duration::from_secs(10),
        }
    }
}

/// Spotify Web API client implementing [`PlaylistSource`].
///
/// Cheap to share: the inner `reqwest::Client` pools connections and the
/// struct is `Send + Sync`, so one instance serves every concurrent fetch.
pub struct SpotifyClient {
    client: Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
    log: Logger,
}

impl SpotifyClient {
    /// Creates a client for `base_url` (e.g. `https://api.spotify.com/v1`)
    /// authenticating with a bearer `token`, using [`REQUEST_TIMEOUT`].
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, SetupError> {
        Self::with_timeout(base_url, token, REQUEST_TIMEOUT)
    }

    /// Like [`SpotifyClient::new`] with a custom per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::HttpClient`] if the TLS backend cannot be
    /// initialized.
    pub fn with_timeout(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SetupError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SetupError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retry: RetryPolicy::default(),
            log: Logger::silent(),
        })
    }

    /// Builds a client from `SPOTIFY_API_URL` and `SPOTIFY_ACCESS_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Config`] when no access token is configured, or
    /// [`SetupError::HttpClient`] if the client cannot be built.
    pub fn from_config() -> Result<Self, SetupError> {
        Self::new(config::spotify_apiurl(), config::spotify_access_token()?)
    }

    pub fn with_logger(mut self, log: Logger) -> Self {
        self.log = log;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    async fn fetch_playlist(&self, id: &PlaylistId) -> Result<PlaylistSnapshot, FetchError> {
        playlists::get_playlist(self, id).await
    }

    async fn fetch_owned_playlist_ids(&self) -> Result<BTreeSet<PlaylistId>, FetchError> {
        playlists::get_owned_playlist_ids(self).await
    }
}
