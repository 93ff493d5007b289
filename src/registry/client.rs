//! HTTP client for the room registry.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use super::auth::room_list_token;
use super::converter::{active_rooms, ListRoomsResponse, RoomSummary};
use crate::config::RegistrySettings;
use crate::error::{LobbyError, Result};

/// Twirp route of the room service's list call.
pub const LIST_ROOMS_PATH: &str = "/twirp/livekit.RoomService/ListRooms";

/// Anything that can answer "which rooms currently have people in them".
///
/// The directory poller and the HTTP surface depend on this trait rather than
/// on [`RegistryClient`] so both can run against test doubles.
pub trait RoomRegistry: Send + Sync + 'static {
    /// Rooms with `participant_count > 0`, in registry order.
    fn list_active_rooms(&self) -> impl Future<Output = Result<Vec<RoomSummary>>> + Send;
}

impl<R: RoomRegistry> RoomRegistry for Arc<R> {
    fn list_active_rooms(&self) -> impl Future<Output = Result<Vec<RoomSummary>>> + Send {
        (**self).list_active_rooms()
    }
}

/// Timeouts for registry calls.
#[derive(Debug, Clone)]
pub struct RegistryClientConfig {
    /// TCP connection timeout.
    pub connect_timeout: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for RegistryClientConfig {
    /// - connect_timeout: 3 s
    /// - request_timeout: 10 s
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// The production [`RoomRegistry`], talking to a LiveKit-compatible room
/// service. Use [`RegistryClientBuilder`] for construction.
pub struct RegistryClient {
    settings: RegistrySettings,
    config: RegistryClientConfig,
    client: reqwest::Client,
}

impl RegistryClient {
    /// Start building a client from (possibly incomplete) settings.
    pub fn builder(settings: RegistrySettings) -> RegistryClientBuilder {
        RegistryClientBuilder::new(settings)
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Fetch every room the registry knows about and keep the active ones.
    ///
    /// # Returns
    /// - `Err(LobbyError::RegistryMisconfigured)`: address or credentials absent;
    ///   no request is sent.
    /// - `Err(LobbyError::RegistryUnavailable)`: connection failure, non-2xx
    ///   status, or a body that is not a `ListRooms` reply.
    pub async fn fetch_active_rooms(&self) -> Result<Vec<RoomSummary>> {
        let resolved = self.settings.resolve()?;
        let token = room_list_token(&resolved.api_key, &resolved.api_secret, now_secs())?;
        let url = format!("{}{}", resolved.http_url, LIST_ROOMS_PATH);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| LobbyError::RegistryUnavailable {
                detail: format!("connection to {url} failed: {e}"),
            })?;

        if !resp.status().is_success() {
            return Err(LobbyError::RegistryUnavailable {
                detail: format!("HTTP {} from {url}", resp.status().as_u16()),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| LobbyError::RegistryUnavailable {
            detail: format!("reading body from {url}: {e}"),
        })?;
        let listing: ListRoomsResponse =
            serde_json::from_slice(&bytes).map_err(|e| LobbyError::RegistryUnavailable {
                detail: format!("unexpected ListRooms body: {e}"),
            })?;

        let total = listing.rooms.len();
        let active = active_rooms(listing.rooms);
        debug!(total, active = active.len(), "registry listing filtered");
        Ok(active)
    }
}

impl RoomRegistry for RegistryClient {
    fn list_active_rooms(&self) -> impl Future<Output = Result<Vec<RoomSummary>>> + Send {
        self.fetch_active_rooms()
    }
}

/// Builder for [`RegistryClient`].
pub struct RegistryClientBuilder {
    settings: RegistrySettings,
    config: RegistryClientConfig,
}

impl RegistryClientBuilder {
    pub fn new(settings: RegistrySettings) -> Self {
        Self {
            settings,
            config: RegistryClientConfig::default(),
        }
    }

    /// Override the TCP connect timeout (default 3 s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Override the per-request timeout (default 10 s).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Consume the builder. Never fails: incomplete settings are reported
    /// per request as [`LobbyError::RegistryMisconfigured`].
    pub fn build(self) -> RegistryClient {
        // reqwest::Client::builder() can fail in extreme environments, but
        // unwrap_or_default() falls back to a default client instead of panicking.
        let client = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .build()
            .unwrap_or_default();

        RegistryClient {
            settings: self.settings,
            config: self.config,
            client,
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
