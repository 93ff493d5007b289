//! Launch flows: turn a user's choice into a destination locator.
//!
//! | Flow            | Destination                                            |
//! |-----------------|--------------------------------------------------------|
//! | QuickStart      | `/rooms/{id}[#{passphrase}]`                           |
//! | CustomConnect   | `/custom/?liveKitUrl={url}&token={token}[#{passphrase}]` |
//! | JoinExisting    | `/rooms/{name}`                                        |
//!
//! Every flow builds a [`SessionCredential`] and serializes it straight into
//! a [`Location`]; the credential is never kept.

use crate::directory::DirectoryState;
use crate::error::{LobbyError, Result};
use crate::ident::{default_passphrase, encode_passphrase, generate_session_id};
use crate::navigation::{is_dot_segment, Location, Navigator};

pub const SERVER_URL_PARAM: &str = "liveKitUrl";
pub const TOKEN_PARAM: &str = "token";

/// E2EE toggle and the passphrase that goes with it.
///
/// The passphrase starts as a random 64-character default and may be edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct E2eeOptions {
    pub enabled: bool,
    pub passphrase: String,
}

impl Default for E2eeOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            passphrase: default_passphrase(),
        }
    }
}

impl E2eeOptions {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = passphrase.into();
        self
    }

    /// The passphrase to embed, `None` when E2EE is off.
    fn passphrase_for_launch(&self) -> Result<Option<String>> {
        if !self.enabled {
            return Ok(None);
        }
        if self.passphrase.is_empty() {
            return Err(LobbyError::MissingField("passphrase"));
        }
        Ok(Some(self.passphrase.clone()))
    }
}

/// Transient description of the session being launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredential {
    /// Room to open. Custom connections are named by their token instead.
    pub session_id: Option<String>,
    pub server_url: Option<String>,
    pub token: Option<String>,
    pub e2ee_enabled: bool,
    pub passphrase: Option<String>,
}

impl SessionCredential {
    /// Serialize into a destination. The fragment is present exactly when
    /// E2EE is enabled.
    ///
    /// # Errors
    /// - `MissingField("passphrase")` when E2EE is on without a passphrase.
    /// - `InvalidRoomName` for a room id of `.` or `..`, which no path can carry.
    pub fn into_destination(self) -> Result<Location> {
        let fragment = match (self.e2ee_enabled, self.passphrase.as_deref()) {
            (false, _) => None,
            (true, Some(passphrase)) if !passphrase.is_empty() => {
                Some(encode_passphrase(passphrase))
            }
            (true, _) => return Err(LobbyError::MissingField("passphrase")),
        };
        let base = match (&self.server_url, &self.token) {
            (Some(server_url), Some(token)) => Location::from_segments(&["custom"], true)?
                .with_query_param(SERVER_URL_PARAM, server_url)
                .with_query_param(TOKEN_PARAM, token),
            _ => {
                let id = self.session_id.as_deref().unwrap_or_default();
                if is_dot_segment(id) {
                    return Err(LobbyError::InvalidRoomName(id.to_string()));
                }
                Location::from_segments(&["rooms", id], false)?
            }
        };
        Ok(base.with_fragment(fragment.as_deref()))
    }
}

/// Start a brand-new session with a locally generated id.
#[derive(Debug, Clone, Default)]
pub struct QuickStart {
    pub e2ee: E2eeOptions,
}

impl QuickStart {
    pub fn new(e2ee: E2eeOptions) -> Self {
        Self { e2ee }
    }

    pub fn destination(&self) -> Result<Location> {
        let passphrase = self.e2ee.passphrase_for_launch()?;
        let credential = SessionCredential {
            session_id: Some(generate_session_id()),
            server_url: None,
            token: None,
            e2ee_enabled: passphrase.is_some(),
            passphrase,
        };
        credential.into_destination()
    }

    pub fn launch<N: Navigator>(&self, navigator: &mut N) -> Result<Location> {
        let destination = self.destination()?;
        tracing::info!(e2ee = self.e2ee.enabled, "starting new session");
        navigator.push(&destination);
        Ok(destination)
    }
}

/// Connect to a self-hosted server with a user-supplied token.
#[derive(Debug, Clone, Default)]
pub struct CustomConnect {
    pub server_url: String,
    pub token: String,
    pub e2ee: E2eeOptions,
}

impl CustomConnect {
    pub fn new(server_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            token: token.into(),
            e2ee: E2eeOptions::default(),
        }
    }

    pub fn with_e2ee(mut self, e2ee: E2eeOptions) -> Self {
        self.e2ee = e2ee;
        self
    }

    /// Fails with [`LobbyError::MissingField`] before anything is built when
    /// the server URL or token is blank.
    pub fn destination(&self) -> Result<Location> {
        let server_url = self.server_url.trim();
        if server_url.is_empty() {
            return Err(LobbyError::MissingField("serverUrl"));
        }
        let token = self.token.trim();
        if token.is_empty() {
            return Err(LobbyError::MissingField("token"));
        }
        let passphrase = self.e2ee.passphrase_for_launch()?;
        let credential = SessionCredential {
            session_id: None,
            server_url: Some(server_url.to_string()),
            token: Some(token.to_string()),
            e2ee_enabled: passphrase.is_some(),
            passphrase,
        };
        credential.into_destination()
    }

    pub fn launch<N: Navigator>(&self, navigator: &mut N) -> Result<Location> {
        let destination = self.destination()?;
        tracing::info!(server_url = %self.server_url.trim(), e2ee = self.e2ee.enabled, "connecting to custom server");
        navigator.push(&destination);
        Ok(destination)
    }
}

/// Rejoin a room from the current directory snapshot.
///
/// No passphrase handling: an existing session's encryption is set up by
/// that session, not here.
#[derive(Debug, Clone)]
pub struct JoinExisting<'a> {
    directory: &'a DirectoryState,
}

impl<'a> JoinExisting<'a> {
    pub fn new(directory: &'a DirectoryState) -> Self {
        Self { directory }
    }

    pub fn destination(&self, room_name: &str) -> Result<Location> {
        let room = match self.directory.find_room(room_name) {
            Some(room) => room,
            // A failed cycle means the snapshot cannot vouch for the name.
            None => {
                return Err(match self.directory.error.as_deref() {
                    Some(msg) => LobbyError::RegistryUnavailable {
                        detail: msg.to_string(),
                    },
                    None => LobbyError::UnknownRoom(room_name.to_string()),
                })
            }
        };
        let credential = SessionCredential {
            session_id: Some(room.name.clone()),
            server_url: None,
            token: None,
            e2ee_enabled: false,
            passphrase: None,
        };
        credential.into_destination()
    }

    pub fn launch<N: Navigator>(&self, room_name: &str, navigator: &mut N) -> Result<Location> {
        let destination = self.destination(room_name)?;
        tracing::info!(room = room_name, "joining existing session");
        navigator.push(&destination);
        Ok(destination)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
