//! Crate-level error type.

use thiserror::Error;

/// Everything that can go wrong between the registry and a launch.
///
/// Registry-facing variants are always converted into a structured result at
/// the boundary nearest the network call; nothing here is meant to reach the
/// process boundary unhandled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    /// Endpoint address or credential pair is absent.
    #[error("registry is misconfigured: missing {missing}")]
    RegistryMisconfigured { missing: &'static str },

    /// Network failure, non-2xx status, or an unparseable body from upstream.
    #[error("registry unavailable: {detail}")]
    RegistryUnavailable { detail: String },

    /// A required launch field was empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The requested room is not in the current directory snapshot.
    #[error("room '{0}' is not in the active room list")]
    UnknownRoom(String),

    /// A room name that cannot be carried as a single path segment.
    #[error("room name '{0}' cannot be used in a destination path")]
    InvalidRoomName(String),

    /// A passphrase fragment could not be decoded.
    #[error("invalid passphrase encoding: {0}")]
    InvalidPassphrase(String),

    /// A location string is not a valid URL or relative reference.
    #[error("invalid location '{0}'")]
    InvalidLocation(String),

    /// A configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LobbyError {
    /// `true` for the variants the directory treats as "no data this cycle".
    pub fn is_registry_failure(&self) -> bool {
        matches!(
            self,
            LobbyError::RegistryMisconfigured { .. } | LobbyError::RegistryUnavailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LobbyError>;
