//! Registry connection settings.
//!
//! Values are layered: an optional TOML file first, then the `LIVEKIT_*`
//! environment variables on top. Nothing is validated at load time; a
//! missing value only surfaces as [`LobbyError::RegistryMisconfigured`] when
//! a request is attempted, so the host process never fails to start because
//! the registry is not set up.

use std::path::Path;

use serde::Deserialize;

use crate::error::{LobbyError, Result};

pub const ENV_URL: &str = "LIVEKIT_URL";
pub const ENV_API_KEY: &str = "LIVEKIT_API_KEY";
pub const ENV_API_SECRET: &str = "LIVEKIT_API_SECRET";

/// Endpoint address and credential pair for the room registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistrySettings {
    /// Registry address; `ws://` and `wss://` are accepted.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
}

/// Settings with every required value present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    /// HTTP(S) base URL with no trailing slash.
    pub http_url: String,
    pub api_key: String,
    pub api_secret: String,
}

/// On-disk layout: settings live under a `[registry]` table.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    registry: RegistrySettings,
}

impl RegistrySettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup (env-like).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            url: non_blank(lookup(ENV_URL)),
            api_key: non_blank(lookup(ENV_API_KEY)),
            api_secret: non_blank(lookup(ENV_API_SECRET)),
        }
    }

    /// Parse the `[registry]` table of a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| LobbyError::Config(e.to_string()))?;
        let r = file.registry;
        Ok(Self {
            url: non_blank(r.url),
            api_key: non_blank(r.api_key),
            api_secret: non_blank(r.api_secret),
        })
    }

    /// Load a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LobbyError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Overlay `other` on top of `self`; present values in `other` win.
    pub fn merged_with(self, other: RegistrySettings) -> Self {
        Self {
            url: other.url.or(self.url),
            api_key: other.api_key.or(self.api_key),
            api_secret: other.api_secret.or(self.api_secret),
        }
    }

    /// File (if any) overlaid by the environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let base = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.merged_with(Self::from_env()))
    }

    /// Check that all three values are present and normalise the address.
    pub fn resolve(&self) -> Result<ResolvedSettings> {
        let url = self
            .url
            .as_deref()
            .ok_or(LobbyError::RegistryMisconfigured { missing: ENV_URL })?;
        let api_key = self
            .api_key
            .clone()
            .ok_or(LobbyError::RegistryMisconfigured { missing: ENV_API_KEY })?;
        let api_secret = self
            .api_secret
            .clone()
            .ok_or(LobbyError::RegistryMisconfigured { missing: ENV_API_SECRET })?;
        Ok(ResolvedSettings {
            http_url: to_http_url(url),
            api_key,
            api_secret,
        })
    }
}

/// Rewrite a signaling URL into the HTTP base the room service listens on.
pub fn to_http_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        url.to_string()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
