//! Tab navigation driven by the `tab` query parameter.
//!
//! The URL is the only place the current mode lives. [`NavigationController`]
//! stores a [`Location`] and derives the [`NavigationMode`] from it on every
//! read; selecting a mode rewrites the URL and hands it to the host
//! [`Navigator`].

use std::fmt;

use clap::ValueEnum;
use once_cell::sync::Lazy;
use url::Url;

use crate::error::{LobbyError, Result};

/// Query parameter that carries the mode.
pub const TAB_PARAM: &str = "tab";

/// Origin used to resolve relative locations. Never rendered.
static LOCAL_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("http://lobby.invalid/").expect("static base URL parses"));

/// The three landing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum NavigationMode {
    /// Start a fresh session.
    #[default]
    #[value(name = "demo")]
    QuickStart,
    /// Connect to a self-hosted server with a token.
    #[value(name = "custom")]
    CustomConnect,
    /// Rejoin a session that has participants.
    #[value(name = "join")]
    JoinExisting,
}

impl NavigationMode {
    pub const ALL: [NavigationMode; 3] = [
        NavigationMode::QuickStart,
        NavigationMode::CustomConnect,
        NavigationMode::JoinExisting,
    ];

    /// `custom` and `join` select their modes; anything else is QuickStart.
    pub fn from_tab(tab: Option<&str>) -> Self {
        match tab {
            Some("custom") => NavigationMode::CustomConnect,
            Some("join") => NavigationMode::JoinExisting,
            _ => NavigationMode::QuickStart,
        }
    }

    pub fn from_location(location: &Location) -> Self {
        Self::from_tab(location.query_param(TAB_PARAM).as_deref())
    }

    /// Value written to the `tab` parameter.
    pub fn tab_value(self) -> &'static str {
        match self {
            NavigationMode::QuickStart => "demo",
            NavigationMode::CustomConnect => "custom",
            NavigationMode::JoinExisting => "join",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NavigationMode::QuickStart => "Demo",
            NavigationMode::CustomConnect => "Custom",
            NavigationMode::JoinExisting => "Join Existing",
        }
    }
}

impl fmt::Display for NavigationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tab_value())
    }
}

/// A URL as the landing page sees it: path, ordered query pairs, fragment.
///
/// Relative inputs such as `/?tab=join` are resolved against a private base
/// and rendered back in relative form; absolute inputs keep their origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Location {
    /// The landing page itself, `/`.
    pub fn root() -> Self {
        Self { url: LOCAL_BASE.clone() }
    }

    pub fn parse(input: &str) -> Result<Self> {
        LOCAL_BASE
            .join(input.trim())
            .map(|url| Self { url })
            .map_err(|_| LobbyError::InvalidLocation(input.to_string()))
    }

    /// A location whose path is built from percent-encoded segments, plus a
    /// trailing slash when `trailing_slash` is set.
    ///
    /// `.` and `..` have no encoded form that survives URL parsing (`%2E` is
    /// read back as `.`), so they are rejected instead of dropped.
    pub fn from_segments(segments: &[&str], trailing_slash: bool) -> Result<Self> {
        if let Some(dot) = segments.iter().find(|s| is_dot_segment(s)) {
            return Err(LobbyError::InvalidLocation(format!(
                "/{} (dot segment '{dot}')",
                segments.join("/")
            )));
        }
        let mut url = LOCAL_BASE.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.clear().extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        Ok(Self { url })
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// First value of `key`, decoded.
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// All query pairs, decoded, in order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Copy with `key` set to `value`. The first occurrence is replaced in
    /// place, later duplicates removed, and every other pair kept in order.
    pub fn with_query_param(&self, key: &str, value: &str) -> Self {
        let mut replaced = false;
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (k, v) in self.query_pairs() {
            if k == key {
                if !replaced {
                    pairs.push((k, value.to_string()));
                    replaced = true;
                }
            } else {
                pairs.push((k, v));
            }
        }
        if !replaced {
            pairs.push((key.to_string(), value.to_string()));
        }

        let mut url = self.url.clone();
        url.query_pairs_mut().clear().extend_pairs(pairs);
        Self { url }
    }

    pub fn fragment(&self) -> Option<&str> {
        self.url.fragment().filter(|f| !f.is_empty())
    }

    pub fn with_fragment(&self, fragment: Option<&str>) -> Self {
        let mut url = self.url.clone();
        url.set_fragment(fragment);
        Self { url }
    }

    fn is_local(&self) -> bool {
        self.url.origin() == LOCAL_BASE.origin()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_local() {
            return f.write_str(self.url.as_str());
        }
        f.write_str(self.url.path())?;
        if let Some(query) = self.url.query() {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = self.url.fragment() {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Location {
    type Err = LobbyError;

    fn from_str(s: &str) -> Result<Self> {
        Location::parse(s)
    }
}

/// `true` for the segments URL path handling collapses.
pub fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

/// The host's navigation mechanism (browser history, router, terminal).
pub trait Navigator {
    /// Move to `location` without a full reload.
    fn push(&mut self, location: &Location);
}

/// A [`Navigator`] that remembers every pushed location.
#[derive(Debug, Default, Clone)]
pub struct RecordingNavigator {
    history: Vec<Location>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[Location] {
        &self.history
    }

    pub fn last(&self) -> Option<&Location> {
        self.history.last()
    }
}

impl Navigator for RecordingNavigator {
    fn push(&mut self, location: &Location) {
        tracing::debug!(location = %location, "navigate");
        self.history.push(location.clone());
    }
}

/// Keeps the displayed mode and the URL in sync.
pub struct NavigationController<N> {
    location: Location,
    navigator: N,
}

impl<N: Navigator> NavigationController<N> {
    pub fn new(location: Location, navigator: N) -> Self {
        Self { location, navigator }
    }

    /// Current mode, derived from the URL.
    pub fn mode(&self) -> NavigationMode {
        NavigationMode::from_location(&self.location)
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }

    /// Rewrite the `tab` parameter for `mode` and navigate there.
    pub fn select_mode(&mut self, mode: NavigationMode) {
        self.location = self.location.with_query_param(TAB_PARAM, mode.tab_value());
        self.navigator.push(&self.location);
    }

    /// The URL changed underneath us (back/forward). The mode follows.
    pub fn url_changed(&mut self, location: Location) {
        self.location = location;
    }

    /// Hand a launch destination to the host navigator.
    pub fn navigate_to(&mut self, destination: &Location) {
        self.navigator.push(destination);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
