//! Directory state: the latest known room list plus loading/error status.
//!
//! [`Directory`] is the state machine the poller drives. It is synchronous
//! and owns nothing but data, so every transition can be exercised without a
//! runtime. The poller in [`crate::poller`] publishes [`DirectoryState`]
//! snapshots to readers.
//!
//! ```text
//!   Idle ──begin──▶ Polling ──ok──▶ Ready ──begin──▶ Polling ...
//!                      │
//!                      └──err──▶ Failed ──begin──▶ Polling ...
//! ```

use serde::Serialize;

use crate::error::LobbyError;
use crate::registry::RoomSummary;

/// Message shown when a cycle fails. Upstream detail is logged, not shown.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch active rooms";

/// Where the poll cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PollPhase {
    Idle,
    Polling,
    Ready,
    Failed,
}

/// Snapshot handed to readers of the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryState {
    /// Rooms in registry order.
    pub rooms: Vec<RoomSummary>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub phase: PollPhase,
}

impl Default for DirectoryState {
    fn default() -> Self {
        Self {
            rooms: Vec::new(),
            is_loading: false,
            error: None,
            phase: PollPhase::Idle,
        }
    }
}

/// What a directory view should render for a given snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryView<'a> {
    /// Nothing loaded yet and a fetch is underway.
    Loading,
    /// Nothing was ever loaded and the last fetch failed.
    Failed(&'a str),
    /// A successful fetch came back with no rooms.
    Empty,
    /// Rooms to show, with an inline error if the latest refresh failed.
    Listing {
        rooms: &'a [RoomSummary],
        error: Option<&'a str>,
        refreshing: bool,
    },
}

impl DirectoryState {
    pub fn find_room(&self, name: &str) -> Option<&RoomSummary> {
        self.rooms.iter().find(|r| r.name == name)
    }

    /// Presentation rules: stale data stays on screen and errors are shown
    /// next to it; the empty message only appears after a clean, empty fetch.
    pub fn view(&self) -> DirectoryView<'_> {
        if !self.rooms.is_empty() {
            return DirectoryView::Listing {
                rooms: &self.rooms,
                error: self.error.as_deref(),
                refreshing: self.is_loading,
            };
        }
        match (self.phase, self.error.as_deref()) {
            (_, Some(msg)) if !self.is_loading => DirectoryView::Failed(msg),
            (PollPhase::Ready, None) => DirectoryView::Empty,
            _ => DirectoryView::Loading,
        }
    }
}

/// The poll-cycle state machine.
#[derive(Debug, Default)]
pub struct Directory {
    state: DirectoryState,
    deactivated: bool,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DirectoryState {
        &self.state
    }

    pub fn is_polling(&self) -> bool {
        self.state.phase == PollPhase::Polling
    }

    pub fn is_deactivated(&self) -> bool {
        self.deactivated
    }

    /// Enter `Polling`. Returns `false` (and changes nothing) when a cycle is
    /// already in flight or the directory has been deactivated.
    pub fn begin_poll(&mut self) -> bool {
        if self.deactivated || self.is_polling() {
            return false;
        }
        self.state.phase = PollPhase::Polling;
        self.state.is_loading = true;
        self.state.error = None;
        true
    }

    /// Finish the in-flight cycle. Returns `false` when the result was
    /// discarded because no cycle was in flight or the view is gone.
    pub fn complete(&mut self, result: Result<Vec<RoomSummary>, LobbyError>) -> bool {
        if self.deactivated || !self.is_polling() {
            return false;
        }
        self.state.is_loading = false;
        match result {
            Ok(rooms) => {
                self.state.rooms = rooms;
                self.state.phase = PollPhase::Ready;
            }
            Err(_) => {
                // Previous rooms stay put.
                self.state.error = Some(FETCH_FAILED_MESSAGE.to_string());
                self.state.phase = PollPhase::Failed;
            }
        }
        true
    }

    /// Tear down. No transition is accepted afterwards.
    pub fn deactivate(&mut self) {
        self.deactivated = true;
    }
}

/// Human age of a room: `"42s ago"`, `"3m ago"`, `"5h ago"`.
///
/// A creation time in the future (clock skew) reads as `"0s ago"`.
pub fn format_age(created_at_epoch_seconds: i64, now_epoch_seconds: i64) -> String {
    let seconds = now_epoch_seconds.saturating_sub(created_at_epoch_seconds).max(0);
    if seconds < 60 {
        return format!("{seconds}s ago");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    format!("{}h ago", minutes / 60)
}

/// `"1 participant"`, `"3 participants"`.
pub fn participants_label(count: u32) -> String {
    if count == 1 {
        "1 participant".to_string()
    } else {
        format!("{count} participants")
    }
}

impl RoomSummary {
    pub fn age_label(&self, now_epoch_seconds: i64) -> String {
        format_age(self.created_at_epoch_seconds, now_epoch_seconds)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
