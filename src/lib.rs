//! # meet-lobby
//!
//! Landing controller for a video meeting app: start a new session, connect
//! to a self-hosted server, or rejoin a session that has people in it.
//!
//! ## Modules
//! - [`ident`]: session ids, default passphrases, passphrase fragment codec
//! - [`registry`]: client for the remote room registry
//! - [`directory`]: directory state machine and presentation helpers
//! - [`poller`]: cancellable background poll cycle over the registry
//! - [`navigation`]: `?tab=` mode selection kept in sync with the URL
//! - [`launch`]: quick-start, custom-connect and join-existing flows
//! - [`server`]: local HTTP endpoint listing active rooms
//! - [`config`]: registry settings from TOML and the environment

pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod ident;
pub mod launch;
pub mod navigation;
pub mod poller;
pub mod registry;
pub mod server;

pub use directory::{format_age, DirectoryState, DirectoryView, PollPhase};
pub use error::{LobbyError, Result};
pub use ident::{decode_passphrase, encode_passphrase, generate_session_id, random_token};
pub use launch::{CustomConnect, E2eeOptions, JoinExisting, QuickStart, SessionCredential};
pub use navigation::{Location, NavigationController, NavigationMode, Navigator};
pub use poller::{DirectoryPoller, PollerHandle};
pub use registry::{RegistryClient, RoomRegistry, RoomSummary};
