//! # Room registry
//!
//! Client for the remote room service that tracks live sessions.
//!
//! ## What It Does
//!
//! 1. **Auth**: signs a short-lived HS256 admin token from the configured
//!    API key/secret pair ([`auth`]).
//! 2. **Listing**: calls the service's `ListRooms` endpoint and converts the
//!    raw records into [`RoomSummary`] values, keeping only rooms that have
//!    participants ([`converter`]).
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = RegistryClient::builder(RegistrySettings::from_env())
//!     .request_timeout(Duration::from_secs(5))
//!     .build();
//! let rooms = client.list_active_rooms().await?;
//! ```

pub mod auth;
pub mod client;
pub mod converter;

pub use client::{RegistryClient, RegistryClientBuilder, RoomRegistry, LIST_ROOMS_PATH};
pub use converter::{active_rooms, ListRoomsResponse, RawRoom, RoomSummary};
