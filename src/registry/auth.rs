//! Admin token for the registry's room service.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use crate::error::{LobbyError, Result};

/// Lifetime of a room-list token. Each poll signs a fresh one.
pub const TOKEN_TTL_SECS: u64 = 600;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoGrant {
    room_list: bool,
}

#[derive(Debug, Serialize)]
struct AdminClaims<'a> {
    iss: &'a str,
    nbf: u64,
    exp: u64,
    video: VideoGrant,
}

/// Sign an HS256 token granting `roomList`, issued by `api_key`.
pub fn room_list_token(api_key: &str, api_secret: &str, now_secs: u64) -> Result<String> {
    let claims = AdminClaims {
        iss: api_key,
        nbf: now_secs,
        exp: now_secs + TOKEN_TTL_SECS,
        video: VideoGrant { room_list: true },
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(api_secret.as_bytes()),
    )
    .map_err(|e| LobbyError::RegistryUnavailable {
        detail: format!("failed to sign registry token: {e}"),
    })
}
