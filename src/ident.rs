//! Session identifiers, default passphrases and the passphrase fragment codec.

use base64::{engine::general_purpose, Engine as _};
use rand::Rng;

use crate::error::{LobbyError, Result};

/// Alphabet for random tokens. Lowercase so ids stay easy to read aloud.
pub const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a freshly generated default passphrase.
pub const DEFAULT_PASSPHRASE_LEN: usize = 64;

/// Characters per group in a session id.
const SESSION_GROUP_LEN: usize = 4;

/// Generate a random token of `length` characters from [`TOKEN_ALPHABET`].
///
/// Safe to embed in a URL path segment as-is.
pub fn random_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Generate a short session id such as `k3f9-a0zq`.
///
/// Two four-character groups give 36^8 combinations, so ids are created
/// locally without asking the registry whether the name is taken.
pub fn generate_session_id() -> String {
    format!(
        "{}-{}",
        random_token(SESSION_GROUP_LEN),
        random_token(SESSION_GROUP_LEN)
    )
}

/// A fresh default passphrase for E2EE sessions.
pub fn default_passphrase() -> String {
    random_token(DEFAULT_PASSPHRASE_LEN)
}

/// Encode a passphrase for the URL fragment (base64url, no padding).
///
/// This is a transport encoding only. It hides nothing.
pub fn encode_passphrase(raw: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

/// Reverse [`encode_passphrase`].
///
/// A leading `#` is tolerated so a raw `location.hash` can be passed in.
pub fn decode_passphrase(encoded: &str) -> Result<String> {
    let encoded = encoded.strip_prefix('#').unwrap_or(encoded);
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(encoded.as_bytes())
        .map_err(|e| LobbyError::InvalidPassphrase(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| LobbyError::InvalidPassphrase(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_token_length() {
        assert_eq!(random_token(0).len(), 0);
        assert_eq!(random_token(12).len(), 12);
        assert_eq!(random_token(DEFAULT_PASSPHRASE_LEN).len(), 64);
    }

    #[test]
    fn test_random_token_uses_alphabet_only() {
        let token = random_token(500);
        assert!(token.bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_session_id_shape() {
        let id = generate_session_id();
        let groups: Vec<&str> = id.split('-').collect();
        assert_eq!(groups.len(), 2, "id: {id}");
        assert!(groups.iter().all(|g| g.len() == 4));
        assert!(id.chars().all(|c| c == '-' || c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_session_ids_do_not_collide() {
        let ids: HashSet<String> = (0..5000).map(|_| generate_session_id()).collect();
        assert_eq!(ids.len(), 5000);
    }

    #[test]
    fn test_encode_output_is_fragment_safe() {
        let encoded = encode_passphrase("p@ss w0rd/#?&=+%ünïcode");
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_decode_accepts_leading_hash() {
        let encoded = format!("#{}", encode_passphrase("secret"));
        assert_eq!(decode_passphrase(&encoded).unwrap(), "secret");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_passphrase("not*base64!").unwrap_err();
        assert!(matches!(err, LobbyError::InvalidPassphrase(_)));
    }

    #[test]
    fn test_empty_passphrase_encodes_to_empty() {
        assert_eq!(encode_passphrase(""), "");
        assert_eq!(decode_passphrase("").unwrap(), "");
    }

    proptest! {
        #[test]
        fn prop_passphrase_roundtrip(raw in "\\PC*") {
            prop_assert_eq!(decode_passphrase(&encode_passphrase(&raw)).unwrap(), raw);
        }
    }
}
