//! Opaque bearer secrets (refresh and password-reset tokens)
//!
//! The raw secret goes to the client exactly once. Only its SHA-256 digest is
//! persisted, so a leaked table cannot be replayed.

use rand::Rng;
use sha2::{Digest, Sha256};
use sso_shared::constants::OPAQUE_TOKEN_BYTES;

/// 256 bits from the thread CSPRNG, hex encoded.
pub fn generate_opaque_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; OPAQUE_TOKEN_BYTES] = rng.random();
    hex::encode(bytes)
}

/// Hex SHA-256 of a raw secret; the value stored and looked up by the stores.
pub fn digest_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = generate_opaque_token();
        assert_eq!(token.len(), OPAQUE_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_unique() {
        let tokens: std::collections::HashSet<String> =
            (0..256).map(|_| generate_opaque_token()).collect();
        assert_eq!(tokens.len(), 256);
    }

    #[test]
    fn test_digest_deterministic_and_distinct() {
        assert_eq!(digest_token("abc"), digest_token("abc"));
        assert_ne!(digest_token("abc"), digest_token("abd"));
        assert_eq!(
            digest_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
