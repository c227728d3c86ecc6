//! # API Keys
//!
//! Keys are shown to the caller once. Only the SHA-256 digest and a short
//! display prefix are persisted.

use lib_utils::b64u_encode;
use rand::RngCore;
use sha2::{Digest, Sha256};

const KEY_PREFIX: &str = "rlk_";

/// Freshly generated API key.
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    /// Full key, returned to the client once
    pub raw: String,
    /// First characters of the key, for display
    pub prefix: String,
    /// Hex SHA-256 of the full key
    pub hash: String,
}

/// Generate a new random API key.
pub fn generate_api_key() -> GeneratedApiKey {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);

    let raw = format!("{}{}", KEY_PREFIX, b64u_encode(bytes));
    let prefix = raw.chars().take(KEY_PREFIX.len() + 8).collect();
    let hash = hash_api_key(&raw);

    GeneratedApiKey { raw, prefix, hash }
}

/// Hex SHA-256 digest used to look keys up.
pub fn hash_api_key(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_shape() {
        let key = generate_api_key();

        assert!(key.raw.starts_with("rlk_"));
        assert_eq!(key.prefix.len(), 12);
        assert!(key.raw.starts_with(&key.prefix));
        assert_eq!(key.hash, hash_api_key(&key.raw));
        assert_eq!(key.hash.len(), 64);
    }

    #[test]
    fn test_keys_are_unique() {
        assert_ne!(generate_api_key().raw, generate_api_key().raw);
    }
}
