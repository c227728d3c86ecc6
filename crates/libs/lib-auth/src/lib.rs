//! # Authentication Library
//!
//! Password hashing, JWT session tokens, wallet signature checks and API keys.

pub mod api_key;
pub mod error;
pub mod pwd;
pub mod token;
pub mod wallet;

// Re-export commonly used types
pub use api_key::{generate_api_key, hash_api_key, GeneratedApiKey};
pub use error::{Error, Result};
pub use pwd::{hash_password, verify_password};
pub use token::{decode_jwt, encode_jwt, Claims};
pub use wallet::{login_message, validate_wallet_address, verify_wallet_signature};
