//! # Auth Errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Password must be at least 8 characters long")]
    PasswordTooShort,

    #[error("Failed to hash password: {0}")]
    PasswordHash(String),

    #[error("Failed to encode JWT: {0}")]
    TokenEncode(String),

    #[error("Invalid or expired token: {0}")]
    TokenInvalid(String),

    #[error("Invalid wallet address: {0}")]
    InvalidWallet(String),

    #[error("Invalid signature encoding")]
    SignatureFormat,

    #[error("Signature verification failed")]
    SignatureMismatch,
}
