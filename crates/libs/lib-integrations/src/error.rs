//! # Integration Errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid client configuration
    #[error("Integration configuration error: {0}")]
    Config(String),

    /// Transport failure before a response arrived
    #[error("{service} request failed: {message}")]
    Http { service: &'static str, message: String },

    /// Provider answered with a non-success status
    #[error("{service} returned {status}: {message}")]
    Provider {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// Provider answered with a body we could not read
    #[error("{service} returned an unexpected response: {message}")]
    InvalidResponse { service: &'static str, message: String },
}
