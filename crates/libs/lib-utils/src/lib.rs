//! # Utilities Library
//!
//! Shared utility functions for base64 encoding, environment variables, time, and validation.

pub mod b64;
pub mod envs;
pub mod time;
pub mod validation;

// Re-export commonly used functions
pub use b64::{b64u_encode, b64u_decode};
pub use envs::{get_env, get_env_or, get_env_parse, get_env_parse_or};
pub use time::days_from_now;
pub use validation::{
    validate_email, validate_max_length, validate_min_length, validate_not_empty, validate_phone,
};
