//! # Middleware
//!
//! Axum middleware for authentication, request stamping, logging and
//! response mapping.
//!
//! ## Modules
//!
//! - **[`mw_auth`]**: bearer session / API key authentication
//! - **[`mw_req_stamp`]**: Request ID and timestamp stamping
//! - **[`mw_logging`]**: request/response logging
//! - **[`mw_res_map`]**: JSON envelope for framework rejections

// region: --- Modules
pub mod mw_auth;
pub mod mw_logging;
pub mod mw_req_stamp;
pub mod mw_res_map;
// endregion: --- Modules

// region: --- Re-exports
pub use mw_auth::{optional_auth, require_auth, OptionalCtx};
pub use mw_logging::{client_ip, log_requests};
pub use mw_req_stamp::{stamp_req, RequestStamp};
pub use mw_res_map::map_res;
// endregion: --- Re-exports
