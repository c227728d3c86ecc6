//! # Web Library
//!
//! HTTP handlers, middleware, routes, and web services for the ReliefLedger
//! API.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod server;

pub use server::{create_router, start_server, AppState, ServerConfig};
