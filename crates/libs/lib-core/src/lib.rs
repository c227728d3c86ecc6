//! # Core Library
//!
//! Core models, database, configuration, and request context for the application.

pub mod config;
pub mod ctx;
pub mod dto;
pub mod error;
pub mod model;

// Re-export commonly used types
pub use config::Config;
pub use ctx::Ctx;
pub use error::{AppError, Result};
pub use model::store::{create_pool, migrate, DbPool};
