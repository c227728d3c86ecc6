//! # Model Layer
//!
//! Entities, stored enumerations and repositories.

pub mod store;
