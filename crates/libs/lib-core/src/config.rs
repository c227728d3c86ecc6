//! # Application Configuration
//!
//! This module manages application configuration loaded from environment variables.
//! All configuration is validated on startup to fail fast if misconfigured.
//!
//! Runtime-tunable values (voucher expiry, upload limits, ...) are not here; they
//! live in the `system_settings` table so administrators can change them without
//! a restart.

use lib_utils::{get_env, get_env_or, get_env_parse_or};

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite database connection URL
    pub database_url: String,

    /// Secret key for JWT token signing and verification
    ///
    /// **Must be at least 32 characters long** for security.
    pub jwt_secret: String,

    /// JWT token validity period in hours
    ///
    /// Valid range: 1-720 hours (1 hour to 30 days)
    pub jwt_expiration_hours: i64,

    /// Default time-to-live for cached reads, in seconds
    pub cache_ttl_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = get_env_or("DATABASE_URL", "sqlite:data/relief.db");

        let jwt_secret = get_env("JWT_SECRET").map_err(|e| e.to_string())?;

        let jwt_expiration_hours =
            get_env_parse_or("JWT_EXPIRATION_HOURS", 24).map_err(|e| e.to_string())?;

        let cache_ttl_seconds =
            get_env_parse_or("CACHE_TTL_SECONDS", 300).map_err(|e| e.to_string())?;

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration_hours,
            cache_ttl_seconds,
        })
    }

    /// Validate configuration values against security and business rules.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters long".to_string());
        }

        if self.jwt_expiration_hours < 1 || self.jwt_expiration_hours > 720 {
            return Err("JWT_EXPIRATION_HOURS must be between 1 and 720 (30 days)".to_string());
        }

        if self.cache_ttl_seconds == 0 || self.cache_ttl_seconds > 86_400 {
            return Err("CACHE_TTL_SECONDS must be between 1 and 86400".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret-key-must-be-at-least-32-characters-long!".to_string(),
            jwt_expiration_hours: 24,
            cache_ttl_seconds: 300,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let cfg = Config { jwt_secret: "short".to_string(), ..config() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_expiration_bounds() {
        let cfg = Config { jwt_expiration_hours: 721, ..config() };
        assert!(cfg.validate().is_err());

        let cfg = Config { jwt_expiration_hours: 0, ..config() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_cache_ttl_bounds() {
        let cfg = Config { cache_ttl_seconds: 0, ..config() };
        assert!(cfg.validate().is_err());
    }
}
