//! # Integration Configuration
//!
//! Loaded from environment variables. Mock mode needs nothing; live mode needs
//! the endpoint (and key, where the provider requires one) of every client.

use crate::error::{Error, Result};
use lib_utils::envs::{get_env, get_env_or};

pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud/ipfs";
pub const DEFAULT_NETWORK: &str = "testnet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMode {
    Mock,
    Live,
}

#[derive(Debug, Clone, Default)]
pub struct LedgerConfig {
    pub rpc_url: Option<String>,
    pub network: String,
}

#[derive(Debug, Clone, Default)]
pub struct EmailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Default)]
pub struct SmsConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Default)]
pub struct IpfsConfig {
    pub api_url: String,
    pub jwt: Option<String>,
    pub gateway_url: String,
}

#[derive(Debug, Clone)]
pub struct IntegrationsConfig {
    pub mode: IntegrationMode,
    pub ledger: LedgerConfig,
    pub email: EmailConfig,
    pub sms: SmsConfig,
    pub ipfs: IpfsConfig,
}

impl IntegrationsConfig {
    /// Read configuration from the environment.
    ///
    /// # Errors
    ///
    /// Fails on an unknown `INTEGRATIONS_MODE`.
    pub fn from_env() -> Result<Self> {
        let mode = match get_env_or("INTEGRATIONS_MODE", "mock").to_lowercase().as_str() {
            "mock" => IntegrationMode::Mock,
            "live" => IntegrationMode::Live,
            other => {
                return Err(Error::Config(format!(
                    "INTEGRATIONS_MODE must be 'mock' or 'live', got '{other}'"
                )))
            }
        };

        Ok(Self {
            mode,
            ledger: LedgerConfig {
                rpc_url: get_env("BLOCKCHAIN_RPC_URL").ok(),
                network: get_env_or("BLOCKCHAIN_NETWORK", DEFAULT_NETWORK),
            },
            email: EmailConfig {
                api_url: get_env("EMAIL_API_URL").ok(),
                api_key: get_env("EMAIL_API_KEY").ok(),
                from: get_env_or("EMAIL_FROM", "noreply@reliefledger.org"),
            },
            sms: SmsConfig {
                api_url: get_env("SMS_API_URL").ok(),
                api_key: get_env("SMS_API_KEY").ok(),
                from: get_env_or("SMS_FROM", "ReliefLedger"),
            },
            ipfs: IpfsConfig {
                api_url: get_env_or("PINATA_API_URL", DEFAULT_PINATA_API_URL),
                jwt: get_env("PINATA_JWT").ok(),
                gateway_url: get_env_or("IPFS_GATEWAY_URL", DEFAULT_GATEWAY_URL),
            },
        })
    }

    /// Mock mode with default endpoints.
    pub fn mock() -> Self {
        Self {
            mode: IntegrationMode::Mock,
            ledger: LedgerConfig { rpc_url: None, network: DEFAULT_NETWORK.to_string() },
            email: EmailConfig::default(),
            sms: SmsConfig::default(),
            ipfs: IpfsConfig {
                api_url: DEFAULT_PINATA_API_URL.to_string(),
                jwt: None,
                gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            },
        }
    }
}

/// Unwrap a required live-mode setting.
pub(crate) fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{name} must be set when INTEGRATIONS_MODE=live")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_missing_and_blank() {
        assert!(required(&None, "PINATA_JWT").is_err());
        assert!(required(&Some("  ".to_string()), "PINATA_JWT").is_err());
        assert_eq!(required(&Some("jwt".to_string()), "PINATA_JWT").unwrap(), "jwt");
    }

    #[test]
    fn test_mock_config_defaults() {
        let config = IntegrationsConfig::mock();
        assert_eq!(config.mode, IntegrationMode::Mock);
        assert_eq!(config.ipfs.gateway_url, DEFAULT_GATEWAY_URL);
    }
}
