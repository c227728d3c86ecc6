//! # Integrations Library
//!
//! Clients for the systems ReliefLedger talks to outside its own database:
//! a blockchain ledger, email and SMS gateways, and IPFS pinning.
//!
//! Every client sits behind an `async_trait` so handlers depend on
//! `Arc<dyn Trait>`. In `mock` mode the clients answer locally with
//! deterministic identifiers; in `live` mode they call the configured HTTP APIs.

pub mod config;
pub mod error;
pub mod ipfs;
pub mod ledger;
pub mod messaging;

mod http;

pub use config::{IntegrationMode, IntegrationsConfig};
pub use error::{Error, Result};
pub use ipfs::{IpfsPinner, MockPinner, PinataPinner, PinnedContent};
pub use ledger::{
    FundingRecord, HttpLedger, Ledger, LedgerReceipt, MockLedger, RedemptionRecord,
};
pub use messaging::{
    DeliveryReceipt, EmailSender, HttpEmailSender, HttpSmsSender, MockEmailSender, MockSmsSender,
    SmsSender,
};

use std::sync::Arc;
use tracing::info;

/// The full set of external clients used by the web layer.
#[derive(Clone)]
pub struct Integrations {
    pub ledger: Arc<dyn Ledger>,
    pub email: Arc<dyn EmailSender>,
    pub sms: Arc<dyn SmsSender>,
    pub ipfs: Arc<dyn IpfsPinner>,
}

impl Integrations {
    /// Build clients for the configured mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if live mode lacks a required URL or key.
    pub fn from_config(config: &IntegrationsConfig) -> Result<Self> {
        match config.mode {
            IntegrationMode::Mock => {
                info!("[INTEGRATIONS] Using mock clients");
                Ok(Self::mock_with_gateway(&config.ipfs.gateway_url))
            }
            IntegrationMode::Live => {
                info!("[INTEGRATIONS] Using live clients");
                Ok(Self {
                    ledger: Arc::new(HttpLedger::new(&config.ledger)?),
                    email: Arc::new(HttpEmailSender::new(&config.email)?),
                    sms: Arc::new(HttpSmsSender::new(&config.sms)?),
                    ipfs: Arc::new(PinataPinner::new(&config.ipfs)?),
                })
            }
        }
    }

    /// Mock clients with the default gateway.
    pub fn mock() -> Self {
        Self::mock_with_gateway(config::DEFAULT_GATEWAY_URL)
    }

    fn mock_with_gateway(gateway_url: &str) -> Self {
        Self {
            ledger: Arc::new(MockLedger::new()),
            email: Arc::new(MockEmailSender),
            sms: Arc::new(MockSmsSender),
            ipfs: Arc::new(MockPinner::new(gateway_url)),
        }
    }
}

/// Hex SHA-256 of `data`. Mock identifiers are derived from it.
pub(crate) fn digest_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(data))
}
