//! # Ledger
//!
//! Records funding and redemption events on a blockchain and returns a
//! receipt that is stored alongside the database row.

use crate::config::{required, LedgerConfig};
use crate::error::Result;
use crate::http::{build_client, read_json, transport_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

const SERVICE: &str = "ledger";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub network: String,
    pub recorded_at: DateTime<Utc>,
    /// True when produced by the mock ledger
    pub mocked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundingRecord {
    pub disaster_id: i64,
    pub donor_id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedemptionRecord {
    pub voucher_code: String,
    pub disaster_id: i64,
    pub vendor_wallet: String,
    pub beneficiary_id: i64,
    pub amount: i64,
    pub category: String,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn record_funding(&self, record: &FundingRecord) -> Result<LedgerReceipt>;

    async fn record_redemption(&self, record: &RedemptionRecord) -> Result<LedgerReceipt>;

    /// Look up a previously recorded receipt.
    async fn get_receipt(&self, tx_hash: &str) -> Result<Option<LedgerReceipt>>;
}

// region: --- Mock

/// In-process ledger. Hashes are SHA-256 of the record plus a sequence number.
pub struct MockLedger {
    network: String,
    next_block: AtomicU64,
    receipts: RwLock<HashMap<String, LedgerReceipt>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            network: "mock".to_string(),
            next_block: AtomicU64::new(1),
            receipts: RwLock::new(HashMap::new()),
        }
    }

    async fn record(&self, kind: &str, payload: serde_json::Value) -> LedgerReceipt {
        let block_number = self.next_block.fetch_add(1, Ordering::SeqCst);
        let seed = format!("{kind}:{block_number}:{payload}");
        let receipt = LedgerReceipt {
            tx_hash: format!("0x{}", crate::digest_hex(seed.as_bytes())),
            block_number,
            network: self.network.clone(),
            recorded_at: Utc::now(),
            mocked: true,
        };
        debug!("[LEDGER] Mock {} recorded: {}", kind, receipt.tx_hash);
        self.receipts
            .write()
            .await
            .insert(receipt.tx_hash.clone(), receipt.clone());
        receipt
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn record_funding(&self, record: &FundingRecord) -> Result<LedgerReceipt> {
        Ok(self.record("funding", json!(record)).await)
    }

    async fn record_redemption(&self, record: &RedemptionRecord) -> Result<LedgerReceipt> {
        Ok(self.record("redemption", json!(record)).await)
    }

    async fn get_receipt(&self, tx_hash: &str) -> Result<Option<LedgerReceipt>> {
        Ok(self.receipts.read().await.get(tx_hash).cloned())
    }
}

// endregion: --- Mock

// region: --- HTTP

/// JSON-RPC ledger gateway.
pub struct HttpLedger {
    http: Client,
    rpc_url: String,
    network: String,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    message: String,
}

#[derive(Deserialize)]
struct RpcReceipt {
    tx_hash: String,
    block_number: u64,
}

impl HttpLedger {
    pub fn new(config: &LedgerConfig) -> Result<Self> {
        let rpc_url = required(&config.rpc_url, "BLOCKCHAIN_RPC_URL")?.to_string();
        info!("[LEDGER] RPC endpoint {} ({})", rpc_url, config.network);
        Ok(Self {
            http: build_client(SERVICE)?,
            rpc_url,
            network: config.network.clone(),
        })
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<Option<RpcReceipt>> {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": [params] });
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let rpc: RpcResponse<RpcReceipt> = read_json(SERVICE, response).await?;
        if let Some(err) = rpc.error {
            return Err(crate::Error::Provider { service: SERVICE, status: 200, message: err.message });
        }
        Ok(rpc.result)
    }

    async fn submit(&self, method: &str, params: serde_json::Value) -> Result<LedgerReceipt> {
        let result = self.call(method, params).await?.ok_or(crate::Error::InvalidResponse {
            service: SERVICE,
            message: "missing result".to_string(),
        })?;
        Ok(self.receipt(result))
    }

    fn receipt(&self, raw: RpcReceipt) -> LedgerReceipt {
        LedgerReceipt {
            tx_hash: raw.tx_hash,
            block_number: raw.block_number,
            network: self.network.clone(),
            recorded_at: Utc::now(),
            mocked: false,
        }
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn record_funding(&self, record: &FundingRecord) -> Result<LedgerReceipt> {
        self.submit("relief_recordFunding", json!(record)).await
    }

    async fn record_redemption(&self, record: &RedemptionRecord) -> Result<LedgerReceipt> {
        self.submit("relief_recordRedemption", json!(record)).await
    }

    async fn get_receipt(&self, tx_hash: &str) -> Result<Option<LedgerReceipt>> {
        let result = self
            .call("relief_getReceipt", json!({ "tx_hash": tx_hash }))
            .await?;
        Ok(result.map(|raw| self.receipt(raw)))
    }
}

// endregion: --- HTTP

#[cfg(test)]
mod tests {
    use super::*;

    fn redemption(amount: i64) -> RedemptionRecord {
        RedemptionRecord {
            voucher_code: "VCH-0123456789AB".to_string(),
            disaster_id: 1,
            vendor_wallet: "VendorWallet".to_string(),
            beneficiary_id: 2,
            amount,
            category: "food".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_receipts_are_unique_and_retrievable() {
        let ledger = MockLedger::new();

        let a = ledger.record_redemption(&redemption(100)).await.unwrap();
        let b = ledger.record_redemption(&redemption(100)).await.unwrap();

        assert!(a.mocked);
        assert_ne!(a.tx_hash, b.tx_hash);
        assert_eq!(b.block_number, a.block_number + 1);
        assert!(a.tx_hash.starts_with("0x"));
        assert_eq!(a.tx_hash.len(), 66);

        let found = ledger.get_receipt(&a.tx_hash).await.unwrap();
        assert_eq!(found, Some(a));
        assert!(ledger.get_receipt("0xmissing").await.unwrap().is_none());
    }

    #[test]
    fn test_http_ledger_requires_rpc_url() {
        let config = LedgerConfig { rpc_url: None, network: "testnet".to_string() };
        assert!(matches!(HttpLedger::new(&config), Err(crate::Error::Config(_))));
    }
}
