//! # IPFS Pinning
//!
//! Stores proof-of-aid files and JSON documents on IPFS through the Pinata
//! pinning API.

use crate::config::{required, IpfsConfig};
use crate::error::Result;
use crate::http::{build_client, ensure_success, read_json, transport_error};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

const SERVICE: &str = "pinata";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PinnedContent {
    pub cid: String,
    pub size: u64,
    pub gateway_url: String,
}

#[async_trait]
pub trait IpfsPinner: Send + Sync {
    async fn pin_file(&self, name: &str, content_type: &str, bytes: Vec<u8>) -> Result<PinnedContent>;

    async fn pin_json(&self, name: &str, content: &Value) -> Result<PinnedContent>;

    async fn unpin(&self, cid: &str) -> Result<()>;

    /// Public gateway URL for a CID.
    fn gateway_url(&self, cid: &str) -> String;
}

fn join_gateway(gateway: &str, cid: &str) -> String {
    format!("{}/{}", gateway.trim_end_matches('/'), cid)
}

// region: --- Mock

/// Content-addressed without a network: the CID is derived from SHA-256 of the bytes.
pub struct MockPinner {
    gateway: String,
}

impl MockPinner {
    pub fn new(gateway: &str) -> Self {
        Self { gateway: gateway.to_string() }
    }

    fn pinned(&self, bytes: &[u8]) -> PinnedContent {
        let cid = format!("bafkmock{}", &crate::digest_hex(bytes)[..46]);
        PinnedContent { gateway_url: self.gateway_url(&cid), cid, size: bytes.len() as u64 }
    }
}

#[async_trait]
impl IpfsPinner for MockPinner {
    async fn pin_file(&self, name: &str, _content_type: &str, bytes: Vec<u8>) -> Result<PinnedContent> {
        debug!("[IPFS] Mock pin file {} ({} bytes)", name, bytes.len());
        Ok(self.pinned(&bytes))
    }

    async fn pin_json(&self, name: &str, content: &Value) -> Result<PinnedContent> {
        debug!("[IPFS] Mock pin json {}", name);
        Ok(self.pinned(content.to_string().as_bytes()))
    }

    async fn unpin(&self, cid: &str) -> Result<()> {
        debug!("[IPFS] Mock unpin {}", cid);
        Ok(())
    }

    fn gateway_url(&self, cid: &str) -> String {
        join_gateway(&self.gateway, cid)
    }
}

// endregion: --- Mock

// region: --- Pinata

pub struct PinataPinner {
    http: Client,
    api_url: String,
    jwt: String,
    gateway: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinResponse {
    ipfs_hash: String,
    pin_size: u64,
}

impl PinataPinner {
    pub fn new(config: &IpfsConfig) -> Result<Self> {
        let jwt = required(&config.jwt, "PINATA_JWT")?.to_string();
        info!("[IPFS] Pinata endpoint {}", config.api_url);
        Ok(Self {
            http: build_client(SERVICE)?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            jwt,
            gateway: config.gateway_url.clone(),
        })
    }

    fn pinned(&self, raw: PinResponse) -> PinnedContent {
        PinnedContent {
            gateway_url: self.gateway_url(&raw.ipfs_hash),
            cid: raw.ipfs_hash,
            size: raw.pin_size,
        }
    }
}

#[async_trait]
impl IpfsPinner for PinataPinner {
    async fn pin_file(&self, name: &str, content_type: &str, bytes: Vec<u8>) -> Result<PinnedContent> {
        let part = Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(content_type)
            .map_err(|e| crate::Error::InvalidResponse { service: SERVICE, message: e.to_string() })?;
        let form = Form::new()
            .part("file", part)
            .text("pinataMetadata", json!({ "name": name }).to_string());

        let response = self
            .http
            .post(format!("{}/pinning/pinFileToIPFS", self.api_url))
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let raw: PinResponse = read_json(SERVICE, response).await?;
        Ok(self.pinned(raw))
    }

    async fn pin_json(&self, name: &str, content: &Value) -> Result<PinnedContent> {
        let response = self
            .http
            .post(format!("{}/pinning/pinJSONToIPFS", self.api_url))
            .bearer_auth(&self.jwt)
            .json(&json!({ "pinataContent": content, "pinataMetadata": { "name": name } }))
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let raw: PinResponse = read_json(SERVICE, response).await?;
        Ok(self.pinned(raw))
    }

    async fn unpin(&self, cid: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/pinning/unpin/{}", self.api_url, cid))
            .bearer_auth(&self.jwt)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    fn gateway_url(&self, cid: &str) -> String {
        join_gateway(&self.gateway, cid)
    }
}

// endregion: --- Pinata
