//! # Messaging
//!
//! Outbound email and SMS. Live senders post JSON to a provider gateway
//! authenticated with a bearer key.

use crate::config::{required, EmailConfig, SmsConfig};
use crate::error::Result;
use crate::http::{build_client, read_json, transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryReceipt {
    pub provider_id: String,
    pub mocked: bool,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<DeliveryReceipt>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt>;
}

fn mock_receipt(prefix: &str, seed: &str) -> DeliveryReceipt {
    let digest = crate::digest_hex(seed.as_bytes());
    DeliveryReceipt { provider_id: format!("{prefix}_{}", &digest[..24]), mocked: true }
}

// region: --- Mock

pub struct MockEmailSender;

#[async_trait]
impl EmailSender for MockEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<DeliveryReceipt> {
        debug!("[EMAIL] Mock send to {}: {}", to, subject);
        Ok(mock_receipt("email", &format!("{to}|{subject}|{body}")))
    }
}

pub struct MockSmsSender;

#[async_trait]
impl SmsSender for MockSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt> {
        debug!("[SMS] Mock send to {}", to);
        Ok(mock_receipt("sms", &format!("{to}|{body}")))
    }
}

// endregion: --- Mock

// region: --- HTTP

#[derive(Deserialize)]
struct ProviderResponse {
    id: String,
}

pub struct HttpEmailSender {
    http: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailSender {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let api_url = required(&config.api_url, "EMAIL_API_URL")?.to_string();
        let api_key = required(&config.api_key, "EMAIL_API_KEY")?.to_string();
        info!("[EMAIL] Provider endpoint {}", api_url);
        Ok(Self { http: build_client("email")?, api_url, api_key, from: config.from.clone() })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<DeliveryReceipt> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "from": self.from, "to": to, "subject": subject, "text": body }))
            .send()
            .await
            .map_err(|e| transport_error("email", e))?;
        let sent: ProviderResponse = read_json("email", response).await?;
        Ok(DeliveryReceipt { provider_id: sent.id, mocked: false })
    }
}

pub struct HttpSmsSender {
    http: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpSmsSender {
    pub fn new(config: &SmsConfig) -> Result<Self> {
        let api_url = required(&config.api_url, "SMS_API_URL")?.to_string();
        let api_key = required(&config.api_key, "SMS_API_KEY")?.to_string();
        info!("[SMS] Provider endpoint {}", api_url);
        Ok(Self { http: build_client("sms")?, api_url, api_key, from: config.from.clone() })
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "from": self.from, "to": to, "body": body }))
            .send()
            .await
            .map_err(|e| transport_error("sms", e))?;
        let sent: ProviderResponse = read_json("sms", response).await?;
        Ok(DeliveryReceipt { provider_id: sent.id, mocked: false })
    }
}

// endregion: --- HTTP
