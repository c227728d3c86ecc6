//! # Administrative DTOs
//!
//! Notifications, analytics, audit, settings, cache and IPFS endpoints.

use crate::model::store::enums::{NotificationChannel, Role};
use crate::model::store::models::Vendor;
use crate::model::store::transaction_repository::{CategoryVolume, DailyVolume};
use crate::model::store::Page;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::relief::VoucherCounts;

// region: --- Notifications

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl NotificationListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

/// Target one user with `user_id` or every active user of a `role`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendNotificationRequest {
    pub user_id: Option<i64>,
    pub role: Option<Role>,
    pub title: String,
    pub message: String,
    pub kind: Option<String>,
    /// Defaults to in-app only
    pub channels: Option<Vec<NotificationChannel>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SendNotificationResult {
    pub recipients: usize,
    pub in_app: usize,
    pub email_sent: usize,
    pub sms_sent: usize,
    /// Deliveries that failed and were queued for retry
    pub queued_for_retry: usize,
    /// Recipients lacking an email address or phone for a requested channel
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

// endregion: --- Notifications

// region: --- Analytics

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<i64>,
    pub limit: Option<i64>,
    pub disaster_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingOverview {
    pub raised: i64,
    pub allocated: i64,
    pub disbursed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overview {
    pub disasters: i64,
    pub active_disasters: i64,
    pub funding: FundingOverview,
    pub vouchers: VoucherCounts,
    pub vendors: i64,
    pub approved_vendors: i64,
    pub transactions: i64,
    pub transaction_volume: i64,
    pub beneficiaries: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisasterBreakdown {
    pub disaster_id: i64,
    pub by_category: Vec<CategoryVolume>,
    pub top_vendors: Vec<Vendor>,
    pub daily: Vec<DailyVolume>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeseries {
    pub days: i64,
    pub since: DateTime<Utc>,
    pub points: Vec<DailyVolume>,
}

// endregion: --- Analytics

// region: --- Audit

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditListQuery {
    pub user_id: Option<i64>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl AuditListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

// endregion: --- Audit

// region: --- Settings & Cache

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertSettingRequest {
    pub value: Value,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheInvalidateQuery {
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheInvalidated {
    pub pattern: String,
    pub removed: u64,
}

// endregion: --- Settings & Cache

// region: --- IPFS

#[derive(Debug, Clone, Deserialize)]
pub struct PinJsonRequest {
    pub name: Option<String>,
    pub content: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayInfo {
    pub cid: String,
    pub gateway_url: String,
}

// endregion: --- IPFS
