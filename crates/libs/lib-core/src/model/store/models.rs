//! # Entities
//!
//! Row types for every table plus the `*ForCreate` / `*ForUpdate` payloads the
//! repositories accept. Entities serialize directly as API output; secrets are
//! skipped.

use super::enums::{
    DisasterSeverity, DisasterStatus, JobStatus, ProofStatus, Role, TransactionStatus,
    VendorStatus, VoucherStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

// region: --- Accounts

/// Wallet-identified account.
///
/// Secrets never leave the server: they are skipped on output and come back
/// empty when a cached profile is read.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub wallet_address: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<i64>,
    pub is_active: bool,
    #[serde(skip_serializing, default)]
    pub nonce: String,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data structure for creating a new user.
///
/// Password should be hashed before creating.
#[derive(Debug, Clone)]
pub struct UserForCreate {
    pub wallet_address: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
}

/// Profile fields a user may change. Only provided fields are updated.
#[derive(Debug, Clone, Default)]
pub struct UserForUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApiKey {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub key_prefix: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at.map_or(true, |exp| exp > now)
    }
}

// endregion: --- Accounts

// region: --- Relief

/// Funded disaster zone.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Disaster {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    #[sqlx(try_from = "String")]
    pub severity: DisasterSeverity,
    #[sqlx(try_from = "String")]
    pub status: DisasterStatus,
    pub funding_goal: i64,
    pub total_funding: i64,
    pub total_allocated: i64,
    pub total_disbursed: i64,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Disaster {
    /// Funds received but not yet promised to a voucher.
    pub fn unallocated_funds(&self) -> i64 {
        self.total_funding - self.total_allocated
    }
}

#[derive(Debug, Clone)]
pub struct DisasterForCreate {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub severity: DisasterSeverity,
    pub funding_goal: i64,
    pub created_by: i64,
}

#[derive(Debug, Clone, Default)]
pub struct DisasterForUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
    pub severity: Option<DisasterSeverity>,
    pub status: Option<DisasterStatus>,
    pub funding_goal: Option<i64>,
}

/// Merchant registered in a disaster zone.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i64,
    pub user_id: i64,
    pub disaster_id: i64,
    pub business_name: String,
    pub category: String,
    pub wallet_address: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[sqlx(try_from = "String")]
    pub status: VendorStatus,
    pub total_redeemed: i64,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VendorForCreate {
    pub user_id: i64,
    pub disaster_id: i64,
    pub business_name: String,
    pub category: String,
    pub wallet_address: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct VendorForUpdate {
    pub business_name: Option<String>,
    pub category: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Beneficiary entitlement.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Voucher {
    pub id: i64,
    pub code: String,
    pub beneficiary_id: i64,
    pub disaster_id: i64,
    pub issued_by: Option<i64>,
    pub amount: i64,
    pub remaining_amount: i64,
    pub allowed_categories: Json<Vec<String>>,
    #[sqlx(try_from = "String")]
    pub status: VoucherStatus,
    pub expires_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == VoucherStatus::Expired || self.expires_at <= now
    }

    /// An empty category list allows every category.
    pub fn allows_category(&self, category: &str) -> bool {
        self.allowed_categories.0.is_empty()
            || self
                .allowed_categories
                .0
                .iter()
                .any(|c| c.eq_ignore_ascii_case(category))
    }
}

#[derive(Debug, Clone)]
pub struct VoucherForCreate {
    pub code: String,
    pub beneficiary_id: i64,
    pub disaster_id: i64,
    pub issued_by: i64,
    pub amount: i64,
    pub allowed_categories: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// Redemption of a voucher at a vendor.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub voucher_id: i64,
    pub vendor_id: i64,
    pub beneficiary_id: i64,
    pub disaster_id: i64,
    pub amount: i64,
    pub category: String,
    pub description: Option<String>,
    pub tx_hash: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TransactionForCreate {
    pub voucher_id: i64,
    pub vendor_id: i64,
    pub beneficiary_id: i64,
    pub disaster_id: i64,
    pub amount: i64,
    pub category: String,
    pub description: Option<String>,
    pub tx_hash: Option<String>,
    pub status: TransactionStatus,
}

/// Evidence attached to a transaction, stored on IPFS.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProofOfAid {
    pub id: i64,
    pub transaction_id: i64,
    pub submitted_by: i64,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub ipfs_cid: String,
    pub gateway_url: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ProofStatus,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProofForCreate {
    pub transaction_id: i64,
    pub submitted_by: i64,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub ipfs_cid: String,
    pub gateway_url: String,
    pub description: Option<String>,
}

// endregion: --- Relief

// region: --- Cross-cutting

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Json<Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuditForCreate {
    pub user_id: Option<i64>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Value,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SystemSetting {
    pub key: String,
    pub value: Json<Value>,
    pub description: Option<String>,
    pub is_public: bool,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: i64,
    pub job_type: String,
    pub payload: Json<Value>,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub priority: i64,
    pub attempts: i64,
    pub max_attempts: i64,
    pub run_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// endregion: --- Cross-cutting
