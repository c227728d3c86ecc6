//! # Relief Domain DTOs
//!
//! Bodies and query strings for users, disasters, vendors, vouchers,
//! transactions and proofs of aid. Amounts are integer minor units.

use crate::model::store::enums::{
    DisasterSeverity, DisasterStatus, ProofStatus, Role, TransactionStatus, VendorStatus,
    VoucherStatus,
};
use crate::model::store::models::{Disaster, Transaction, Voucher};
use crate::model::store::Page;
use chrono::{DateTime, Utc};
use lib_integrations::LedgerReceipt;
use serde::{Deserialize, Serialize};

// region: --- Users

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub is_verified: Option<bool>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl UserListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

// endregion: --- Users

// region: --- Disasters

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisasterListQuery {
    pub status: Option<DisasterStatus>,
    pub severity: Option<DisasterSeverity>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl DisasterListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    /// Search radius, default 100 km
    pub radius_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyDisaster {
    #[serde(flatten)]
    pub disaster: Disaster,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDisasterRequest {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: Option<f64>,
    pub severity: Option<DisasterSeverity>,
    pub funding_goal: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDisasterRequest {
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

#[derive(Debug, Clone, Deserialize)]
pub struct FundDisasterRequest {
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundingResponse {
    pub disaster: Disaster,
    pub receipt: LedgerReceipt,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoucherCounts {
    pub active: i64,
    pub used: i64,
    pub expired: i64,
    pub revoked: i64,
    pub total: i64,
}

impl VoucherCounts {
    /// Fold `(status, count)` rows into named counters.
    pub fn from_rows(rows: &[(String, i64)]) -> Self {
        let mut counts = Self::default();
        for (status, count) in rows {
            match status.parse::<VoucherStatus>() {
                Ok(VoucherStatus::Active) => counts.active += count,
                Ok(VoucherStatus::Used) => counts.used += count,
                Ok(VoucherStatus::Expired) => counts.expired += count,
                Ok(VoucherStatus::Revoked) => counts.revoked += count,
                Err(_) => {}
            }
            counts.total += count;
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisasterStats {
    pub disaster_id: i64,
    pub funding_goal: i64,
    pub total_funding: i64,
    pub total_allocated: i64,
    pub total_disbursed: i64,
    pub unallocated: i64,
    /// Disbursed as a percentage of funding, 0 when unfunded
    pub utilization_percent: f64,
    pub vouchers: VoucherCounts,
    pub vendors: i64,
    pub approved_vendors: i64,
    pub transactions: i64,
    pub transaction_volume: i64,
}

// endregion: --- Disasters

// region: --- Vendors

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterVendorRequest {
    pub disaster_id: i64,
    pub business_name: String,
    pub category: String,
    /// Defaults to the registering user's wallet
    pub wallet_address: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorListQuery {
    pub disaster_id: Option<i64>,
    pub status: Option<VendorStatus>,
    pub category: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl VendorListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVendorRequest {
    pub business_name: Option<String>,
    pub category: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

// endregion: --- Vendors

// region: --- Vouchers

/// Give `expires_at` or `expires_in_days`; neither means the platform default.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueVoucherRequest {
    pub beneficiary_id: i64,
    pub disaster_id: i64,
    pub amount: i64,
    pub allowed_categories: Option<Vec<String>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoucherListQuery {
    pub beneficiary_id: Option<i64>,
    pub disaster_id: Option<i64>,
    pub status: Option<VoucherStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl VoucherListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RevokedVoucher {
    pub voucher: Voucher,
    /// Balance returned to the disaster's unallocated pool
    pub released_amount: i64,
}

/// Redemption by voucher code (`POST /api/transactions`).
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemRequest {
    pub voucher_code: String,
    pub amount: i64,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Redemption by voucher id (`POST /api/vouchers/{id}/redeem`).
#[derive(Debug, Clone, Deserialize)]
pub struct RedeemVoucherRequest {
    pub amount: i64,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedemptionResponse {
    pub transaction: Transaction,
    pub voucher: Voucher,
    pub receipt: LedgerReceipt,
}

// endregion: --- Vouchers

// region: --- Transactions

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionListQuery {
    pub disaster_id: Option<i64>,
    pub vendor_id: Option<i64>,
    pub voucher_id: Option<i64>,
    pub status: Option<TransactionStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl TransactionListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTransactionStatusRequest {
    pub status: TransactionStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainLookup {
    pub transaction_id: i64,
    pub tx_hash: Option<String>,
    /// `None` when the ledger has no record of the hash
    pub receipt: Option<LedgerReceipt>,
}

// endregion: --- Transactions

// region: --- Proofs

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProofListQuery {
    pub transaction_id: Option<i64>,
    pub status: Option<ProofStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ProofListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewProofRequest {
    pub status: ProofStatus,
    pub notes: Option<String>,
}

// endregion: --- Proofs

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voucher_counts_from_rows() {
        let rows = vec![
            ("active".to_string(), 3),
            ("used".to_string(), 2),
            ("revoked".to_string(), 1),
        ];
        let counts = VoucherCounts::from_rows(&rows);
        assert_eq!(counts.active, 3);
        assert_eq!(counts.used, 2);
        assert_eq!(counts.expired, 0);
        assert_eq!(counts.total, 6);
    }

    #[test]
    fn test_issue_request_accepts_optional_expiry() {
        let req: IssueVoucherRequest = serde_json::from_str(
            r#"{"beneficiary_id": 1, "disaster_id": 2, "amount": 500, "expires_in_days": 7}"#,
        )
        .unwrap();
        assert_eq!(req.expires_in_days, Some(7));
        assert!(req.expires_at.is_none());
        assert!(req.allowed_categories.is_none());
    }
}
