//! # Voucher Service
//!
//! Issuing a voucher promises part of a disaster's funds to a beneficiary:
//! `total_allocated` grows by the voucher amount inside the same database
//! transaction that inserts the voucher, and only while enough unallocated
//! funding remains. Revoking hands the unspent balance back.

use crate::server::AppState;
use crate::services::{format_amount, validate_amount, AuditService, CacheService, NotificationService};
use chrono::Utc;
use lib_core::dto::{IssueVoucherRequest, RevokedVoucher};
use lib_core::model::store::enums::{DisasterStatus, Role};
use lib_core::model::store::models::{Voucher, VoucherForCreate};
use lib_core::model::store::{
    DisasterRepository, SettingsRepository, UserRepository, VoucherRepository,
};
use lib_core::{AppError, Ctx, DbPool, Result};
use lib_utils::days_from_now;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const DEFAULT_EXPIRY_DAYS: i64 = 90;
const MAX_EXPIRY_DAYS: i64 = 3650;

/// `VCH-` followed by 12 uppercase hex characters.
pub fn generate_voucher_code() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("VCH-{}", hex[..12].to_uppercase())
}

/// Trimmed, lowercased and de-duplicated category list.
pub fn normalize_categories(categories: Option<Vec<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for category in categories.unwrap_or_default() {
        let category = category.trim().to_lowercase();
        if !category.is_empty() && !out.contains(&category) {
            out.push(category);
        }
    }
    out
}

pub struct VoucherService {
    db: DbPool,
    cache: Arc<CacheService>,
    notifications: NotificationService,
}

impl VoucherService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            cache: state.cache.clone(),
            notifications: NotificationService::new(state.db.clone(), state.integrations.clone()),
        }
    }

    #[instrument(skip(self, ctx, req), fields(disaster_id = req.disaster_id, amount = req.amount))]
    pub async fn issue(&self, ctx: &Ctx, req: IssueVoucherRequest) -> Result<Voucher> {
        validate_amount(req.amount)?;

        let beneficiary = UserRepository::find_by_id(&self.db, req.beneficiary_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Beneficiary not found".to_string()))?;
        if beneficiary.role != Role::Beneficiary {
            return Err(AppError::InvalidInput("Vouchers can only be issued to beneficiaries".to_string()));
        }
        if !beneficiary.is_active {
            return Err(AppError::InvalidInput("Beneficiary account is inactive".to_string()));
        }

        let now = Utc::now();
        let expires_at = match (req.expires_at, req.expires_in_days) {
            (Some(at), _) => {
                if at <= now {
                    return Err(AppError::InvalidInput("Expiry must be in the future".to_string()));
                }
                at
            }
            (None, days) => {
                let days = match days {
                    Some(days) => days,
                    None => SettingsRepository::get_or(&self.db, "voucher.default_expiry_days", DEFAULT_EXPIRY_DAYS)
                        .await?,
                };
                if !(1..=MAX_EXPIRY_DAYS).contains(&days) {
                    return Err(AppError::InvalidInput(format!(
                        "Expiry must be between 1 and {} days",
                        MAX_EXPIRY_DAYS
                    )));
                }
                days_from_now(days)
            }
        };

        let mut tx = self.db.begin().await?;

        let disaster = DisasterRepository::find_by_id(&mut *tx, req.disaster_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Disaster not found".to_string()))?;
        if disaster.status != DisasterStatus::Active {
            return Err(AppError::Conflict("Disaster is not active".to_string()));
        }

        if !DisasterRepository::allocate(&mut *tx, disaster.id, req.amount).await? {
            warn!(
                "[VOUCHER] Allocation of {} refused, only {} unallocated",
                req.amount,
                disaster.unallocated_funds()
            );
            return Err(AppError::Conflict("Insufficient unallocated funds for this disaster".to_string()));
        }

        let voucher = VoucherRepository::create(
            &mut *tx,
            &VoucherForCreate {
                code: generate_voucher_code(),
                beneficiary_id: beneficiary.id,
                disaster_id: disaster.id,
                issued_by: ctx.user_id,
                amount: req.amount,
                allowed_categories: normalize_categories(req.allowed_categories),
                expires_at,
            },
        )
        .await?;

        tx.commit().await?;
        info!("[VOUCHER] Issued {} ({}) to user {}", voucher.code, voucher.amount, beneficiary.id);

        AuditService::record(
            &self.db,
            ctx,
            "voucher.issue",
            "voucher",
            voucher.id,
            json!({
                "code": voucher.code,
                "beneficiary_id": beneficiary.id,
                "disaster_id": disaster.id,
                "amount": voucher.amount,
            }),
        )
        .await;
        self.notifications
            .notify(
                beneficiary.id,
                "Voucher issued",
                &format!(
                    "You received voucher {} worth {} for {}. It expires on {}.",
                    voucher.code,
                    format_amount(voucher.amount),
                    disaster.name,
                    voucher.expires_at.format("%Y-%m-%d")
                ),
                "voucher",
            )
            .await;
        self.invalidate().await;

        Ok(voucher)
    }

    /// Revoke an active voucher and release its remaining balance.
    #[instrument(skip(self, ctx))]
    pub async fn revoke(&self, ctx: &Ctx, id: i64) -> Result<RevokedVoucher> {
        let mut tx = self.db.begin().await?;

        VoucherRepository::find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Voucher not found".to_string()))?;

        let voucher = VoucherRepository::revoke(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::Conflict("Only active vouchers can be revoked".to_string()))?;

        let released_amount = voucher.remaining_amount;
        DisasterRepository::release_allocation(&mut *tx, voucher.disaster_id, released_amount).await?;

        tx.commit().await?;
        info!("[VOUCHER] Revoked {}, released {}", voucher.code, released_amount);

        AuditService::record(
            &self.db,
            ctx,
            "voucher.revoke",
            "voucher",
            voucher.id,
            json!({ "code": voucher.code, "released_amount": released_amount }),
        )
        .await;
        self.notifications
            .notify(
                voucher.beneficiary_id,
                "Voucher revoked",
                &format!("Voucher {} has been revoked.", voucher.code),
                "voucher",
            )
            .await;
        self.invalidate().await;

        Ok(RevokedVoucher { voucher, released_amount })
    }

    async fn invalidate(&self) {
        self.cache.invalidate_pattern("disasters:*").await;
        self.cache.invalidate_pattern("analytics:*").await;
    }
}
