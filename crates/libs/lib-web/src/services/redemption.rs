//! # Redemption Service
//!
//! A vendor redeems part of a voucher. Checks run in this order, each with its
//! own status code:
//!
//! | Check | Error |
//! |-------|-------|
//! | caller has an approved vendor profile | 403 |
//! | voucher exists | 404 |
//! | voucher is active (not used, revoked or expired) | 409 |
//! | voucher belongs to the vendor's disaster | 403 |
//! | `0 < amount <= remaining` | 400 |
//! | category allowed by the voucher | 400 |
//!
//! The ledger receipt is obtained before anything is written. The balance
//! debit, transaction insert and vendor/disaster totals then commit together.
//! A concurrent redemption that empties the voucher first makes the
//! conditional debit match nothing and the request fails with 409.

use crate::server::AppState;
use crate::services::{format_amount, validate_amount, AuditService, CacheService, NotificationService};
use chrono::Utc;
use lib_core::dto::{RedeemVoucherRequest, RedemptionResponse, UpdateTransactionStatusRequest};
use lib_core::model::store::enums::{TransactionStatus, VendorStatus, VoucherStatus};
use lib_core::model::store::models::{Transaction, TransactionForCreate};
use lib_core::model::store::{
    DisasterRepository, SettingsRepository, TransactionRepository, VendorRepository,
    VoucherRepository,
};
use lib_core::{AppError, Ctx, DbPool, Result};
use lib_integrations::{Integrations, RedemptionRecord};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct RedemptionService {
    db: DbPool,
    cache: Arc<CacheService>,
    integrations: Integrations,
    notifications: NotificationService,
}

impl RedemptionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            cache: state.cache.clone(),
            integrations: state.integrations.clone(),
            notifications: NotificationService::new(state.db.clone(), state.integrations.clone()),
        }
    }

    #[instrument(skip(self, ctx, req), fields(user_id = ctx.user_id, amount = req.amount))]
    pub async fn redeem(
        &self,
        ctx: &Ctx,
        voucher_code: &str,
        req: RedeemVoucherRequest,
    ) -> Result<RedemptionResponse> {
        let vendor = VendorRepository::find_by_user(&self.db, ctx.user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("A vendor profile is required to redeem vouchers".to_string()))?;
        if vendor.status != VendorStatus::Approved {
            return Err(AppError::Forbidden("Vendor is not approved".to_string()));
        }

        let voucher = VoucherRepository::find_by_code(&self.db, voucher_code.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Voucher not found".to_string()))?;

        let now = Utc::now();
        match voucher.status {
            VoucherStatus::Used => {
                return Err(AppError::Conflict("Voucher has been fully redeemed".to_string()))
            }
            VoucherStatus::Revoked => {
                return Err(AppError::Conflict("Voucher has been revoked".to_string()))
            }
            _ if voucher.is_expired(now) => {
                return Err(AppError::Conflict("Voucher has expired".to_string()))
            }
            _ => {}
        }

        if voucher.disaster_id != vendor.disaster_id {
            return Err(AppError::Forbidden(
                "Vendor is not registered for this voucher's disaster".to_string(),
            ));
        }

        validate_amount(req.amount)?;
        if req.amount > voucher.remaining_amount {
            return Err(AppError::InvalidInput(format!(
                "Amount exceeds remaining balance of {}",
                format_amount(voucher.remaining_amount)
            )));
        }

        let category = req
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(vendor.category.as_str())
            .to_lowercase();
        if !voucher.allows_category(&category) {
            return Err(AppError::InvalidInput(format!(
                "Category '{}' is not allowed for this voucher",
                category
            )));
        }

        let receipt = self
            .integrations
            .ledger
            .record_redemption(&RedemptionRecord {
                voucher_code: voucher.code.clone(),
                disaster_id: voucher.disaster_id,
                vendor_wallet: vendor.wallet_address.clone(),
                beneficiary_id: voucher.beneficiary_id,
                amount: req.amount,
                category: category.clone(),
            })
            .await?;

        let mut tx = self.db.begin().await?;

        let updated_voucher = VoucherRepository::debit(&mut *tx, voucher.id, req.amount, now)
            .await?
            .ok_or_else(|| {
                warn!("[REDEEM] Conditional debit of {} on {} matched nothing", req.amount, voucher.code);
                AppError::Conflict("Voucher balance changed, please retry".to_string())
            })?;

        let transaction = TransactionRepository::create(
            &mut *tx,
            &TransactionForCreate {
                voucher_id: voucher.id,
                vendor_id: vendor.id,
                beneficiary_id: voucher.beneficiary_id,
                disaster_id: voucher.disaster_id,
                amount: req.amount,
                category,
                description: req.description.clone(),
                tx_hash: Some(receipt.tx_hash.clone()),
                status: TransactionStatus::Confirmed,
            },
        )
        .await?;

        VendorRepository::adjust_redeemed(&mut *tx, vendor.id, req.amount).await?;
        DisasterRepository::adjust_disbursed(&mut *tx, voucher.disaster_id, req.amount).await?;

        tx.commit().await?;
        info!(
            "[REDEEM] {} redeemed {} at vendor {} (tx {})",
            voucher.code, req.amount, vendor.id, transaction.id
        );

        AuditService::record(
            &self.db,
            ctx,
            "transaction.redeem",
            "transaction",
            transaction.id,
            json!({
                "voucher_code": voucher.code,
                "vendor_id": vendor.id,
                "amount": req.amount,
                "tx_hash": receipt.tx_hash,
            }),
        )
        .await;

        let notify = SettingsRepository::get_or(&self.db, "redemption.notify_beneficiary", true)
            .await
            .unwrap_or(true);
        if notify {
            self.notifications
                .notify(
                    voucher.beneficiary_id,
                    "Voucher redeemed",
                    &format!(
                        "{} was spent at {} from voucher {}. Remaining balance: {}.",
                        format_amount(req.amount),
                        vendor.business_name,
                        voucher.code,
                        format_amount(updated_voucher.remaining_amount)
                    ),
                    "redemption",
                )
                .await;
        }
        self.invalidate().await;

        Ok(RedemptionResponse { transaction, voucher: updated_voucher, receipt })
    }

    /// Manual status change. Moving a confirmed or flagged transaction to
    /// `failed` reverses the redemption.
    #[instrument(skip(self, ctx, req), fields(status = %req.status))]
    pub async fn update_status(
        &self,
        ctx: &Ctx,
        id: i64,
        req: &UpdateTransactionStatusRequest,
    ) -> Result<Transaction> {
        let mut tx = self.db.begin().await?;

        let current = TransactionRepository::find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

        if !current.status.can_transition_to(req.status) {
            return Err(AppError::Conflict(format!(
                "Cannot change transaction status from {} to {}",
                current.status, req.status
            )));
        }

        let updated = TransactionRepository::update_status(&mut *tx, id, current.status, req.status)
            .await?
            .ok_or_else(|| AppError::Conflict("Transaction status changed concurrently".to_string()))?;

        let reversed = req.status == TransactionStatus::Failed
            && matches!(current.status, TransactionStatus::Confirmed | TransactionStatus::Flagged);

        if reversed {
            DisasterRepository::adjust_disbursed(&mut *tx, current.disaster_id, -current.amount).await?;

            let voucher = VoucherRepository::find_by_id(&mut *tx, current.voucher_id)
                .await?
                .ok_or_else(|| AppError::Internal(format!("Voucher {} missing", current.voucher_id)))?;
            match voucher.status {
                VoucherStatus::Active | VoucherStatus::Used => {
                    VoucherRepository::credit(&mut *tx, voucher.id, current.amount).await?;
                }
                VoucherStatus::Revoked | VoucherStatus::Expired => {
                    // Allocation was already released for the rest of the voucher.
                    DisasterRepository::release_allocation(&mut *tx, current.disaster_id, current.amount)
                        .await?;
                }
            }

            VendorRepository::adjust_redeemed(&mut *tx, current.vendor_id, -current.amount).await?;
        }

        tx.commit().await?;
        info!(
            "[TRANSACTION] {} {} -> {} (reversed: {})",
            id, current.status, updated.status, reversed
        );

        AuditService::record(
            &self.db,
            ctx,
            "transaction.status",
            "transaction",
            id,
            json!({
                "from": current.status,
                "to": updated.status,
                "reason": req.reason,
                "reversed": reversed,
            }),
        )
        .await;

        if let Ok(Some(vendor)) = VendorRepository::find_by_id(&self.db, updated.vendor_id).await {
            self.notifications
                .notify(
                    vendor.user_id,
                    "Transaction status changed",
                    &format!("Transaction {} is now {}.", id, updated.status),
                    "transaction",
                )
                .await;
        }
        self.invalidate().await;

        Ok(updated)
    }

    async fn invalidate(&self) {
        self.cache.invalidate_pattern("disasters:*").await;
        self.cache.invalidate_pattern("analytics:*").await;
    }
}
