//! # Transaction Handlers
//!
//! A transaction is one redemption of a voucher at a vendor. Staff see all of
//! them, vendors the ones they took, beneficiaries the ones they paid with.

use crate::handlers::{created, ok, ApiResult, Created};
use crate::server::AppState;
use crate::services::RedemptionService;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use lib_core::dto::{
    ChainLookup, Paginated, RedeemRequest, RedeemVoucherRequest, RedemptionResponse,
    TransactionListQuery, UpdateTransactionStatusRequest,
};
use lib_core::model::store::enums::Role;
use lib_core::model::store::models::Transaction;
use lib_core::model::store::transaction_repository::TransactionFilter;
use lib_core::model::store::{TransactionRepository, VendorRepository};
use lib_core::{AppError, Ctx, DbPool, Result};
use tracing::{debug, instrument};

pub(crate) async fn load_transaction(db: &DbPool, id: i64) -> Result<Transaction> {
    TransactionRepository::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))
}

/// True when the caller is the beneficiary or owns the vendor of `transaction`.
pub(crate) async fn is_party(db: &DbPool, ctx: &Ctx, transaction: &Transaction) -> Result<bool> {
    if transaction.beneficiary_id == ctx.user_id {
        return Ok(true);
    }
    let vendor = VendorRepository::find_by_user(db, ctx.user_id).await?;
    Ok(vendor.is_some_and(|v| v.id == transaction.vendor_id))
}

async fn load_visible(db: &DbPool, ctx: &Ctx, id: i64) -> Result<Transaction> {
    let transaction = load_transaction(db, id).await?;
    if !ctx.is_staff() && !is_party(db, ctx, &transaction).await? {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    Ok(transaction)
}

/// Redeem by voucher code.
#[instrument(skip(state, ctx, req), fields(user_id = ctx.user_id))]
pub async fn redeem(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Json(req): Json<RedeemRequest>,
) -> Created<RedemptionResponse> {
    let redemption = RedemptionService::new(&state)
        .redeem(
            &ctx,
            &req.voucher_code,
            RedeemVoucherRequest { amount: req.amount, category: req.category, description: req.description },
        )
        .await?;
    created(redemption, "Voucher redeemed")
}

/// Role-scoped list. Non-staff filters on `vendor_id` are ignored in favour
/// of the caller's own party.
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Query(query): Query<TransactionListQuery>,
) -> ApiResult<Paginated<Transaction>> {
    let mut filter = TransactionFilter {
        disaster_id: query.disaster_id,
        vendor_id: query.vendor_id,
        voucher_id: query.voucher_id,
        beneficiary_id: None,
        status: query.status,
        from: query.from,
        to: query.to,
    };
    let page = query.page();

    if !ctx.is_staff() {
        if ctx.role == Role::Vendor {
            match VendorRepository::find_by_user(&state.db, ctx.user_id).await? {
                Some(vendor) => filter.vendor_id = Some(vendor.id),
                None => return ok(Paginated::new(Vec::new(), page, 0)),
            }
        } else {
            filter.vendor_id = None;
            filter.beneficiary_id = Some(ctx.user_id);
        }
    }
    debug!("[TRANSACTIONS] List for user {} with {:?}", ctx.user_id, filter);

    let (items, total) = TransactionRepository::list(&state.db, &filter, page).await?;
    ok(Paginated::new(items, page, total))
}

/// Party or staff.
pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<Transaction> {
    ok(load_visible(&state.db, &ctx, id).await?)
}

/// The ledger receipt behind a transaction's `tx_hash`.
pub async fn chain_lookup(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<ChainLookup> {
    let transaction = load_visible(&state.db, &ctx, id).await?;

    let receipt = match transaction.tx_hash.as_deref() {
        Some(tx_hash) => state.integrations.ledger.get_receipt(tx_hash).await?,
        None => None,
    };
    ok(ChainLookup { transaction_id: transaction.id, tx_hash: transaction.tx_hash, receipt })
}

/// Admin only. Moving to `failed` reverses the redemption.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTransactionStatusRequest>,
) -> ApiResult<Transaction> {
    ctx.require_admin()?;
    let transaction = RedemptionService::new(&state).update_status(&ctx, id, &req).await?;
    ok(transaction)
}
