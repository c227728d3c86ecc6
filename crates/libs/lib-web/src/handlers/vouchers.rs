//! # Voucher Handlers
//!
//! Thin wrappers over [`VoucherService`] and [`RedemptionService`]. Staff see
//! every voucher; beneficiaries only their own.

use crate::handlers::{created, ok, ok_with, ApiResult, Created};
use crate::server::AppState;
use crate::services::{RedemptionService, VoucherService};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use lib_core::dto::{
    IssueVoucherRequest, PageQuery, Paginated, RedeemVoucherRequest, RedemptionResponse,
    RevokedVoucher, VoucherListQuery,
};
use lib_core::model::store::enums::Role;
use lib_core::model::store::models::Voucher;
use lib_core::model::store::voucher_repository::VoucherFilter;
use lib_core::model::store::VoucherRepository;
use lib_core::{AppError, Ctx, DbPool, Result};

async fn load_voucher(db: &DbPool, id: i64) -> Result<Voucher> {
    VoucherRepository::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Voucher not found".to_string()))
}

fn require_owner_or_staff(ctx: &Ctx, voucher: &Voucher) -> Result<()> {
    if voucher.beneficiary_id == ctx.user_id || ctx.is_staff() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access denied".to_string()))
    }
}

/// Staff only.
pub async fn issue_voucher(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Json(req): Json<IssueVoucherRequest>,
) -> Created<Voucher> {
    ctx.require_staff()?;
    let voucher = VoucherService::new(&state).issue(&ctx, req).await?;
    created(voucher, "Voucher issued")
}

/// Staff list with filters. Anyone else gets their own vouchers regardless
/// of the `beneficiary_id` filter.
pub async fn list_vouchers(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Query(query): Query<VoucherListQuery>,
) -> ApiResult<Paginated<Voucher>> {
    let beneficiary_id = if ctx.is_staff() { query.beneficiary_id } else { Some(ctx.user_id) };
    let filter = VoucherFilter { beneficiary_id, disaster_id: query.disaster_id, status: query.status };

    let page = query.page();
    let (items, total) = VoucherRepository::list(&state.db, &filter, page).await?;
    ok(Paginated::new(items, page, total))
}

pub async fn my_vouchers(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Paginated<Voucher>> {
    let filter = VoucherFilter { beneficiary_id: Some(ctx.user_id), ..Default::default() };
    let page = query.page();
    let (items, total) = VoucherRepository::list(&state.db, &filter, page).await?;
    ok(Paginated::new(items, page, total))
}

pub async fn get_voucher(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<Voucher> {
    let voucher = load_voucher(&state.db, id).await?;
    require_owner_or_staff(&ctx, &voucher)?;
    ok(voucher)
}

/// Lookup before redemption. Vendors, staff and the holder.
pub async fn get_voucher_by_code(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(code): Path<String>,
) -> ApiResult<Voucher> {
    let voucher = VoucherRepository::find_by_code(&state.db, code.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Voucher not found".to_string()))?;
    if ctx.role != Role::Vendor {
        require_owner_or_staff(&ctx, &voucher)?;
    }
    ok(voucher)
}

/// Staff only. Releases the unspent balance back to the disaster.
pub async fn revoke_voucher(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<RevokedVoucher> {
    ctx.require_staff()?;
    let revoked = VoucherService::new(&state).revoke(&ctx, id).await?;
    ok_with(revoked, "Voucher revoked")
}

/// Redeem by voucher id. The caller must own an approved vendor profile.
pub async fn redeem_voucher(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
    Json(req): Json<RedeemVoucherRequest>,
) -> Created<RedemptionResponse> {
    let voucher = load_voucher(&state.db, id).await?;
    let redemption = RedemptionService::new(&state).redeem(&ctx, &voucher.code, req).await?;
    created(redemption, "Voucher redeemed")
}
