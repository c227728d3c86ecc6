//! # Vendor Handlers
//!
//! Vendors register against one active disaster and start out `pending`.
//! Staff approve or suspend them; only approved vendors may redeem vouchers.

use crate::handlers::auth::normalize_phone;
use crate::handlers::disasters::load_disaster;
use crate::handlers::{created, invalid, ok, ApiResult, Created};
use crate::server::AppState;
use crate::services::geo::validate_coordinates;
use crate::services::{AuditService, NotificationService};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use lib_auth::validate_wallet_address;
use lib_core::dto::{
    Paginated, RegisterVendorRequest, TransactionListQuery, UpdateVendorRequest, VendorListQuery,
};
use lib_core::model::store::enums::{DisasterStatus, Role, VendorStatus};
use lib_core::model::store::models::{Transaction, Vendor, VendorForCreate, VendorForUpdate};
use lib_core::model::store::transaction_repository::TransactionFilter;
use lib_core::model::store::vendor_repository::VendorFilter;
use lib_core::model::store::{TransactionRepository, UserRepository, VendorRepository};
use lib_core::{AppError, Ctx, DbPool, Result};
use lib_utils::validate_not_empty;
use serde_json::json;
use tracing::{info, instrument};

pub(crate) async fn load_vendor(db: &DbPool, id: i64) -> Result<Vendor> {
    VendorRepository::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Vendor not found".to_string()))
}

fn normalize_category(category: &str) -> Result<String> {
    validate_not_empty(category, "category").map_err(invalid)?;
    Ok(category.trim().to_lowercase())
}

fn validate_location(latitude: Option<f64>, longitude: Option<f64>) -> Result<()> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => validate_coordinates(lat, lng),
        (None, None) => Ok(()),
        _ => Err(AppError::InvalidInput("latitude and longitude must be given together".to_string())),
    }
}

#[instrument(skip(state, ctx, req), fields(user_id = ctx.user_id, disaster_id = req.disaster_id))]
pub async fn register_vendor(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Json(req): Json<RegisterVendorRequest>,
) -> Created<Vendor> {
    ctx.require_role(&[Role::Vendor, Role::Admin])?;

    validate_not_empty(&req.business_name, "business_name").map_err(invalid)?;
    let category = normalize_category(&req.category)?;
    let phone = normalize_phone(req.phone)?;
    validate_location(req.latitude, req.longitude)?;

    if VendorRepository::find_by_user(&state.db, ctx.user_id).await?.is_some() {
        return Err(AppError::Conflict("A vendor profile already exists for this account".to_string()));
    }

    let disaster = load_disaster(&state.db, req.disaster_id).await?;
    if disaster.status != DisasterStatus::Active {
        return Err(AppError::Conflict("Disaster is not active".to_string()));
    }

    let wallet_address = match req.wallet_address.map(|w| w.trim().to_string()) {
        Some(wallet) => {
            validate_wallet_address(&wallet)?;
            wallet
        }
        None => {
            UserRepository::find_by_id(&state.db, ctx.user_id)
                .await?
                .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?
                .wallet_address
        }
    };

    let vendor = VendorRepository::create(
        &state.db,
        &VendorForCreate {
            user_id: ctx.user_id,
            disaster_id: disaster.id,
            business_name: req.business_name.trim().to_string(),
            category,
            wallet_address,
            phone,
            address: req.address.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
            latitude: req.latitude,
            longitude: req.longitude,
        },
    )
    .await?;
    info!("[VENDOR] Registered vendor {} for disaster {}", vendor.id, disaster.id);

    AuditService::record(
        &state.db,
        &ctx,
        "vendor.register",
        "vendor",
        vendor.id,
        json!({ "disaster_id": disaster.id, "category": vendor.category }),
    )
    .await;
    state.cache.invalidate_pattern("disasters:*").await;
    created(vendor, "Vendor registered and awaiting approval")
}

pub async fn list_vendors(
    State(state): State<AppState>,
    Query(query): Query<VendorListQuery>,
) -> ApiResult<Paginated<Vendor>> {
    let filter = VendorFilter {
        disaster_id: query.disaster_id,
        status: query.status,
        category: query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()).map(str::to_lowercase),
    };
    let page = query.page();
    let (items, total) = VendorRepository::list(&state.db, &filter, page).await?;
    ok(Paginated::new(items, page, total))
}

/// The caller's own vendor profile.
pub async fn my_vendor(State(state): State<AppState>, Extension(ctx): Extension<Ctx>) -> ApiResult<Vendor> {
    let vendor = VendorRepository::find_by_user(&state.db, ctx.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No vendor profile for this account".to_string()))?;
    ok(vendor)
}

pub async fn get_vendor(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Vendor> {
    ok(load_vendor(&state.db, id).await?)
}

/// Owner or admin. Status and wallet are not editable here.
pub async fn update_vendor(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateVendorRequest>,
) -> ApiResult<Vendor> {
    let vendor = load_vendor(&state.db, id).await?;
    if vendor.user_id != ctx.user_id && !ctx.is_admin() {
        return Err(AppError::Forbidden("Only the owner can update this vendor".to_string()));
    }

    if let Some(name) = &req.business_name {
        validate_not_empty(name, "business_name").map_err(invalid)?;
    }
    let category = req.category.as_deref().map(normalize_category).transpose()?;
    let phone = normalize_phone(req.phone)?;
    if req.latitude.is_some() || req.longitude.is_some() {
        validate_location(
            req.latitude.or(vendor.latitude),
            req.longitude.or(vendor.longitude),
        )?;
    }

    let updated = VendorRepository::update(
        &state.db,
        id,
        &VendorForUpdate {
            business_name: req.business_name.map(|n| n.trim().to_string()),
            category,
            phone,
            address: req.address.map(|a| a.trim().to_string()),
            latitude: req.latitude,
            longitude: req.longitude,
        },
    )
    .await?;

    AuditService::record(&state.db, &ctx, "vendor.update", "vendor", id, json!({})).await;
    ok(updated)
}

pub async fn approve_vendor(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<Vendor> {
    ctx.require_staff()?;
    let vendor = change_status(&state, &ctx, id, VendorStatus::Approved).await?;
    ok(vendor)
}

pub async fn suspend_vendor(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<Vendor> {
    ctx.require_staff()?;
    let vendor = change_status(&state, &ctx, id, VendorStatus::Suspended).await?;
    ok(vendor)
}

async fn change_status(state: &AppState, ctx: &Ctx, id: i64, status: VendorStatus) -> Result<Vendor> {
    let before = load_vendor(&state.db, id).await?;
    if before.status == status {
        return Err(AppError::Conflict(format!("Vendor is already {}", status)));
    }

    let vendor = VendorRepository::set_status(&state.db, id, status, ctx.user_id).await?;
    info!("[VENDOR] Vendor {} {} -> {} by {}", id, before.status, vendor.status, ctx.user_id);

    let action = match status {
        VendorStatus::Approved => "vendor.approve",
        _ => "vendor.suspend",
    };
    AuditService::record(
        &state.db,
        ctx,
        action,
        "vendor",
        id,
        json!({ "from": before.status, "to": vendor.status }),
    )
    .await;

    let (title, message) = match status {
        VendorStatus::Approved => ("Vendor approved", format!("{} can now accept vouchers.", vendor.business_name)),
        _ => ("Vendor suspended", format!("{} can no longer accept vouchers.", vendor.business_name)),
    };
    NotificationService::new(state.db.clone(), state.integrations.clone())
        .notify(vendor.user_id, title, &message, "vendor")
        .await;

    state.cache.invalidate_pattern("disasters:*").await;
    state.cache.invalidate_pattern("analytics:*").await;
    Ok(vendor)
}

/// Redemptions taken by a vendor. Owner or staff.
pub async fn vendor_transactions(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
    Query(query): Query<TransactionListQuery>,
) -> ApiResult<Paginated<Transaction>> {
    let vendor = load_vendor(&state.db, id).await?;
    if vendor.user_id != ctx.user_id && !ctx.is_staff() {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let filter = TransactionFilter {
        disaster_id: query.disaster_id,
        vendor_id: Some(vendor.id),
        voucher_id: query.voucher_id,
        beneficiary_id: None,
        status: query.status,
        from: query.from,
        to: query.to,
    };
    let page = query.page();
    let (items, total) = TransactionRepository::list(&state.db, &filter, page).await?;
    ok(Paginated::new(items, page, total))
}
