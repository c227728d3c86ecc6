//! # Disaster Handlers
//!
//! Reads are public and cached under `disasters:*`. Creating and editing is
//! for admin and government accounts; any signed-in user may fund an active
//! disaster.
//!
//! | Route | Who |
//! |-------|-----|
//! | `GET /api/disasters`, `/nearby`, `/{id}`, `/{id}/stats`, `/{id}/vendors` | public |
//! | `POST /api/disasters`, `PUT /{id}` | admin, government |
//! | `DELETE /{id}` | admin |
//! | `POST /{id}/fund` | authenticated |

use crate::handlers::{created, invalid, ok, ok_with, ApiResult, Created};
use crate::server::AppState;
use crate::services::geo::{haversine_km, validate_coordinates};
use crate::services::{format_amount, validate_amount, AnalyticsService, AuditService};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use lib_core::dto::{
    CreateDisasterRequest, DisasterListQuery, DisasterStats, FundDisasterRequest, FundingResponse,
    NearbyDisaster, NearbyQuery, PageQuery, Paginated, UpdateDisasterRequest,
};
use lib_core::model::store::disaster_repository::DisasterFilter;
use lib_core::model::store::enums::{DisasterSeverity, DisasterStatus, Role, VendorStatus};
use lib_core::model::store::models::{Disaster, DisasterForCreate, DisasterForUpdate, Vendor};
use lib_core::model::store::vendor_repository::VendorFilter;
use lib_core::model::store::{DisasterRepository, VendorRepository};
use lib_core::{AppError, Ctx, DbPool, Result};
use lib_integrations::FundingRecord;
use lib_utils::validate_not_empty;
use serde_json::json;
use tracing::{info, instrument, warn};

const DEFAULT_NEARBY_RADIUS_KM: f64 = 100.0;
const DEFAULT_ZONE_RADIUS_KM: f64 = 10.0;
/// Half the Earth's circumference.
const MAX_RADIUS_KM: f64 = 20_038.0;

const MANAGERS: &[Role] = &[Role::Admin, Role::Government];

pub(crate) async fn load_disaster(db: &DbPool, id: i64) -> Result<Disaster> {
    DisasterRepository::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Disaster not found".to_string()))
}

async fn invalidate(state: &AppState) {
    state.cache.invalidate_pattern("disasters:*").await;
    state.cache.invalidate_pattern("analytics:*").await;
}

fn validate_radius(radius_km: f64) -> Result<()> {
    if radius_km > 0.0 && radius_km <= MAX_RADIUS_KM {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!("radius_km must be in (0, {}]", MAX_RADIUS_KM)))
    }
}

pub async fn list_disasters(
    State(state): State<AppState>,
    Query(query): Query<DisasterListQuery>,
) -> ApiResult<Paginated<Disaster>> {
    let page = query.page();
    let search = query.search.clone().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let key = format!(
        "disasters:list:{}:{}:{}:{}:{}",
        query.status.map(|s| s.as_str()).unwrap_or("*"),
        query.severity.map(|s| s.as_str()).unwrap_or("*"),
        search.as_deref().unwrap_or(""),
        page.number(),
        page.limit
    );

    let filter = DisasterFilter { status: query.status, severity: query.severity, search };
    let db = state.db.clone();
    let result = state
        .cache
        .get_or_set(&key, None, || async move {
            let (items, total) = DisasterRepository::list(&db, &filter, page).await?;
            Ok(Paginated::new(items, page, total))
        })
        .await?;
    ok(result)
}

/// Active disasters within `radius_km` of a point, nearest first.
pub async fn nearby_disasters(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> ApiResult<Vec<NearbyDisaster>> {
    validate_coordinates(query.lat, query.lng)?;
    let radius_km = query.radius_km.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);
    validate_radius(radius_km)?;

    let mut nearby: Vec<NearbyDisaster> = DisasterRepository::list_active(&state.db)
        .await?
        .into_iter()
        .map(|disaster| {
            let distance_km = haversine_km(query.lat, query.lng, disaster.latitude, disaster.longitude);
            NearbyDisaster { disaster, distance_km: (distance_km * 100.0).round() / 100.0 }
        })
        .filter(|d| d.distance_km <= radius_km)
        .collect();
    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    ok(nearby)
}

pub async fn get_disaster(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Disaster> {
    let db = state.db.clone();
    let disaster = state
        .cache
        .get_or_set(&format!("disasters:{}", id), None, || async move { load_disaster(&db, id).await })
        .await?;
    ok(disaster)
}

pub async fn disaster_stats(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<DisasterStats> {
    let db = state.db.clone();
    let stats = state
        .cache
        .get_or_set(&format!("disasters:{}:stats", id), None, || async move {
            let disaster = load_disaster(&db, id).await?;
            AnalyticsService::new(db).disaster_stats(&disaster).await
        })
        .await?;
    ok(stats)
}

/// Approved vendors registered for a disaster.
pub async fn disaster_vendors(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Paginated<Vendor>> {
    load_disaster(&state.db, id).await?;

    let filter = VendorFilter { disaster_id: Some(id), status: Some(VendorStatus::Approved), category: None };
    let page = query.page();
    let (items, total) = VendorRepository::list(&state.db, &filter, page).await?;
    ok(Paginated::new(items, page, total))
}

#[instrument(skip(state, ctx, req), fields(name = %req.name))]
pub async fn create_disaster(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Json(req): Json<CreateDisasterRequest>,
) -> Created<Disaster> {
    ctx.require_role(MANAGERS)?;

    validate_not_empty(&req.name, "name").map_err(invalid)?;
    validate_not_empty(&req.location, "location").map_err(invalid)?;
    validate_coordinates(req.latitude, req.longitude)?;
    let radius_km = req.radius_km.unwrap_or(DEFAULT_ZONE_RADIUS_KM);
    validate_radius(radius_km)?;
    let funding_goal = req.funding_goal.unwrap_or(0);
    if funding_goal < 0 {
        return Err(AppError::InvalidInput("funding_goal cannot be negative".to_string()));
    }

    let disaster = DisasterRepository::create(
        &state.db,
        &DisasterForCreate {
            name: req.name.trim().to_string(),
            description: req.description,
            location: req.location.trim().to_string(),
            latitude: req.latitude,
            longitude: req.longitude,
            radius_km,
            severity: req.severity.unwrap_or(DisasterSeverity::Medium),
            funding_goal,
            created_by: ctx.user_id,
        },
    )
    .await?;
    info!("[DISASTER] Created {} ({})", disaster.id, disaster.name);

    AuditService::record(&state.db, &ctx, "disaster.create", "disaster", disaster.id, json!({ "name": disaster.name })).await;
    invalidate(&state).await;
    created(disaster, "Disaster created")
}

pub async fn update_disaster(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDisasterRequest>,
) -> ApiResult<Disaster> {
    ctx.require_role(MANAGERS)?;
    let current = load_disaster(&state.db, id).await?;

    for (value, field) in [(&req.name, "name"), (&req.location, "location")] {
        if let Some(value) = value {
            validate_not_empty(value, field).map_err(invalid)?;
        }
    }
    if req.latitude.is_some() || req.longitude.is_some() {
        validate_coordinates(
            req.latitude.unwrap_or(current.latitude),
            req.longitude.unwrap_or(current.longitude),
        )?;
    }
    if let Some(radius_km) = req.radius_km {
        validate_radius(radius_km)?;
    }
    if req.funding_goal.is_some_and(|goal| goal < 0) {
        return Err(AppError::InvalidInput("funding_goal cannot be negative".to_string()));
    }

    let disaster = DisasterRepository::update(
        &state.db,
        id,
        &DisasterForUpdate {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
            location: req.location.map(|l| l.trim().to_string()),
            latitude: req.latitude,
            longitude: req.longitude,
            radius_km: req.radius_km,
            severity: req.severity,
            status: req.status,
            funding_goal: req.funding_goal,
        },
    )
    .await?;

    AuditService::record(
        &state.db,
        &ctx,
        "disaster.update",
        "disaster",
        id,
        json!({ "status_from": current.status, "status_to": disaster.status }),
    )
    .await;
    invalidate(&state).await;
    ok(disaster)
}

/// Admin only. Refused while vouchers or vendors reference the disaster.
pub async fn delete_disaster(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    ctx.require_admin()?;
    let disaster = load_disaster(&state.db, id).await?;

    let (vouchers, vendors) = DisasterRepository::count_dependents(&state.db, id).await?;
    if vouchers > 0 || vendors > 0 {
        return Err(AppError::Conflict(format!(
            "Disaster has {} vouchers and {} vendors; archive it instead",
            vouchers, vendors
        )));
    }

    DisasterRepository::delete(&state.db, id).await?;
    info!("[DISASTER] Deleted {} ({})", id, disaster.name);

    AuditService::record(&state.db, &ctx, "disaster.delete", "disaster", id, json!({ "name": disaster.name })).await;
    invalidate(&state).await;
    ok_with((), "Disaster deleted")
}

/// Record a donation on the ledger, then credit the disaster.
#[instrument(skip(state, ctx, req), fields(disaster_id = id, amount = req.amount))]
pub async fn fund_disaster(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
    Json(req): Json<FundDisasterRequest>,
) -> ApiResult<FundingResponse> {
    validate_amount(req.amount)?;

    let disaster = load_disaster(&state.db, id).await?;
    if disaster.status != DisasterStatus::Active {
        return Err(AppError::Conflict("Disaster is not accepting funds".to_string()));
    }
    if disaster.total_funding.checked_add(req.amount).is_none() {
        return Err(funding_overflow());
    }

    let receipt = state
        .integrations
        .ledger
        .record_funding(&FundingRecord { disaster_id: id, donor_id: ctx.user_id, amount: req.amount })
        .await?;

    let disaster = DisasterRepository::add_funding(&state.db, id, req.amount)
        .await?
        .ok_or_else(|| {
            warn!("[FUNDING] Ledger tx {} recorded but disaster {} total is full", receipt.tx_hash, id);
            funding_overflow()
        })?;
    info!(
        "[FUNDING] {} added to disaster {} by user {} (tx {})",
        format_amount(req.amount),
        id,
        ctx.user_id,
        receipt.tx_hash
    );

    AuditService::record(
        &state.db,
        &ctx,
        "disaster.fund",
        "disaster",
        id,
        json!({ "amount": req.amount, "tx_hash": receipt.tx_hash }),
    )
    .await;
    invalidate(&state).await;
    ok_with(FundingResponse { disaster, receipt }, "Funding recorded")
}

fn funding_overflow() -> AppError {
    AppError::InvalidInput("Donation would exceed the disaster's funding capacity".to_string())
}
