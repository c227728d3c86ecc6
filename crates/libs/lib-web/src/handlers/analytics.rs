//! # Analytics Handlers
//!
//! Staff dashboards. Every result is cached under `analytics:*` and cleared
//! whenever money moves.

use crate::handlers::disasters::load_disaster;
use crate::handlers::{ok, ApiResult};
use crate::server::AppState;
use crate::services::analytics::{clamp_days, clamp_limit};
use crate::services::AnalyticsService;
use axum::{
    extract::{Path, Query, State},
    Extension,
};
use lib_core::dto::{AnalyticsQuery, DisasterBreakdown, Overview, Timeseries};
use lib_core::model::store::models::Vendor;
use lib_core::Ctx;

pub async fn overview(State(state): State<AppState>, Extension(ctx): Extension<Ctx>) -> ApiResult<Overview> {
    ctx.require_staff()?;

    let db = state.db.clone();
    let overview = state
        .cache
        .get_or_set("analytics:overview", None, || async move { AnalyticsService::new(db).overview().await })
        .await?;
    ok(overview)
}

/// Volume by category, top vendors and daily volume for one disaster.
pub async fn disaster_breakdown(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<DisasterBreakdown> {
    ctx.require_staff()?;
    load_disaster(&state.db, id).await?;

    let days = clamp_days(query.days);
    let limit = clamp_limit(query.limit);
    let db = state.db.clone();
    let breakdown = state
        .cache
        .get_or_set(&format!("analytics:disaster:{}:{}:{}", id, days, limit), None, || async move {
            AnalyticsService::new(db).disaster_breakdown(id, days, limit).await
        })
        .await?;
    ok(breakdown)
}

pub async fn top_vendors(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Vec<Vendor>> {
    ctx.require_staff()?;

    let limit = clamp_limit(query.limit);
    let disaster_id = query.disaster_id;
    let key = format!(
        "analytics:top_vendors:{}:{}",
        limit,
        disaster_id.map(|id| id.to_string()).unwrap_or_else(|| "*".to_string())
    );
    let db = state.db.clone();
    let vendors = state
        .cache
        .get_or_set(&key, None, || async move { AnalyticsService::new(db).top_vendors(limit, disaster_id).await })
        .await?;
    ok(vendors)
}

/// Per-day redemption count and volume over the last `days` days.
pub async fn timeseries(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Timeseries> {
    ctx.require_staff()?;

    let days = clamp_days(query.days);
    let disaster_id = query.disaster_id;
    let key = format!(
        "analytics:timeseries:{}:{}",
        days,
        disaster_id.map(|id| id.to_string()).unwrap_or_else(|| "*".to_string())
    );
    let db = state.db.clone();
    let series = state
        .cache
        .get_or_set(&key, None, || async move { AnalyticsService::new(db).timeseries(days, disaster_id).await })
        .await?;
    ok(series)
}
