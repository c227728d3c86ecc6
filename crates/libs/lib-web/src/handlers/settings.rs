//! # Settings Handlers
//!
//! Runtime settings stored as JSON values. Public settings are readable by
//! anyone; the rest, and every write, need an admin. Also hosts the cache
//! administration endpoints.

use crate::handlers::{invalid, ok, ok_with, ApiResult};
use crate::middleware::OptionalCtx;
use crate::server::AppState;
use crate::services::{AuditService, CacheStats};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use lib_core::dto::{CacheInvalidateQuery, CacheInvalidated, UpsertSettingRequest};
use lib_core::model::store::models::SystemSetting;
use lib_core::model::store::SettingsRepository;
use lib_core::{AppError, Ctx, Result};
use lib_utils::{validate_max_length, validate_not_empty};
use serde_json::json;
use tracing::info;

fn validate_key(key: &str) -> Result<()> {
    validate_not_empty(key, "key").map_err(invalid)?;
    validate_max_length(key, 100, "key").map_err(invalid)?;
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
        return Err(AppError::InvalidInput(
            "key may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

/// Admins get every setting, everyone else the public ones.
pub async fn list_settings(
    State(state): State<AppState>,
    Extension(OptionalCtx(ctx)): Extension<OptionalCtx>,
) -> ApiResult<Vec<SystemSetting>> {
    let public_only = !ctx.as_ref().is_some_and(Ctx::is_admin);
    let key = if public_only { "settings:list:public" } else { "settings:list:all" };

    let db = state.db.clone();
    let settings = state
        .cache
        .get_or_set(key, None, || async move { Ok(SettingsRepository::list(&db, public_only).await?) })
        .await?;
    ok(settings)
}

pub async fn get_setting(
    State(state): State<AppState>,
    Extension(OptionalCtx(ctx)): Extension<OptionalCtx>,
    Path(key): Path<String>,
) -> ApiResult<SystemSetting> {
    let db = state.db.clone();
    let lookup = key.clone();
    let setting = state
        .cache
        .get_or_set(&format!("settings:{}", key), None, || async move {
            SettingsRepository::get(&db, &lookup)
                .await?
                .ok_or_else(|| AppError::NotFound("Setting not found".to_string()))
        })
        .await?;

    if !setting.is_public {
        match ctx {
            None => return Err(AppError::Unauthorized("Authentication required".to_string())),
            Some(ctx) => ctx.require_admin()?,
        }
    }
    ok(setting)
}

/// Admin only. Creates the setting when the key is new.
pub async fn upsert_setting(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(key): Path<String>,
    Json(req): Json<UpsertSettingRequest>,
) -> ApiResult<SystemSetting> {
    ctx.require_admin()?;
    validate_key(&key)?;

    let previous = SettingsRepository::get(&state.db, &key).await?;
    let setting = SettingsRepository::upsert(
        &state.db,
        &key,
        &req.value,
        req.description.as_deref(),
        req.is_public,
        ctx.user_id,
    )
    .await?;
    info!("[SETTINGS] {} set by {}", key, ctx.user_id);

    AuditService::record(
        &state.db,
        &ctx,
        "setting.update",
        "setting",
        &key,
        json!({ "from": previous.map(|p| p.value.0), "to": setting.value.0 }),
    )
    .await;
    state.cache.invalidate_pattern("settings:*").await;
    ok(setting)
}

pub async fn delete_setting(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(key): Path<String>,
) -> ApiResult<()> {
    ctx.require_admin()?;
    if SettingsRepository::delete(&state.db, &key).await? == 0 {
        return Err(AppError::NotFound("Setting not found".to_string()));
    }
    info!("[SETTINGS] {} deleted by {}", key, ctx.user_id);

    AuditService::record(&state.db, &ctx, "setting.delete", "setting", &key, json!({})).await;
    state.cache.invalidate_pattern("settings:*").await;
    ok_with((), "Setting deleted")
}

// region: --- Cache administration

pub async fn cache_stats(State(state): State<AppState>, Extension(ctx): Extension<Ctx>) -> ApiResult<CacheStats> {
    ctx.require_admin()?;
    ok(state.cache.stats().await)
}

/// `DELETE /api/settings/cache?pattern=disasters:*`
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Query(query): Query<CacheInvalidateQuery>,
) -> ApiResult<CacheInvalidated> {
    ctx.require_admin()?;
    let pattern = query.pattern.trim().to_string();
    validate_not_empty(&pattern, "pattern").map_err(invalid)?;

    let removed = state.cache.invalidate_pattern(&pattern).await;
    info!("[CACHE] {} removed {} entries", pattern, removed);

    AuditService::record(&state.db, &ctx, "cache.invalidate", "cache", &pattern, json!({ "removed": removed })).await;
    ok(CacheInvalidated { pattern, removed })
}

// endregion: --- Cache administration

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("voucher.default_expiry_days").is_ok());
        assert!(validate_key("feature-flag_2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("has space").is_err());
        assert!(validate_key(&"k".repeat(101)).is_err());
    }
}
