//! # User Handlers
//!
//! Profiles for everyone, account administration for staff. Profiles are
//! cached under `users:{id}`; every mutation clears `users:*`.

use crate::handlers::auth::{normalize_email, normalize_phone};
use crate::handlers::{invalid, ok, ok_with, ApiResult};
use crate::server::AppState;
use crate::services::{AuditService, NotificationService};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use lib_core::dto::{Paginated, SetActiveRequest, SetRoleRequest, UpdateProfileRequest, UserListQuery};
use lib_core::model::store::enums::Role;
use lib_core::model::store::models::{User, UserForUpdate};
use lib_core::model::store::user_repository::UserFilter;
use lib_core::model::store::{SessionRepository, UserRepository};
use lib_core::{AppError, Ctx, DbPool, Result};
use lib_utils::validate_not_empty;
use serde_json::json;
use tracing::{info, instrument};

async fn load_user(db: &DbPool, id: i64) -> Result<User> {
    UserRepository::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Staff only. Filters: role, is_verified, is_active, search.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Paginated<User>> {
    ctx.require_staff()?;

    let filter = UserFilter {
        role: query.role,
        is_verified: query.is_verified,
        is_active: query.is_active,
        search: query.search.clone().filter(|s| !s.trim().is_empty()),
    };
    let page = query.page();
    let (items, total) = UserRepository::list(&state.db, &filter, page).await?;
    ok(Paginated::new(items, page, total))
}

pub async fn get_me(State(state): State<AppState>, Extension(ctx): Extension<Ctx>) -> ApiResult<User> {
    ok(load_user(&state.db, ctx.user_id).await?)
}

#[instrument(skip(state, ctx, req), fields(user_id = ctx.user_id))]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<User> {
    if let Some(name) = &req.name {
        validate_not_empty(name, "name").map_err(invalid)?;
    }
    let email = normalize_email(req.email)?;
    let phone = normalize_phone(req.phone)?;

    if let Some(email) = &email {
        if let Some(other) = UserRepository::find_by_email(&state.db, email).await? {
            if other.id != ctx.user_id {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }
    }

    let user = UserRepository::update_profile(
        &state.db,
        ctx.user_id,
        &UserForUpdate { name: req.name.map(|n| n.trim().to_string()), email, phone },
    )
    .await?;

    AuditService::record(&state.db, &ctx, "user.update", "user", user.id, json!({})).await;
    state.cache.invalidate_pattern("users:*").await;
    ok(user)
}

/// Self or staff.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<User> {
    ctx.require_self_or_staff(id)?;

    let db = state.db.clone();
    let user = state
        .cache
        .get_or_set(&format!("users:{}", id), None, || async move { load_user(&db, id).await })
        .await?;
    ok(user)
}

/// Admin only. Admins cannot change their own role.
#[instrument(skip(state, ctx, req), fields(target = id, role = %req.role))]
pub async fn set_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
    Json(req): Json<SetRoleRequest>,
) -> ApiResult<User> {
    ctx.require_admin()?;
    if id == ctx.user_id {
        return Err(AppError::InvalidInput("You cannot change your own role".to_string()));
    }

    let before = load_user(&state.db, id).await?;
    let user = UserRepository::set_role(&state.db, id, req.role).await?;
    info!("[USERS] User {} role {} -> {}", id, before.role, user.role);

    AuditService::record(&state.db, &ctx, "user.role", "user", id, json!({ "from": before.role, "to": user.role })).await;
    state.cache.invalidate_pattern("users:*").await;
    ok(user)
}

/// Admin or government.
pub async fn verify_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<User> {
    ctx.require_role(&[Role::Admin, Role::Government])?;
    load_user(&state.db, id).await?;

    let user = UserRepository::set_verified(&state.db, id, ctx.user_id).await?;
    info!("[USERS] User {} verified by {}", id, ctx.user_id);

    AuditService::record(&state.db, &ctx, "user.verify", "user", id, json!({})).await;
    NotificationService::new(state.db.clone(), state.integrations.clone())
        .notify(id, "Account verified", "Your account has been verified.", "account")
        .await;
    state.cache.invalidate_pattern("users:*").await;
    ok(user)
}

/// Admin only. Deactivating revokes every session of the user.
pub async fn set_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
    Json(req): Json<SetActiveRequest>,
) -> ApiResult<User> {
    ctx.require_admin()?;
    let user = change_active(&state, &ctx, id, req.is_active).await?;
    ok(user)
}

/// Admin only. Users are never removed, only deactivated.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<User> {
    ctx.require_admin()?;
    let user = change_active(&state, &ctx, id, false).await?;
    ok_with(user, "User deactivated")
}

async fn change_active(state: &AppState, ctx: &Ctx, id: i64, is_active: bool) -> Result<User> {
    if id == ctx.user_id && !is_active {
        return Err(AppError::InvalidInput("You cannot deactivate your own account".to_string()));
    }
    load_user(&state.db, id).await?;

    let user = UserRepository::set_active(&state.db, id, is_active).await?;
    let revoked = if is_active {
        0
    } else {
        SessionRepository::revoke_all_for_user(&state.db, id, None).await?
    };
    info!("[USERS] User {} active={} ({} sessions revoked)", id, is_active, revoked);

    AuditService::record(
        &state.db,
        ctx,
        "user.status",
        "user",
        id,
        json!({ "is_active": is_active, "revoked_sessions": revoked }),
    )
    .await;
    state.cache.invalidate_pattern("users:*").await;
    Ok(user)
}
