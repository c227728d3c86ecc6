//! # Notification Handlers
//!
//! Each user's in-app inbox, plus staff broadcasts over in-app, email and SMS.

use crate::handlers::{invalid, ok, ok_with, ApiResult};
use crate::server::AppState;
use crate::services::{AuditService, NotificationService};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use lib_core::dto::{
    NotificationListQuery, Paginated, SendNotificationRequest, SendNotificationResult, UnreadCount,
};
use lib_core::model::store::enums::NotificationChannel;
use lib_core::model::store::models::Notification;
use lib_core::model::store::{NotificationRepository, UserRepository};
use lib_core::{AppError, Ctx};
use lib_utils::validate_not_empty;
use serde_json::json;
use tracing::{info, instrument};

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Query(query): Query<NotificationListQuery>,
) -> ApiResult<Paginated<Notification>> {
    let page = query.page();
    let (items, total) =
        NotificationRepository::list_for_user(&state.db, ctx.user_id, query.unread_only, page).await?;
    ok(Paginated::new(items, page, total))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
) -> ApiResult<UnreadCount> {
    let unread = NotificationRepository::unread_count(&state.db, ctx.user_id).await?;
    ok(UnreadCount { unread })
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<Notification> {
    let notification = NotificationRepository::mark_read(&state.db, id, ctx.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;
    ok(notification)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
) -> ApiResult<u64> {
    let updated = NotificationRepository::mark_all_read(&state.db, ctx.user_id).await?;
    ok_with(updated, "Notifications marked as read")
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    if NotificationRepository::delete(&state.db, id, ctx.user_id).await? == 0 {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    ok_with((), "Notification deleted")
}

/// Staff only. Addressed to exactly one of `user_id` or `role`.
///
/// Email and SMS failures are queued for retry and counted in the result
/// instead of failing the request.
#[instrument(skip(state, ctx, req), fields(sender = ctx.user_id))]
pub async fn send_notification(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Json(req): Json<SendNotificationRequest>,
) -> ApiResult<SendNotificationResult> {
    ctx.require_staff()?;
    validate_not_empty(&req.title, "title").map_err(invalid)?;
    validate_not_empty(&req.message, "message").map_err(invalid)?;

    let recipients = match (req.user_id, req.role) {
        (Some(user_id), None) => {
            let user = UserRepository::find_by_id(&state.db, user_id)
                .await?
                .filter(|u| u.is_active)
                .ok_or_else(|| AppError::NotFound("Recipient not found".to_string()))?;
            vec![user]
        }
        (None, Some(role)) => UserRepository::list_active_by_role(&state.db, role).await?,
        _ => {
            return Err(AppError::InvalidInput("Specify exactly one of user_id or role".to_string()));
        }
    };

    let mut channels: Vec<NotificationChannel> = Vec::new();
    for channel in req.channels.unwrap_or_default() {
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    }
    if channels.is_empty() {
        channels.push(NotificationChannel::InApp);
    }
    let kind = req.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()).unwrap_or("announcement");

    let result = NotificationService::new(state.db.clone(), state.integrations.clone())
        .send(&recipients, req.title.trim(), req.message.trim(), kind, &channels)
        .await;
    info!(
        "[NOTIFY] Sent to {} recipients ({} queued for retry)",
        result.recipients, result.queued_for_retry
    );

    AuditService::record(
        &state.db,
        &ctx,
        "notification.send",
        "notification",
        req.user_id.map(|id| id.to_string()).or(req.role.map(|r| r.to_string())).unwrap_or_default(),
        json!({ "recipients": result.recipients, "channels": channels, "kind": kind }),
    )
    .await;
    ok(result)
}
