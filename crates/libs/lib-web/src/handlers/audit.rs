//! # Audit Handlers
//!
//! Read access to the audit trail. Entries are written by
//! [`crate::services::AuditService`] from the mutating handlers.

use crate::handlers::{ok, ApiResult};
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    Extension,
};
use lib_core::dto::{AuditListQuery, Paginated};
use lib_core::model::store::audit_repository::AuditFilter;
use lib_core::model::store::models::AuditLog;
use lib_core::model::store::AuditRepository;
use lib_core::Ctx;

/// Admin only.
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Query(query): Query<AuditListQuery>,
) -> ApiResult<Paginated<AuditLog>> {
    ctx.require_admin()?;

    let filter = AuditFilter {
        user_id: query.user_id,
        action: query.action.clone().filter(|a| !a.trim().is_empty()),
        entity_type: query.entity_type.clone().filter(|e| !e.trim().is_empty()),
        from: query.from,
        to: query.to,
    };
    let page = query.page();
    let (items, total) = AuditRepository::list(&state.db, &filter, page).await?;
    ok(Paginated::new(items, page, total))
}

/// History of one entity, oldest first. Staff only.
pub async fn entity_history(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> ApiResult<Vec<AuditLog>> {
    ctx.require_staff()?;
    ok(AuditRepository::list_for_entity(&state.db, &entity_type, &entity_id).await?)
}
