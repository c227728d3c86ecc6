//! # IPFS Handlers
//!
//! Direct access to the pinning service for signed-in users. Unpinning is
//! admin only.

use crate::handlers::{created, essence, ok, ok_with, read_multipart, ApiResult, Created};
use crate::server::AppState;
use crate::services::AuditService;
use axum::{
    extract::{Multipart, Path, State},
    Extension, Json,
};
use lib_core::dto::{GatewayInfo, PinJsonRequest};
use lib_core::{AppError, Ctx, Result};
use lib_integrations::PinnedContent;
use serde_json::json;
use tracing::info;

fn validate_cid(cid: &str) -> Result<&str> {
    let cid = cid.trim();
    if cid.is_empty() || cid.len() > 128 || !cid.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidInput("Invalid CID".to_string()));
    }
    Ok(cid)
}

/// Multipart with a single `file` part.
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    multipart: Multipart,
) -> Created<PinnedContent> {
    let (_, file) = read_multipart(multipart).await?.require_file()?;
    let content_type = essence(&file.content_type);

    let pinned = state
        .integrations
        .ipfs
        .pin_file(&file.file_name, &content_type, file.bytes)
        .await?;
    info!("[IPFS] User {} pinned {} ({} bytes)", ctx.user_id, pinned.cid, pinned.size);

    AuditService::record(
        &state.db,
        &ctx,
        "ipfs.upload",
        "ipfs",
        &pinned.cid,
        json!({ "file_name": file.file_name, "size": pinned.size }),
    )
    .await;
    created(pinned, "File pinned")
}

pub async fn pin_json(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Json(req): Json<PinJsonRequest>,
) -> Created<PinnedContent> {
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("document.json")
        .to_string();

    let pinned = state.integrations.ipfs.pin_json(&name, &req.content).await?;
    info!("[IPFS] User {} pinned JSON {} as {}", ctx.user_id, name, pinned.cid);

    AuditService::record(&state.db, &ctx, "ipfs.pin_json", "ipfs", &pinned.cid, json!({ "name": name })).await;
    created(pinned, "JSON pinned")
}

pub async fn gateway_info(State(state): State<AppState>, Path(cid): Path<String>) -> ApiResult<GatewayInfo> {
    let cid = validate_cid(&cid)?;
    ok(GatewayInfo { cid: cid.to_string(), gateway_url: state.integrations.ipfs.gateway_url(cid) })
}

/// Admin only.
pub async fn unpin(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(cid): Path<String>,
) -> ApiResult<()> {
    ctx.require_admin()?;
    let cid = validate_cid(&cid)?;

    state.integrations.ipfs.unpin(cid).await?;
    info!("[IPFS] {} unpinned by {}", cid, ctx.user_id);

    AuditService::record(&state.db, &ctx, "ipfs.unpin", "ipfs", cid, json!({})).await;
    ok_with((), "Content unpinned")
}
