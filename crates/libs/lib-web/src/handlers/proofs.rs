//! # Proof-of-Aid Handlers
//!
//! Photos or documents showing aid was delivered. Files are pinned to IPFS
//! and reviewed by staff.
//!
//! Size and content-type limits come from the `proof.max_file_size_bytes`
//! and `proof.allowed_content_types` settings.

use crate::handlers::transactions::{is_party, load_transaction};
use crate::handlers::{created, essence, ok, read_multipart, ApiResult, Created};
use crate::server::AppState;
use crate::services::{AuditService, NotificationService};
use axum::{
    extract::{Multipart, Path, Query, State},
    Extension, Json,
};
use lib_core::dto::{Paginated, ProofListQuery, ReviewProofRequest};
use lib_core::model::store::enums::ProofStatus;
use lib_core::model::store::models::{ProofForCreate, ProofOfAid};
use lib_core::model::store::proof_repository::ProofFilter;
use lib_core::model::store::{ProofRepository, SettingsRepository};
use lib_core::{AppError, Ctx, DbPool, Result};
use serde_json::json;
use tracing::{info, instrument, warn};

const DEFAULT_MAX_FILE_SIZE: i64 = 10 * 1024 * 1024;

async fn load_proof(db: &DbPool, id: i64) -> Result<ProofOfAid> {
    ProofRepository::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Proof not found".to_string()))
}

/// Multipart fields: `transaction_id`, `description?`, `file`.
#[instrument(skip(state, ctx, multipart), fields(user_id = ctx.user_id))]
pub async fn upload_proof(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    multipart: Multipart,
) -> Created<ProofOfAid> {
    let form = read_multipart(multipart).await?;
    let transaction_id: i64 = form
        .field("transaction_id")
        .ok_or_else(|| AppError::InvalidInput("Missing 'transaction_id' field".to_string()))?
        .parse()
        .map_err(|_| AppError::InvalidInput("transaction_id must be an integer".to_string()))?;
    let description = form.field("description").map(str::to_string);
    let (_, file) = form.require_file()?;

    let transaction = load_transaction(&state.db, transaction_id).await?;
    if !ctx.is_staff() && !is_party(&state.db, &ctx, &transaction).await? {
        return Err(AppError::Forbidden("Only parties to the transaction can submit proof".to_string()));
    }

    let max_size = SettingsRepository::get_or(&state.db, "proof.max_file_size_bytes", DEFAULT_MAX_FILE_SIZE).await?;
    let file_size = file.bytes.len() as i64;
    if file_size > max_size {
        warn!("[PROOF] Rejected {} byte upload (limit {})", file_size, max_size);
        return Err(AppError::InvalidInput(format!("File exceeds the {} byte limit", max_size)));
    }

    let content_type = essence(&file.content_type);
    let allowed: Vec<String> = SettingsRepository::get_or(&state.db, "proof.allowed_content_types", Vec::new()).await?;
    if !allowed.is_empty() && !allowed.iter().any(|t| t.eq_ignore_ascii_case(&content_type)) {
        return Err(AppError::InvalidInput(format!("Content type '{}' is not accepted", content_type)));
    }

    let pinned = state
        .integrations
        .ipfs
        .pin_file(&file.file_name, &content_type, file.bytes)
        .await?;

    let proof = ProofRepository::create(
        &state.db,
        &ProofForCreate {
            transaction_id,
            submitted_by: ctx.user_id,
            file_name: file.file_name,
            content_type,
            file_size,
            ipfs_cid: pinned.cid,
            gateway_url: pinned.gateway_url,
            description,
        },
    )
    .await?;
    info!("[PROOF] Proof {} for transaction {} pinned as {}", proof.id, transaction_id, proof.ipfs_cid);

    AuditService::record(
        &state.db,
        &ctx,
        "proof.upload",
        "proof",
        proof.id,
        json!({ "transaction_id": transaction_id, "cid": proof.ipfs_cid, "size": file_size }),
    )
    .await;
    created(proof, "Proof uploaded")
}

/// Staff see every proof; everyone else only their own submissions.
pub async fn list_proofs(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Query(query): Query<ProofListQuery>,
) -> ApiResult<Paginated<ProofOfAid>> {
    let filter = ProofFilter {
        transaction_id: query.transaction_id,
        status: query.status,
        submitted_by: if ctx.is_staff() { None } else { Some(ctx.user_id) },
    };
    let page = query.page();
    let (items, total) = ProofRepository::list(&state.db, &filter, page).await?;
    ok(Paginated::new(items, page, total))
}

pub async fn get_proof(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
) -> ApiResult<ProofOfAid> {
    let proof = load_proof(&state.db, id).await?;
    if proof.submitted_by != ctx.user_id && !ctx.is_staff() {
        let transaction = load_transaction(&state.db, proof.transaction_id).await?;
        if !is_party(&state.db, &ctx, &transaction).await? {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
    }
    ok(proof)
}

/// Every proof attached to a transaction. Party or staff.
pub async fn proofs_for_transaction(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(transaction_id): Path<i64>,
) -> ApiResult<Vec<ProofOfAid>> {
    let transaction = load_transaction(&state.db, transaction_id).await?;
    if !ctx.is_staff() && !is_party(&state.db, &ctx, &transaction).await? {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    ok(ProofRepository::list_for_transaction(&state.db, transaction_id).await?)
}

/// Staff only. A proof is reviewed once.
pub async fn review_proof(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Path(id): Path<i64>,
    Json(req): Json<ReviewProofRequest>,
) -> ApiResult<ProofOfAid> {
    ctx.require_staff()?;
    if req.status == ProofStatus::Pending {
        return Err(AppError::InvalidInput("Review status must be verified or rejected".to_string()));
    }

    load_proof(&state.db, id).await?;
    let notes = req.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let proof = ProofRepository::review(&state.db, id, req.status, ctx.user_id, notes)
        .await?
        .ok_or_else(|| AppError::Conflict("Proof has already been reviewed".to_string()))?;
    info!("[PROOF] Proof {} {} by {}", id, proof.status, ctx.user_id);

    AuditService::record(
        &state.db,
        &ctx,
        "proof.review",
        "proof",
        id,
        json!({ "status": proof.status, "notes": proof.review_notes }),
    )
    .await;
    NotificationService::new(state.db.clone(), state.integrations.clone())
        .notify(
            proof.submitted_by,
            "Proof reviewed",
            &format!("Your proof for transaction {} was {}.", proof.transaction_id, proof.status),
            "proof",
        )
        .await;
    ok(proof)
}
