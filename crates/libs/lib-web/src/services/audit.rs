//! # Audit Service
//!
//! Appends audit entries for state-changing requests. Writes are
//! log-and-continue: a failed audit insert never fails the request.

use lib_core::model::store::models::AuditForCreate;
use lib_core::model::store::AuditRepository;
use lib_core::{Ctx, DbPool};
use serde_json::Value;
use tracing::{debug, warn};

pub struct AuditService;

impl AuditService {
    /// Record `action` (dotted, e.g. `voucher.issue`) by the caller in `ctx`.
    pub async fn record(
        pool: &DbPool,
        ctx: &Ctx,
        action: &str,
        entity_type: &str,
        entity_id: impl ToString,
        details: Value,
    ) {
        let entry = AuditForCreate {
            user_id: Some(ctx.user_id),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: Some(entity_id.to_string()),
            details,
            ip_address: ctx.client_ip.clone(),
        };

        match AuditRepository::create(pool, &entry).await {
            Ok(log) => debug!("[AUDIT] {} {}#{} (entry {})", action, entity_type, log.entity_id.unwrap_or_default(), log.id),
            Err(e) => warn!("[AUDIT] Failed to record {} on {}: {}", action, entity_type, e),
        }
    }
}
