//! Maintenance commands. Each takes an open pool so they can run against the
//! production database or a test one.

use chrono::{DateTime, Duration, Utc};
use lib_core::model::store::enums::Role;
use lib_core::model::store::models::{AuditForCreate, User};
use lib_core::model::store::{
    AuditRepository, CacheRepository, DbPool, JobRepository, SessionRepository, UserRepository,
    VoucherRepository,
};
use lib_integrations::Integrations;
use lib_web::services::notification::JobRunSummary;
use lib_web::services::NotificationService;
use serde_json::json;

/// Expired or revoked sessions are kept this long for the audit trail.
pub const SESSION_RETENTION_DAYS: i64 = 30;
/// Completed jobs are kept this long.
pub const JOB_RETENTION_DAYS: i64 = 7;
/// Default batch for `process-jobs`.
pub const DEFAULT_JOB_BATCH: usize = 100;
/// Cached reads that embed disaster totals.
const TOTALS_CACHE_PATTERNS: [&str; 2] = ["disasters:*", "analytics:*"];

/// Rows touched by one `purge` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub cache_entries: u64,
    pub sessions: u64,
    pub vouchers_expired: u64,
    pub jobs: u64,
}

pub async fn purge(pool: &DbPool, now: DateTime<Utc>) -> anyhow::Result<PurgeReport> {
    let cache_entries = CacheRepository::purge_expired(pool, now).await?;
    let sessions = SessionRepository::purge(pool, now - Duration::days(SESSION_RETENTION_DAYS)).await?;

    // Expiry hands allocations back, so cached totals go stale.
    let vouchers_expired = VoucherRepository::expire_overdue(pool, now).await?;
    if vouchers_expired > 0 {
        for pattern in TOTALS_CACHE_PATTERNS {
            CacheRepository::delete_matching(pool, pattern).await?;
        }
    }

    let jobs = JobRepository::purge_completed(pool, now - Duration::days(JOB_RETENTION_DAYS)).await?;
    Ok(PurgeReport { cache_entries, sessions, vouchers_expired, jobs })
}

pub async fn process_jobs(
    pool: &DbPool,
    integrations: Integrations,
    max: usize,
) -> anyhow::Result<JobRunSummary> {
    let service = NotificationService::new(pool.clone(), integrations);
    Ok(service.run_due(max).await?)
}

/// Give an existing account `role`, mark it verified and active.
pub async fn promote(pool: &DbPool, wallet_address: &str, role: Role) -> anyhow::Result<User> {
    let user = UserRepository::find_by_wallet(pool, wallet_address.trim())
        .await?
        .ok_or_else(|| anyhow::anyhow!("No user with wallet {}", wallet_address))?;

    let previous = user.role;
    UserRepository::set_role(pool, user.id, role).await?;
    UserRepository::set_active(pool, user.id, true).await?;
    let user = UserRepository::set_verified(pool, user.id, user.id).await?;

    AuditRepository::create(
        pool,
        &AuditForCreate {
            user_id: None,
            action: "user.role".to_string(),
            entity_type: "user".to_string(),
            entity_id: Some(user.id.to_string()),
            details: json!({ "from": previous, "to": role, "source": "maintenance" }),
            ip_address: None,
        },
    )
    .await?;

    Ok(user)
}
