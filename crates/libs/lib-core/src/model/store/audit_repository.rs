//! # Audit Log Repository
//!
//! Append-only. Entries are never updated or deleted by the API.

use super::models::{AuditForCreate, AuditLog};
use super::{DbPool, Page};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{query_as, QueryBuilder, Sqlite};

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub user_id: Option<i64>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub struct AuditRepository;

impl AuditRepository {
    pub async fn create(pool: &DbPool, entry: &AuditForCreate) -> Result<AuditLog, sqlx::Error> {
        query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (user_id, action, entity_type, entity_id, details, ip_address, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(Json(&entry.details))
        .bind(&entry.ip_address)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn list(
        pool: &DbPool,
        filter: &AuditFilter,
        page: Page,
    ) -> Result<(Vec<AuditLog>, i64), sqlx::Error> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM audit_logs");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM audit_logs");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let items = qb.build_query_as::<AuditLog>().fetch_all(pool).await?;

        Ok((items, total))
    }

    /// Full history of one entity, oldest first.
    pub async fn list_for_entity(
        pool: &DbPool,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE entity_type = ? AND entity_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(pool)
        .await
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a AuditFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(action) = &filter.action {
        qb.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(entity_type) = &filter.entity_type {
        qb.push(" AND entity_type = ").push_bind(entity_type.as_str());
    }
    if let Some(from) = filter.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}
