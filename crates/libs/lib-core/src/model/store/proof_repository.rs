//! # Proof-of-Aid Repository

use super::enums::ProofStatus;
use super::models::{ProofForCreate, ProofOfAid};
use super::{DbPool, Page};
use chrono::Utc;
use sqlx::{query_as, QueryBuilder, Sqlite};

#[derive(Debug, Clone, Default)]
pub struct ProofFilter {
    pub transaction_id: Option<i64>,
    pub status: Option<ProofStatus>,
    pub submitted_by: Option<i64>,
}

pub struct ProofRepository;

impl ProofRepository {
    pub async fn create(pool: &DbPool, data: &ProofForCreate) -> Result<ProofOfAid, sqlx::Error> {
        query_as::<_, ProofOfAid>(
            r#"
            INSERT INTO proofs_of_aid
                (transaction_id, submitted_by, file_name, content_type, file_size, ipfs_cid,
                 gateway_url, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(data.transaction_id)
        .bind(data.submitted_by)
        .bind(&data.file_name)
        .bind(&data.content_type)
        .bind(data.file_size)
        .bind(&data.ipfs_cid)
        .bind(&data.gateway_url)
        .bind(&data.description)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<ProofOfAid>, sqlx::Error> {
        query_as::<_, ProofOfAid>("SELECT * FROM proofs_of_aid WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &DbPool,
        filter: &ProofFilter,
        page: Page,
    ) -> Result<(Vec<ProofOfAid>, i64), sqlx::Error> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM proofs_of_aid");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM proofs_of_aid");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let items = qb.build_query_as::<ProofOfAid>().fetch_all(pool).await?;

        Ok((items, total))
    }

    pub async fn list_for_transaction(
        pool: &DbPool,
        transaction_id: i64,
    ) -> Result<Vec<ProofOfAid>, sqlx::Error> {
        query_as::<_, ProofOfAid>(
            "SELECT * FROM proofs_of_aid WHERE transaction_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(transaction_id)
        .fetch_all(pool)
        .await
    }

    /// Record a review decision. Returns `None` if the proof is no longer pending.
    pub async fn review(
        pool: &DbPool,
        id: i64,
        status: ProofStatus,
        reviewed_by: i64,
        notes: Option<&str>,
    ) -> Result<Option<ProofOfAid>, sqlx::Error> {
        query_as::<_, ProofOfAid>(
            r#"
            UPDATE proofs_of_aid
            SET status = ?, reviewed_by = ?, reviewed_at = ?, review_notes = ?
            WHERE id = ? AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(status.as_str())
        .bind(reviewed_by)
        .bind(Utc::now())
        .bind(notes)
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a ProofFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(id) = filter.transaction_id {
        qb.push(" AND transaction_id = ").push_bind(id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(id) = filter.submitted_by {
        qb.push(" AND submitted_by = ").push_bind(id);
    }
}
