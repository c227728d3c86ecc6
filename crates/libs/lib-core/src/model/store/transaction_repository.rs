//! # Transaction Repository
//!
//! Redemption records plus the aggregate queries behind analytics.

use super::enums::TransactionStatus;
use super::models::{Transaction, TransactionForCreate};
use super::{DbPool, Page};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteExecutor;
use sqlx::{query_as, FromRow, QueryBuilder, Sqlite};

/// Filters for listing transactions. Party fields scope the result to one
/// vendor or beneficiary.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub disaster_id: Option<i64>,
    pub vendor_id: Option<i64>,
    pub voucher_id: Option<i64>,
    pub beneficiary_id: Option<i64>,
    pub status: Option<TransactionStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CategoryVolume {
    pub category: String,
    pub count: i64,
    pub volume: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DailyVolume {
    /// `YYYY-MM-DD` in UTC
    pub day: String,
    pub count: i64,
    pub volume: i64,
}

pub struct TransactionRepository;

impl TransactionRepository {
    pub async fn create<'e, E>(db: E, data: &TransactionForCreate) -> Result<Transaction, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions
                (voucher_id, vendor_id, beneficiary_id, disaster_id, amount, category,
                 description, tx_hash, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(data.voucher_id)
        .bind(data.vendor_id)
        .bind(data.beneficiary_id)
        .bind(data.disaster_id)
        .bind(data.amount)
        .bind(&data.category)
        .bind(&data.description)
        .bind(&data.tx_hash)
        .bind(data.status.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id<'e, E>(db: E, id: i64) -> Result<Option<Transaction>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        pool: &DbPool,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<(Vec<Transaction>, i64), sqlx::Error> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM transactions");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM transactions");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let items = qb.build_query_as::<Transaction>().fetch_all(pool).await?;

        Ok((items, total))
    }

    /// Set the status only if it is still `expected`. Returns `None` when another
    /// writer changed it first.
    pub async fn update_status<'e, E>(
        db: E,
        id: i64,
        expected: TransactionStatus,
        status: TransactionStatus,
    ) -> Result<Option<Transaction>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            RETURNING *
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(expected.as_str())
        .fetch_optional(db)
        .await
    }

    /// `(count, volume)` of non-failed transactions, optionally within one disaster.
    pub async fn totals(pool: &DbPool, disaster_id: Option<i64>) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*), COALESCE(SUM(amount), 0) FROM transactions
            WHERE status != 'failed' AND (? IS NULL OR disaster_id = ?)
            "#,
        )
        .bind(disaster_id)
        .bind(disaster_id)
        .fetch_one(pool)
        .await
    }

    pub async fn volume_by_category(
        pool: &DbPool,
        disaster_id: Option<i64>,
    ) -> Result<Vec<CategoryVolume>, sqlx::Error> {
        query_as::<_, CategoryVolume>(
            r#"
            SELECT category, COUNT(*) AS count, COALESCE(SUM(amount), 0) AS volume
            FROM transactions
            WHERE status != 'failed' AND (? IS NULL OR disaster_id = ?)
            GROUP BY category
            ORDER BY volume DESC, category ASC
            "#,
        )
        .bind(disaster_id)
        .bind(disaster_id)
        .fetch_all(pool)
        .await
    }

    /// Per-day count and volume of non-failed transactions since `since`.
    pub async fn daily_volume(
        pool: &DbPool,
        since: DateTime<Utc>,
        disaster_id: Option<i64>,
    ) -> Result<Vec<DailyVolume>, sqlx::Error> {
        query_as::<_, DailyVolume>(
            r#"
            SELECT substr(created_at, 1, 10) AS day, COUNT(*) AS count, COALESCE(SUM(amount), 0) AS volume
            FROM transactions
            WHERE status != 'failed' AND created_at >= ? AND (? IS NULL OR disaster_id = ?)
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(since)
        .bind(disaster_id)
        .bind(disaster_id)
        .fetch_all(pool)
        .await
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a TransactionFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(id) = filter.disaster_id {
        qb.push(" AND disaster_id = ").push_bind(id);
    }
    if let Some(id) = filter.vendor_id {
        qb.push(" AND vendor_id = ").push_bind(id);
    }
    if let Some(id) = filter.voucher_id {
        qb.push(" AND voucher_id = ").push_bind(id);
    }
    if let Some(id) = filter.beneficiary_id {
        qb.push(" AND beneficiary_id = ").push_bind(id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(from) = filter.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}
