//! # Voucher Repository
//!
//! Balance changes are single conditional `UPDATE` statements: a debit only
//! succeeds while the voucher is active, unexpired and holds at least the
//! requested amount, so two concurrent redemptions can never overdraw it.

use super::enums::VoucherStatus;
use super::models::{Voucher, VoucherForCreate};
use super::{DbPool, Page};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteExecutor;
use sqlx::types::Json;
use sqlx::{query_as, QueryBuilder, Sqlite};

#[derive(Debug, Clone, Default)]
pub struct VoucherFilter {
    pub beneficiary_id: Option<i64>,
    pub disaster_id: Option<i64>,
    pub status: Option<VoucherStatus>,
}

pub struct VoucherRepository;

impl VoucherRepository {
    pub async fn create<'e, E>(db: E, data: &VoucherForCreate) -> Result<Voucher, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = Utc::now();
        query_as::<_, Voucher>(
            r#"
            INSERT INTO vouchers
                (code, beneficiary_id, disaster_id, issued_by, amount, remaining_amount,
                 allowed_categories, expires_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&data.code)
        .bind(data.beneficiary_id)
        .bind(data.disaster_id)
        .bind(data.issued_by)
        .bind(data.amount)
        .bind(data.amount)
        .bind(Json(&data.allowed_categories))
        .bind(data.expires_at)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id<'e, E>(db: E, id: i64) -> Result<Option<Voucher>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Voucher>("SELECT * FROM vouchers WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_code<'e, E>(db: E, code: &str) -> Result<Option<Voucher>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Voucher>("SELECT * FROM vouchers WHERE code = ? COLLATE NOCASE")
            .bind(code)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        pool: &DbPool,
        filter: &VoucherFilter,
        page: Page,
    ) -> Result<(Vec<Voucher>, i64), sqlx::Error> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM vouchers");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM vouchers");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let vouchers = qb.build_query_as::<Voucher>().fetch_all(pool).await?;

        Ok((vouchers, total))
    }

    /// Take `amount` off the balance, marking the voucher `used` when it reaches zero.
    ///
    /// Returns `None` when the voucher is not active, has expired, or holds
    /// less than `amount`.
    pub async fn debit<'e, E>(
        db: E,
        id: i64,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Voucher>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Voucher>(
            r#"
            UPDATE vouchers
            SET remaining_amount = remaining_amount - ?,
                status = CASE WHEN remaining_amount - ? = 0 THEN 'used' ELSE status END,
                redeemed_at = ?,
                updated_at = ?
            WHERE id = ? AND status = 'active' AND remaining_amount >= ? AND expires_at > ?
            RETURNING *
            "#,
        )
        .bind(amount)
        .bind(amount)
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(amount)
        .bind(now)
        .fetch_optional(db)
        .await
    }

    /// Put `amount` back on the balance. A `used` voucher becomes active again.
    pub async fn credit<'e, E>(db: E, id: i64, amount: i64) -> Result<Voucher, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Voucher>(
            r#"
            UPDATE vouchers
            SET remaining_amount = remaining_amount + ?,
                status = CASE WHEN status = 'used' THEN 'active' ELSE status END,
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(db)
        .await
    }

    /// Revoke an active voucher. Returns `None` if it was not active.
    pub async fn revoke<'e, E>(db: E, id: i64) -> Result<Option<Voucher>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Voucher>(
            r#"
            UPDATE vouchers SET status = 'revoked', updated_at = ?
            WHERE id = ? AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Mark overdue active vouchers `expired` and hand their unspent balance
    /// back to each disaster's unallocated pool.
    pub async fn expire_overdue(pool: &DbPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE disasters
            SET total_allocated = total_allocated - (
                    SELECT COALESCE(SUM(remaining_amount), 0) FROM vouchers
                    WHERE vouchers.disaster_id = disasters.id
                      AND status = 'active' AND expires_at <= ?
                ),
                updated_at = ?
            WHERE id IN (
                SELECT disaster_id FROM vouchers WHERE status = 'active' AND expires_at <= ?
            )
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE vouchers SET status = 'expired', updated_at = ? WHERE status = 'active' AND expires_at <= ?",
        )
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Voucher counts grouped by status, optionally within one disaster.
    pub async fn count_by_status(
        pool: &DbPool,
        disaster_id: Option<i64>,
    ) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*) FROM vouchers
            WHERE (? IS NULL OR disaster_id = ?)
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(disaster_id)
        .bind(disaster_id)
        .fetch_all(pool)
        .await
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a VoucherFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(beneficiary_id) = filter.beneficiary_id {
        qb.push(" AND beneficiary_id = ").push_bind(beneficiary_id);
    }
    if let Some(disaster_id) = filter.disaster_id {
        qb.push(" AND disaster_id = ").push_bind(disaster_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}
