//! # Vendor Repository

use super::enums::VendorStatus;
use super::models::{Vendor, VendorForCreate, VendorForUpdate};
use super::{DbPool, Page};
use chrono::Utc;
use sqlx::sqlite::SqliteExecutor;
use sqlx::{query_as, QueryBuilder, Sqlite};

#[derive(Debug, Clone, Default)]
pub struct VendorFilter {
    pub disaster_id: Option<i64>,
    pub status: Option<VendorStatus>,
    pub category: Option<String>,
}

pub struct VendorRepository;

impl VendorRepository {
    /// Register a vendor profile in `pending` status.
    ///
    /// # Errors
    ///
    /// Unique violation if the user already owns a vendor profile.
    pub async fn create(pool: &DbPool, data: &VendorForCreate) -> Result<Vendor, sqlx::Error> {
        let now = Utc::now();
        query_as::<_, Vendor>(
            r#"
            INSERT INTO vendors
                (user_id, disaster_id, business_name, category, wallet_address, phone, address,
                 latitude, longitude, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.disaster_id)
        .bind(&data.business_name)
        .bind(&data.category)
        .bind(&data.wallet_address)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(db: E, id: i64) -> Result<Option<Vendor>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Vendor>("SELECT * FROM vendors WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_user<'e, E>(db: E, user_id: i64) -> Result<Option<Vendor>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Vendor>("SELECT * FROM vendors WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        pool: &DbPool,
        filter: &VendorFilter,
        page: Page,
    ) -> Result<(Vec<Vendor>, i64), sqlx::Error> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM vendors");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM vendors");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let vendors = qb.build_query_as::<Vendor>().fetch_all(pool).await?;

        Ok((vendors, total))
    }

    pub async fn update(pool: &DbPool, id: i64, data: &VendorForUpdate) -> Result<Vendor, sqlx::Error> {
        query_as::<_, Vendor>(
            r#"
            UPDATE vendors
            SET business_name = COALESCE(?, business_name),
                category = COALESCE(?, category),
                phone = COALESCE(?, phone),
                address = COALESCE(?, address),
                latitude = COALESCE(?, latitude),
                longitude = COALESCE(?, longitude),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&data.business_name)
        .bind(&data.category)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Change vendor status. Approval records who approved and when.
    pub async fn set_status(
        pool: &DbPool,
        id: i64,
        status: VendorStatus,
        changed_by: i64,
    ) -> Result<Vendor, sqlx::Error> {
        let now = Utc::now();
        let approved = status == VendorStatus::Approved;
        query_as::<_, Vendor>(
            r#"
            UPDATE vendors
            SET status = ?,
                approved_by = CASE WHEN ? THEN ? ELSE approved_by END,
                approved_at = CASE WHEN ? THEN ? ELSE approved_at END,
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(status.as_str())
        .bind(approved)
        .bind(changed_by)
        .bind(approved)
        .bind(now)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Adjust the redeemed total by `delta`, which is negative on reversal.
    pub async fn adjust_redeemed<'e, E>(db: E, id: i64, delta: i64) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query("UPDATE vendors SET total_redeemed = total_redeemed + ?, updated_at = ? WHERE id = ?")
            .bind(delta)
            .bind(Utc::now())
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Vendors ordered by redeemed volume, optionally within one disaster.
    pub async fn top_by_redeemed(
        pool: &DbPool,
        disaster_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Vendor>, sqlx::Error> {
        query_as::<_, Vendor>(
            r#"
            SELECT * FROM vendors
            WHERE (? IS NULL OR disaster_id = ?)
            ORDER BY total_redeemed DESC, id ASC
            LIMIT ?
            "#,
        )
        .bind(disaster_id)
        .bind(disaster_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// `(total, approved)` vendor counts, optionally within one disaster.
    pub async fn counts(pool: &DbPool, disaster_id: Option<i64>) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'approved' THEN 1 ELSE 0 END), 0)
            FROM vendors
            WHERE (? IS NULL OR disaster_id = ?)
            "#,
        )
        .bind(disaster_id)
        .bind(disaster_id)
        .fetch_one(pool)
        .await
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a VendorFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(disaster_id) = filter.disaster_id {
        qb.push(" AND disaster_id = ").push_bind(disaster_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
}
