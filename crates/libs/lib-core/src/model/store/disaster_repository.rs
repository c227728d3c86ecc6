//! # Disaster Repository
//!
//! Funding counters (`total_funding`, `total_allocated`, `total_disbursed`)
//! are only ever changed through the conditional updates below so the
//! `disbursed <= allocated <= funding` ordering holds under concurrency.
//! Functions that participate in a redemption accept any executor so they can
//! run on a transaction connection.

use super::enums::{DisasterSeverity, DisasterStatus};
use super::models::{Disaster, DisasterForCreate, DisasterForUpdate};
use super::{contains_pattern, DbPool, Page};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteExecutor;
use sqlx::{query_as, FromRow, QueryBuilder, Sqlite};

#[derive(Debug, Clone, Default)]
pub struct DisasterFilter {
    pub status: Option<DisasterStatus>,
    pub severity: Option<DisasterSeverity>,
    pub search: Option<String>,
}

/// Platform-wide funding totals.
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct FundingTotals {
    pub disasters: i64,
    pub active_disasters: i64,
    pub total_funding: i64,
    pub total_allocated: i64,
    pub total_disbursed: i64,
}

pub struct DisasterRepository;

impl DisasterRepository {
    pub async fn create(pool: &DbPool, data: &DisasterForCreate) -> Result<Disaster, sqlx::Error> {
        let now = Utc::now();
        query_as::<_, Disaster>(
            r#"
            INSERT INTO disasters
                (name, description, location, latitude, longitude, radius_km, severity,
                 funding_goal, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.location)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.radius_km)
        .bind(data.severity.as_str())
        .bind(data.funding_goal)
        .bind(data.created_by)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(db: E, id: i64) -> Result<Option<Disaster>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Disaster>("SELECT * FROM disasters WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        pool: &DbPool,
        filter: &DisasterFilter,
        page: Page,
    ) -> Result<(Vec<Disaster>, i64), sqlx::Error> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM disasters");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM disasters");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let disasters = qb.build_query_as::<Disaster>().fetch_all(pool).await?;

        Ok((disasters, total))
    }

    /// Every disaster in `active` status. Used for proximity search.
    pub async fn list_active(pool: &DbPool) -> Result<Vec<Disaster>, sqlx::Error> {
        query_as::<_, Disaster>("SELECT * FROM disasters WHERE status = 'active' ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// Update descriptive fields. `None` leaves a field unchanged.
    pub async fn update(
        pool: &DbPool,
        id: i64,
        data: &DisasterForUpdate,
    ) -> Result<Disaster, sqlx::Error> {
        query_as::<_, Disaster>(
            r#"
            UPDATE disasters
            SET name = COALESCE(?, name),
                description = COALESCE(?, description),
                location = COALESCE(?, location),
                latitude = COALESCE(?, latitude),
                longitude = COALESCE(?, longitude),
                radius_km = COALESCE(?, radius_km),
                severity = COALESCE(?, severity),
                status = COALESCE(?, status),
                funding_goal = COALESCE(?, funding_goal),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.location)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.radius_km)
        .bind(data.severity.map(|s| s.as_str()))
        .bind(data.status.map(|s| s.as_str()))
        .bind(data.funding_goal)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &DbPool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM disasters WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of vouchers and vendors referencing a disaster.
    pub async fn count_dependents(pool: &DbPool, id: i64) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM vouchers WHERE disaster_id = ?),
                (SELECT COUNT(*) FROM vendors WHERE disaster_id = ?)
            "#,
        )
        .bind(id)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Record a donation.
    ///
    /// Returns `None` when the disaster is missing or the new total would not
    /// fit in an `i64`.
    pub async fn add_funding<'e, E>(db: E, id: i64, amount: i64) -> Result<Option<Disaster>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        query_as::<_, Disaster>(
            r#"
            UPDATE disasters
            SET total_funding = total_funding + ?, updated_at = ?
            WHERE id = ? AND total_funding <= ? - ?
            RETURNING *
            "#,
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(id)
        .bind(i64::MAX)
        .bind(amount)
        .fetch_optional(db)
        .await
    }

    /// Reserve `amount` of unallocated funds.
    ///
    /// Returns `false` without changing anything if the disaster lacks the funds.
    pub async fn allocate<'e, E>(db: E, id: i64, amount: i64) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE disasters
            SET total_allocated = total_allocated + ?, updated_at = ?
            WHERE id = ? AND total_funding - total_allocated >= ?
            "#,
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(id)
        .bind(amount)
        .execute(db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Return previously allocated funds to the unallocated pool.
    pub async fn release_allocation<'e, E>(db: E, id: i64, amount: i64) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            UPDATE disasters
            SET total_allocated = total_allocated - ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Adjust disbursed funds by `delta`, which is negative on reversal.
    pub async fn adjust_disbursed<'e, E>(db: E, id: i64, delta: i64) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            UPDATE disasters
            SET total_disbursed = total_disbursed + ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn funding_totals(pool: &DbPool) -> Result<FundingTotals, sqlx::Error> {
        query_as::<_, FundingTotals>(
            r#"
            SELECT
                COUNT(*) AS disasters,
                COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0) AS active_disasters,
                COALESCE(SUM(total_funding), 0) AS total_funding,
                COALESCE(SUM(total_allocated), 0) AS total_allocated,
                COALESCE(SUM(total_disbursed), 0) AS total_disbursed
            FROM disasters
            "#,
        )
        .fetch_one(pool)
        .await
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a DisasterFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(severity) = filter.severity {
        qb.push(" AND severity = ").push_bind(severity.as_str());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = contains_pattern(search.trim());
        qb.push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR location LIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
}
