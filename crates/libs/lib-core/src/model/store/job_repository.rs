//! # Job Queue Repository
//!
//! Durable background work. Jobs are claimed by flipping `pending` rows to
//! `processing` in a single statement; failures are retried with exponential
//! backoff until `max_attempts` is reached.

use super::enums::JobStatus;
use super::models::Job;
use super::DbPool;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::query_as;

/// Base delay before the first retry.
pub const RETRY_BASE_SECONDS: i64 = 30;

pub struct JobRepository;

impl JobRepository {
    pub async fn enqueue(
        pool: &DbPool,
        job_type: &str,
        payload: &Value,
        priority: i64,
        run_at: DateTime<Utc>,
    ) -> Result<Job, sqlx::Error> {
        let now = Utc::now();
        query_as::<_, Job>(
            r#"
            INSERT INTO job_queue (job_type, payload, priority, run_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(job_type)
        .bind(Json(payload))
        .bind(priority)
        .bind(run_at)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Job>, sqlx::Error> {
        query_as::<_, Job>("SELECT * FROM job_queue WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Claim the highest-priority due job, counting the attempt.
    pub async fn claim_next(pool: &DbPool, now: DateTime<Utc>) -> Result<Option<Job>, sqlx::Error> {
        query_as::<_, Job>(
            r#"
            UPDATE job_queue
            SET status = 'processing', attempts = attempts + 1, updated_at = ?
            WHERE id = (
                SELECT id FROM job_queue
                WHERE status = 'pending' AND run_at <= ?
                ORDER BY priority DESC, run_at ASC, id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(now)
        .fetch_optional(pool)
        .await
    }

    pub async fn complete(pool: &DbPool, id: i64) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE job_queue SET status = 'completed', completed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt. The job returns to `pending` with a backoff of
    /// `30s * 2^attempts`, or becomes `failed` once attempts are exhausted.
    pub async fn fail(pool: &DbPool, job: &Job, error: &str) -> Result<Job, sqlx::Error> {
        let now = Utc::now();
        let (status, run_at) = if job.attempts >= job.max_attempts {
            (JobStatus::Failed, job.run_at)
        } else {
            (JobStatus::Pending, now + retry_delay(job.attempts))
        };

        query_as::<_, Job>(
            r#"
            UPDATE job_queue
            SET status = ?, last_error = ?, run_at = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(status.as_str())
        .bind(error)
        .bind(run_at)
        .bind(now)
        .bind(job.id)
        .fetch_one(pool)
        .await
    }

    /// Job counts grouped by status.
    pub async fn stats(pool: &DbPool) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM job_queue GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await
    }

    /// Delete completed jobs finished before `before`.
    pub async fn purge_completed(pool: &DbPool, before: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM job_queue WHERE status = 'completed' AND completed_at < ?")
            .bind(before)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Delay before the next attempt after `attempts` tries.
pub fn retry_delay(attempts: i64) -> Duration {
    let exp = attempts.clamp(0, 16) as u32;
    Duration::seconds(RETRY_BASE_SECONDS * 2_i64.pow(exp))
}
