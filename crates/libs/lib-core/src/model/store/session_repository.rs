//! # Session Repository
//!
//! Server-side record of issued login tokens. A token is honoured only while
//! its session row is unrevoked and unexpired.

use super::models::Session;
use super::DbPool;
use chrono::{DateTime, Utc};
use sqlx::query_as;
use uuid::Uuid;

pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(
        pool: &DbPool,
        user_id: i64,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, sqlx::Error> {
        let now = Utc::now();
        query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, user_agent, ip_address, expires_at, last_seen_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(user_agent)
        .bind(ip_address)
        .bind(expires_at)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &DbPool, id: &str) -> Result<Option<Session>, sqlx::Error> {
        query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn touch(pool: &DbPool, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sessions SET last_seen_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Active sessions of a user, most recent first.
    pub async fn list_active_for_user(pool: &DbPool, user_id: i64) -> Result<Vec<Session>, sqlx::Error> {
        query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = ? AND revoked_at IS NULL AND expires_at > ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_all(pool)
        .await
    }

    /// Revoke one session owned by `user_id`. Returns rows affected.
    pub async fn revoke(pool: &DbPool, id: &str, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = ? WHERE id = ? AND user_id = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Revoke every session of a user, optionally keeping one.
    pub async fn revoke_all_for_user(
        pool: &DbPool,
        user_id: i64,
        keep: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET revoked_at = ?
            WHERE user_id = ? AND revoked_at IS NULL AND (? IS NULL OR id != ?)
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(keep)
        .bind(keep)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions that expired or were revoked before `before`.
    pub async fn purge(pool: &DbPool, before: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ? OR revoked_at < ?")
            .bind(before)
            .bind(before)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
