//! # Cache Entry Repository
//!
//! Durable second-level cache. Values are opaque JSON text.

use super::models::CacheEntry;
use super::DbPool;
use chrono::{DateTime, Utc};
use sqlx::query_as;

pub struct CacheRepository;

impl CacheRepository {
    /// Fetch an entry that has not expired at `now`.
    pub async fn get(
        pool: &DbPool,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, sqlx::Error> {
        query_as::<_, CacheEntry>("SELECT * FROM cache_entries WHERE key = ? AND expires_at > ?")
            .bind(key)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    pub async fn set(
        pool: &DbPool,
        key: &str,
        value: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                created_at = excluded.created_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &DbPool, key: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every key matching a glob where `*` matches any run of characters.
    /// Matching is case-sensitive.
    pub async fn delete_matching(pool: &DbPool, pattern: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key GLOB ?")
            .bind(star_only_glob(pattern))
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn purge_expired(pool: &DbPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(pool)
            .await
    }
}

/// Keep `*` as the only wildcard by bracketing SQLite's other `GLOB`
/// metacharacters.
fn star_only_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    for c in pattern.chars() {
        match c {
            '?' => out.push_str("[?]"),
            '[' => out.push_str("[[]"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::test_support::setup_test_db;
    use chrono::Duration;

    #[test]
    fn test_star_only_glob() {
        assert_eq!(star_only_glob("disasters:*"), "disasters:*");
        assert_eq!(star_only_glob("a?b[1]*"), "a[?]b[[]1]*");
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses() {
        let pool = setup_test_db().await;
        let now = Utc::now();
        CacheRepository::set(&pool, "fresh", "1", now + Duration::minutes(5)).await.unwrap();
        CacheRepository::set(&pool, "stale", "2", now - Duration::minutes(5)).await.unwrap();

        assert!(CacheRepository::get(&pool, "fresh", now).await.unwrap().is_some());
        assert!(CacheRepository::get(&pool, "stale", now).await.unwrap().is_none());
        assert_eq!(CacheRepository::purge_expired(&pool, now).await.unwrap(), 1);
        assert_eq!(CacheRepository::count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_matching_does_not_treat_underscore_as_wildcard() {
        let pool = setup_test_db().await;
        let exp = Utc::now() + Duration::minutes(5);
        CacheRepository::set(&pool, "disasters:list:1", "[]", exp).await.unwrap();
        CacheRepository::set(&pool, "disasters:get:1", "{}", exp).await.unwrap();
        CacheRepository::set(&pool, "vendors:get:1", "{}", exp).await.unwrap();
        CacheRepository::set(&pool, "a_b", "x", exp).await.unwrap();
        CacheRepository::set(&pool, "axb", "x", exp).await.unwrap();

        assert_eq!(CacheRepository::delete_matching(&pool, "disasters:*").await.unwrap(), 2);
        assert_eq!(CacheRepository::delete_matching(&pool, "a_b").await.unwrap(), 1);
        assert_eq!(CacheRepository::count(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_matching_is_case_sensitive() {
        let pool = setup_test_db().await;
        let exp = Utc::now() + Duration::minutes(5);
        CacheRepository::set(&pool, "settings:platform.name", "1", exp).await.unwrap();
        CacheRepository::set(&pool, "Settings:platform.name", "2", exp).await.unwrap();
        CacheRepository::set(&pool, "settings:a?", "3", exp).await.unwrap();
        CacheRepository::set(&pool, "settings:ab", "4", exp).await.unwrap();

        assert_eq!(CacheRepository::delete_matching(&pool, "settings:a?").await.unwrap(), 1);
        assert_eq!(CacheRepository::delete_matching(&pool, "settings:*").await.unwrap(), 2);
        assert!(CacheRepository::get(&pool, "Settings:platform.name", Utc::now()).await.unwrap().is_some());
    }
}
