//! # API Key Repository

use super::models::ApiKey;
use super::DbPool;
use chrono::{DateTime, Utc};
use sqlx::query_as;

pub struct ApiKeyRepository;

impl ApiKeyRepository {
    pub async fn create(
        pool: &DbPool,
        user_id: i64,
        name: &str,
        key_prefix: &str,
        key_hash: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ApiKey, sqlx::Error> {
        query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (user_id, name, key_prefix, key_hash, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(key_prefix)
        .bind(key_hash)
        .bind(expires_at)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_hash(pool: &DbPool, key_hash: &str) -> Result<Option<ApiKey>, sqlx::Error> {
        query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE key_hash = ?")
            .bind(key_hash)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_user(pool: &DbPool, user_id: i64) -> Result<Vec<ApiKey>, sqlx::Error> {
        query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE user_id = ? ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn touch(pool: &DbPool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Revoke a key owned by `user_id`. Returns rows affected.
    pub async fn revoke(pool: &DbPool, id: i64, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE api_keys SET revoked_at = ? WHERE id = ? AND user_id = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::enums::Role;
    use crate::model::store::test_support::{create_user, setup_test_db};
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_find_revoke() {
        let pool = setup_test_db().await;
        let user = create_user(&pool, "WalletA", Role::Ngo).await;

        let key = ApiKeyRepository::create(&pool, user.id, "ci", "rlk_abcdefgh", "hash-1", None)
            .await
            .unwrap();
        let found = ApiKeyRepository::find_by_hash(&pool, "hash-1").await.unwrap().unwrap();
        assert_eq!(found.id, key.id);
        assert!(found.is_usable(Utc::now()));

        assert_eq!(ApiKeyRepository::revoke(&pool, key.id, user.id).await.unwrap(), 1);
        let found = ApiKeyRepository::find_by_hash(&pool, "hash-1").await.unwrap().unwrap();
        assert!(!found.is_usable(Utc::now()));
    }

    #[tokio::test]
    async fn test_expired_key_not_usable() {
        let pool = setup_test_db().await;
        let user = create_user(&pool, "WalletA", Role::Ngo).await;
        let key = ApiKeyRepository::create(
            &pool,
            user.id,
            "old",
            "rlk_x",
            "hash-2",
            Some(Utc::now() - Duration::days(1)),
        )
        .await
        .unwrap();

        assert!(!key.is_usable(Utc::now()));
    }
}
