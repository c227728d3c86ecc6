//! # System Settings Repository
//!
//! Key/value store for runtime-tunable settings. Values are arbitrary JSON.

use super::models::SystemSetting;
use super::DbPool;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::query_as;

pub struct SettingsRepository;

impl SettingsRepository {
    pub async fn list(pool: &DbPool, public_only: bool) -> Result<Vec<SystemSetting>, sqlx::Error> {
        query_as::<_, SystemSetting>(
            "SELECT * FROM system_settings WHERE (? = 0 OR is_public = 1) ORDER BY key",
        )
        .bind(public_only)
        .fetch_all(pool)
        .await
    }

    pub async fn get(pool: &DbPool, key: &str) -> Result<Option<SystemSetting>, sqlx::Error> {
        query_as::<_, SystemSetting>("SELECT * FROM system_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Read a setting as `T`, falling back to `default` when it is missing or
    /// does not deserialize.
    pub async fn get_or<T: DeserializeOwned>(
        pool: &DbPool,
        key: &str,
        default: T,
    ) -> Result<T, sqlx::Error> {
        let setting = Self::get(pool, key).await?;
        Ok(setting
            .and_then(|s| serde_json::from_value(s.value.0).ok())
            .unwrap_or(default))
    }

    /// Insert or replace a setting. `description` and `is_public` keep their
    /// stored values when `None`.
    pub async fn upsert(
        pool: &DbPool,
        key: &str,
        value: &Value,
        description: Option<&str>,
        is_public: Option<bool>,
        updated_by: i64,
    ) -> Result<SystemSetting, sqlx::Error> {
        query_as::<_, SystemSetting>(
            r#"
            INSERT INTO system_settings (key, value, description, is_public, updated_by, updated_at)
            VALUES (?, ?, ?, COALESCE(?, 0), ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                description = COALESCE(?, system_settings.description),
                is_public = COALESCE(?, system_settings.is_public),
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(key)
        .bind(Json(value))
        .bind(description)
        .bind(is_public)
        .bind(updated_by)
        .bind(Utc::now())
        .bind(description)
        .bind(is_public)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &DbPool, key: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM system_settings WHERE key = ?")
            .bind(key)
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
    use serde_json::json;

    #[tokio::test]
    async fn test_seeded_values_are_typed() {
        let pool = setup_test_db().await;

        let days: i64 = SettingsRepository::get_or(&pool, "voucher.default_expiry_days", 0).await.unwrap();
        assert_eq!(days, 90);

        let types: Vec<String> = SettingsRepository::get_or(&pool, "proof.allowed_content_types", vec![])
            .await
            .unwrap();
        assert!(types.contains(&"application/pdf".to_string()));

        let missing: i64 = SettingsRepository::get_or(&pool, "does.not.exist", 7).await.unwrap();
        assert_eq!(missing, 7);
    }

    #[tokio::test]
    async fn test_public_filter() {
        let pool = setup_test_db().await;
        let all = SettingsRepository::list(&pool, false).await.unwrap();
        let public = SettingsRepository::list(&pool, true).await.unwrap();

        assert!(public.len() < all.len());
        assert!(public.iter().all(|s| s.is_public));
    }

    #[tokio::test]
    async fn test_upsert_keeps_metadata() {
        let pool = setup_test_db().await;
        let admin = create_user(&pool, "Admin", Role::Admin).await;

        let created = SettingsRepository::upsert(&pool, "feature.x", &json!(true), Some("Flag"), Some(true), admin.id)
            .await
            .unwrap();
        assert!(created.is_public);

        let updated = SettingsRepository::upsert(&pool, "feature.x", &json!(false), None, None, admin.id)
            .await
            .unwrap();
        assert_eq!(updated.value.0, json!(false));
        assert_eq!(updated.description.as_deref(), Some("Flag"));
        assert!(updated.is_public);

        assert_eq!(SettingsRepository::delete(&pool, "feature.x").await.unwrap(), 1);
        assert!(SettingsRepository::get(&pool, "feature.x").await.unwrap().is_none());
    }
}
