//! # Notification Repository
//!
//! In-app notifications. Every mutating query is scoped by `user_id` so a user
//! can only touch their own rows.

use super::models::Notification;
use super::{DbPool, Page};
use chrono::Utc;
use sqlx::query_as;

pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn create(
        pool: &DbPool,
        user_id: i64,
        title: &str,
        message: &str,
        kind: &str,
    ) -> Result<Notification, sqlx::Error> {
        query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, title, message, kind, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(kind)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_user(
        pool: &DbPool,
        user_id: i64,
        unread_only: bool,
        page: Page,
    ) -> Result<(Vec<Notification>, i64), sqlx::Error> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND (? = 0 OR is_read = 0)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(pool)
        .await?;

        let items = query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = ? AND (? = 0 OR is_read = 0)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?;

        Ok((items, total))
    }

    pub async fn unread_count(pool: &DbPool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn mark_read(
        pool: &DbPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Notification>, sqlx::Error> {
        query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET is_read = 1, read_at = COALESCE(read_at, ?)
            WHERE id = ? AND user_id = ?
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn mark_all_read(pool: &DbPool, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1, read_at = ? WHERE user_id = ? AND is_read = 0",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &DbPool, id: i64, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
