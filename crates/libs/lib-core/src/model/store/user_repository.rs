//! # User Repository
//!
//! Provides database access layer for user-related operations.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use lib_core::model::store::{create_memory_pool, UserRepository};
//! # async fn example() -> anyhow::Result<()> {
//! let pool = create_memory_pool().await?;
//! let user = UserRepository::find_by_wallet(&pool, "9aE476sH92Vz7DMPyq5WLPkrKWivxeuTKEFKd2sZZcde").await?;
//! # Ok(())
//! # }
//! ```

use super::enums::Role;
use super::models::{User, UserForCreate, UserForUpdate};
use super::{contains_pattern, DbPool, Page};
use chrono::Utc;
use sqlx::{query_as, QueryBuilder, Sqlite};
use uuid::Uuid;

/// Filters for listing users.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_verified: Option<bool>,
    pub is_active: Option<bool>,
    /// Substring match on name, email or wallet address
    pub search: Option<String>,
}

/// User repository for database operations.
pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by their email address.
    pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        query_as::<_, User>("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by their wallet address.
    pub async fn find_by_wallet(pool: &DbPool, wallet_address: &str) -> Result<Option<User>, sqlx::Error> {
        query_as::<_, User>("SELECT * FROM users WHERE wallet_address = ?")
            .bind(wallet_address)
            .fetch_optional(pool)
            .await
    }

    /// Create a new user with a fresh login nonce.
    ///
    /// # Errors
    ///
    /// Returns a unique-violation database error if the wallet or email is taken.
    pub async fn create(pool: &DbPool, user: &UserForCreate) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        query_as::<_, User>(
            r#"
            INSERT INTO users (wallet_address, name, email, phone, password_hash, role, nonce, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&user.wallet_address)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(Uuid::new_v4().simple().to_string())
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// Update profile fields. `None` leaves a field unchanged.
    pub async fn update_profile(
        pool: &DbPool,
        id: i64,
        data: &UserForUpdate,
    ) -> Result<User, sqlx::Error> {
        query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE(?, name),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn set_password(pool: &DbPool, id: i64, password_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_role(pool: &DbPool, id: i64, role: Role) -> Result<User, sqlx::Error> {
        query_as::<_, User>("UPDATE users SET role = ?, updated_at = ? WHERE id = ? RETURNING *")
            .bind(role.as_str())
            .bind(Utc::now())
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Mark a user as verified by `verified_by`.
    pub async fn set_verified(pool: &DbPool, id: i64, verified_by: i64) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        query_as::<_, User>(
            r#"
            UPDATE users
            SET is_verified = 1, verified_at = ?, verified_by = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(verified_by)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn set_active(pool: &DbPool, id: i64, is_active: bool) -> Result<User, sqlx::Error> {
        query_as::<_, User>("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ? RETURNING *")
            .bind(is_active)
            .bind(Utc::now())
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Update the last login timestamp for a user.
    ///
    /// This method does not verify that the user exists.
    pub async fn update_last_login(pool: &DbPool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Replace the wallet login nonce, returning the new one.
    pub async fn rotate_nonce(pool: &DbPool, id: i64) -> Result<String, sqlx::Error> {
        let nonce = Uuid::new_v4().simple().to_string();
        sqlx::query("UPDATE users SET nonce = ? WHERE id = ?")
            .bind(&nonce)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(nonce)
    }

    /// List users matching `filter`, newest first, with the total match count.
    pub async fn list(
        pool: &DbPool,
        filter: &UserFilter,
        page: Page,
    ) -> Result<(Vec<User>, i64), sqlx::Error> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM users");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let users = qb.build_query_as::<User>().fetch_all(pool).await?;

        Ok((users, total))
    }

    /// Active users holding `role`.
    pub async fn list_active_by_role(pool: &DbPool, role: Role) -> Result<Vec<User>, sqlx::Error> {
        query_as::<_, User>("SELECT * FROM users WHERE role = ? AND is_active = 1 ORDER BY id")
            .bind(role.as_str())
            .fetch_all(pool)
            .await
    }

    pub async fn count_by_role(pool: &DbPool, role: Role) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.as_str())
            .fetch_one(pool)
            .await
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a UserFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(verified) = filter.is_verified {
        qb.push(" AND is_verified = ").push_bind(verified);
    }
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = contains_pattern(search.trim());
        qb.push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR email LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR wallet_address LIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
}
