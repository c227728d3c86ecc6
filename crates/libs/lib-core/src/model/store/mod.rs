//! # Database Store
//!
//! Database connection pool, migrations and repository implementations.

// region: --- Modules
pub mod enums;
pub mod models;

pub mod api_key_repository;
pub mod audit_repository;
pub mod cache_repository;
pub mod disaster_repository;
pub mod job_repository;
pub mod notification_repository;
pub mod proof_repository;
pub mod session_repository;
pub mod settings_repository;
pub mod transaction_repository;
pub mod user_repository;
pub mod vendor_repository;
pub mod voucher_repository;
// endregion: --- Modules

// region: --- Re-exports
pub use api_key_repository::ApiKeyRepository;
pub use audit_repository::AuditRepository;
pub use cache_repository::CacheRepository;
pub use disaster_repository::DisasterRepository;
pub use job_repository::JobRepository;
pub use notification_repository::NotificationRepository;
pub use proof_repository::ProofRepository;
pub use session_repository::SessionRepository;
pub use settings_repository::SettingsRepository;
pub use transaction_repository::TransactionRepository;
pub use user_repository::UserRepository;
pub use vendor_repository::VendorRepository;
pub use voucher_repository::VoucherRepository;
// endregion: --- Re-exports

// region: --- Types and Functions
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::time::Duration;

/// Type alias for SQLite connection pool.
pub type DbPool = SqlitePool;

/// Schema migrations embedded at compile time.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../../migrations");

/// Create a new SQLite connection pool.
pub async fn create_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Apply pending migrations.
pub async fn migrate(pool: &DbPool) -> anyhow::Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Migrated in-memory database on a single connection. Used by tests and tools.
pub async fn create_memory_pool() -> anyhow::Result<DbPool> {
    let options = "sqlite::memory:".parse::<SqliteConnectOptions>()?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Limit/offset window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;
    pub const MAX_PAGE: i64 = 1_000_000;

    /// Build from 1-based page number and page size, clamping both.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT);
        let page = page.unwrap_or(1).clamp(1, Self::MAX_PAGE);
        Self { limit, offset: (page - 1) * limit }
    }

    pub fn number(&self) -> i64 {
        self.offset / self.limit + 1
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// `LIKE` pattern matching `needle` anywhere, for use with `ESCAPE '\'`.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}
// endregion: --- Types and Functions

#[cfg(test)]
pub(crate) mod test_support {
    use super::enums::Role;
    use super::models::{DisasterForCreate, User, UserForCreate};
    use super::{DbPool, DisasterRepository, UserRepository};
    use super::enums::DisasterSeverity;

    pub async fn setup_test_db() -> DbPool {
        super::create_memory_pool()
            .await
            .expect("Failed to create test database")
    }

    pub async fn create_user(pool: &DbPool, wallet: &str, role: Role) -> User {
        UserRepository::create(
            pool,
            &UserForCreate {
                wallet_address: wallet.to_string(),
                name: format!("{wallet} name"),
                email: Some(format!("{}@example.org", wallet.to_lowercase())),
                phone: None,
                password_hash: None,
                role,
            },
        )
        .await
        .expect("User creation should succeed in test")
    }

    pub async fn create_disaster(pool: &DbPool, created_by: i64, funding: i64) -> i64 {
        let disaster = DisasterRepository::create(
            pool,
            &DisasterForCreate {
                name: "Coastal Flood".to_string(),
                description: None,
                location: "Mombasa".to_string(),
                latitude: -4.04,
                longitude: 39.66,
                radius_km: 40.0,
                severity: DisasterSeverity::High,
                funding_goal: 1_000_000,
                created_by,
            },
        )
        .await
        .expect("Disaster creation should succeed in test");

        if funding > 0 {
            DisasterRepository::add_funding(pool, disaster.id, funding)
                .await
                .expect("Funding should succeed in test")
                .expect("Disaster should exist in test");
        }
        disaster.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_clamping() {
        assert_eq!(Page::default(), Page { limit: 20, offset: 0 });
        assert_eq!(Page::new(Some(3), Some(10)), Page { limit: 10, offset: 20 });
        assert_eq!(Page::new(Some(0), Some(1000)), Page { limit: 100, offset: 0 });
        assert_eq!(Page::new(Some(3), Some(10)).number(), 3);
        assert_eq!(
            Page::new(Some(i64::MAX), Some(i64::MAX)),
            Page { limit: 100, offset: (Page::MAX_PAGE - 1) * 100 }
        );
        assert_eq!(Page::new(Some(i64::MIN), None).offset, 0);
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("flood"), "%flood%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[tokio::test]
    async fn test_migrations_seed_settings() {
        let pool = create_memory_pool().await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM system_settings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(count >= 5);
    }
}
