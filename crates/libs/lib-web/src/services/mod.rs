//! # Services Layer
//!
//! Business logic that spans several repositories or talks to integrations.
//! Handlers stay thin and delegate here:
//!
//! ```text
//! Handlers (HTTP) → Services (Business Logic) → Repositories / Integrations
//! ```
//!
//! ## Module Organization
//!
//! - [`cache`] - two-layer cache-aside reads with pattern invalidation
//! - [`audit`] - log-and-continue audit trail writes
//! - [`notification`] - in-app, email and SMS delivery plus the retry queue
//! - [`session`] - session rows and the JWTs that point at them
//! - [`voucher`] - issuing and revoking vouchers against disaster funds
//! - [`redemption`] - redeeming vouchers and reversing failed redemptions
//! - [`analytics`] - aggregates for dashboards and disaster stats
//! - [`geo`] - coordinate checks and great-circle distance
//!
//! ## Error Handling
//!
//! Services return `lib_core::Result<T>`. Side effects that must not fail the
//! request (audit rows, notifications, cache writes) log and continue.

pub mod analytics;
pub mod audit;
pub mod cache;
pub mod geo;
pub mod notification;
pub mod redemption;
pub mod session;
pub mod voucher;

pub use analytics::AnalyticsService;
pub use audit::AuditService;
pub use cache::{CacheService, CacheStats};
pub use notification::NotificationService;
pub use redemption::RedemptionService;
pub use session::SessionService;
pub use voucher::VoucherService;

use lib_core::{AppError, Result};

/// Largest single donation, voucher or redemption, in minor units.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Reject amounts outside `1..=MAX_AMOUNT`.
pub fn validate_amount(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(AppError::InvalidInput("Amount must be greater than zero".to_string()));
    }
    if amount > MAX_AMOUNT {
        return Err(AppError::InvalidInput(format!(
            "Amount must not exceed {}",
            format_amount(MAX_AMOUNT)
        )));
    }
    Ok(())
}

/// Render integer minor units as a decimal amount, e.g. `12345` -> `"123.45"`.
pub fn format_amount(minor_units: i64) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(12_345), "123.45");
        assert_eq!(format_amount(7), "0.07");
        assert_eq!(format_amount(-250), "-2.50");
    }

    #[test]
    fn test_validate_amount_bounds() {
        assert!(validate_amount(1).is_ok());
        assert!(validate_amount(MAX_AMOUNT).is_ok());
        assert!(validate_amount(0).is_err());
        assert!(validate_amount(-5).is_err());
        assert!(validate_amount(MAX_AMOUNT + 1).is_err());
        assert!(validate_amount(i64::MAX).is_err());
    }
}
