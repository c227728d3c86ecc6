//! # Time Utilities
//!
//! Expiry arithmetic shared by API keys and vouchers.

use chrono::{DateTime, Duration, Utc};

/// Current UTC time shifted by a whole number of days.
pub fn days_from_now(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}
