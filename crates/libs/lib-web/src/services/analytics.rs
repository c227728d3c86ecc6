//! # Analytics Service
//!
//! Read-only aggregates. Handlers cache the results under `analytics:*` and
//! `disasters:*`; every write that moves money invalidates both namespaces.

use chrono::{Duration, Utc};
use lib_core::dto::{
    DisasterBreakdown, DisasterStats, FundingOverview, Overview, Timeseries, VoucherCounts,
};
use lib_core::model::store::enums::Role;
use lib_core::model::store::models::{Disaster, Vendor};
use lib_core::model::store::{
    DbPool, DisasterRepository, TransactionRepository, UserRepository, VendorRepository,
    VoucherRepository,
};
use lib_core::Result;

pub const DEFAULT_DAYS: i64 = 30;
pub const MAX_DAYS: i64 = 365;
pub const DEFAULT_TOP_VENDORS: i64 = 10;
pub const MAX_TOP_VENDORS: i64 = 100;

pub struct AnalyticsService {
    db: DbPool,
}

impl AnalyticsService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn overview(&self) -> Result<Overview> {
        let totals = DisasterRepository::funding_totals(&self.db).await?;
        let vouchers = VoucherCounts::from_rows(&VoucherRepository::count_by_status(&self.db, None).await?);
        let (vendors, approved_vendors) = VendorRepository::counts(&self.db, None).await?;
        let (transactions, transaction_volume) = TransactionRepository::totals(&self.db, None).await?;
        let beneficiaries = UserRepository::count_by_role(&self.db, Role::Beneficiary).await?;

        Ok(Overview {
            disasters: totals.disasters,
            active_disasters: totals.active_disasters,
            funding: FundingOverview {
                raised: totals.total_funding,
                allocated: totals.total_allocated,
                disbursed: totals.total_disbursed,
            },
            vouchers,
            vendors,
            approved_vendors,
            transactions,
            transaction_volume,
            beneficiaries,
        })
    }

    pub async fn disaster_stats(&self, disaster: &Disaster) -> Result<DisasterStats> {
        let vouchers = VoucherCounts::from_rows(
            &VoucherRepository::count_by_status(&self.db, Some(disaster.id)).await?,
        );
        let (vendors, approved_vendors) = VendorRepository::counts(&self.db, Some(disaster.id)).await?;
        let (transactions, transaction_volume) =
            TransactionRepository::totals(&self.db, Some(disaster.id)).await?;

        Ok(DisasterStats {
            disaster_id: disaster.id,
            funding_goal: disaster.funding_goal,
            total_funding: disaster.total_funding,
            total_allocated: disaster.total_allocated,
            total_disbursed: disaster.total_disbursed,
            unallocated: disaster.unallocated_funds(),
            utilization_percent: utilization_percent(disaster.total_disbursed, disaster.total_funding),
            vouchers,
            vendors,
            approved_vendors,
            transactions,
            transaction_volume,
        })
    }

    pub async fn disaster_breakdown(&self, disaster_id: i64, days: i64, limit: i64) -> Result<DisasterBreakdown> {
        let since = Utc::now() - Duration::days(days);
        Ok(DisasterBreakdown {
            disaster_id,
            by_category: TransactionRepository::volume_by_category(&self.db, Some(disaster_id)).await?,
            top_vendors: VendorRepository::top_by_redeemed(&self.db, Some(disaster_id), limit).await?,
            daily: TransactionRepository::daily_volume(&self.db, since, Some(disaster_id)).await?,
        })
    }

    pub async fn top_vendors(&self, limit: i64, disaster_id: Option<i64>) -> Result<Vec<Vendor>> {
        Ok(VendorRepository::top_by_redeemed(&self.db, disaster_id, limit).await?)
    }

    pub async fn timeseries(&self, days: i64, disaster_id: Option<i64>) -> Result<Timeseries> {
        let since = Utc::now() - Duration::days(days);
        let points = TransactionRepository::daily_volume(&self.db, since, disaster_id).await?;
        Ok(Timeseries { days, since, points })
    }
}

/// Share of received funds already disbursed, rounded to two decimals.
pub fn utilization_percent(disbursed: i64, funding: i64) -> f64 {
    if funding <= 0 {
        return 0.0;
    }
    ((disbursed as f64 / funding as f64) * 10_000.0).round() / 100.0
}

/// Clamp `?days=` into `1..=365`, defaulting to 30.
pub fn clamp_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
}

/// Clamp `?limit=` into `1..=100`, defaulting to 10.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_TOP_VENDORS).clamp(1, MAX_TOP_VENDORS)
}
