//! Data-warehouse cost analysis
//!
//! Estimates compute (credits) and storage spend for one warehouse account
//! and ranks its virtual warehouses by credit use. Usage numbers come from a
//! [`WarehouseProvider`]; prices are list-price estimates from [`Pricing`].
//!
//! # Feature Flags
//!
//! The Snowflake SQL API provider requires the `web` feature.

mod report;
#[cfg(feature = "web")]
pub mod snowflake;

pub use report::format_warehouse_report;
#[cfg(feature = "web")]
pub use snowflake::{parse_account, SessionInfo, SnowflakeClient, SnowflakeConfig, TokenType};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cost::aggregate::{percentage_of, top_n};
use crate::cost::{DateRange, DEFAULT_FETCH_TIMEOUT, MAX_DAYS};
use crate::error::{PulseError, Result};

/// Warehouses kept in the ranking unless the caller asks otherwise
pub const DEFAULT_WAREHOUSE_LIMIT: usize = 5;

/// Upper bound on the requested ranking size
pub const MAX_WAREHOUSE_LIMIT: usize = 100;

const NOTE: &str = "Costs are estimated from list prices. Actual costs may vary based on your contract and region.";

/// List prices used for the estimates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pricing {
    /// USD per credit
    pub credit_price: Decimal,
    /// USD per GB per 30 days
    pub storage_price_per_gb_month: Decimal,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            credit_price: Decimal::new(200, 2),
            storage_price_per_gb_month: Decimal::new(23, 3),
        }
    }
}

impl Pricing {
    pub fn compute_cost(&self, credits: Decimal) -> Decimal {
        (credits * self.credit_price).round_dp(2)
    }

    /// Storage held for `days` days, prorated from the monthly rate
    pub fn storage_cost(&self, gb: Decimal, days: u32) -> Decimal {
        (gb * self.storage_price_per_gb_month * Decimal::from(days) / Decimal::from(30)).round_dp(2)
    }
}

/// Account-wide credit use for a period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputeUsage {
    pub credits_used: Decimal,
    pub warehouses_used: u64,
    /// Rows in the metering history (one per warehouse per hour)
    pub metering_records: u64,
}

/// Average bytes held over a period, in GB
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub avg_storage_gb: Decimal,
    pub avg_stage_gb: Decimal,
    pub avg_failsafe_gb: Decimal,
}

impl StorageUsage {
    pub fn total_gb(&self) -> Decimal {
        self.avg_storage_gb + self.avg_stage_gb + self.avg_failsafe_gb
    }
}

/// Credit use of one virtual warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseUsage {
    pub warehouse_name: String,
    pub credits_used: Decimal,
    pub metering_records: u64,
    pub avg_credits_per_record: Decimal,
    pub max_credits_per_record: Decimal,
    pub first_usage: Option<DateTime<Utc>>,
    pub last_usage: Option<DateTime<Utc>>,
}

/// Source of warehouse usage figures
#[async_trait]
pub trait WarehouseProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Account the figures belong to
    fn account(&self) -> &str;

    async fn compute_usage(&self, range: &DateRange) -> Result<ComputeUsage>;

    async fn storage_usage(&self, range: &DateRange) -> Result<StorageUsage>;

    /// Usage per warehouse, in any order
    async fn warehouse_usage(&self, range: &DateRange) -> Result<Vec<WarehouseUsage>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeCosts {
    pub total_credits_used: Decimal,
    pub estimated_compute_cost: Decimal,
    pub warehouses_used: u64,
    pub metering_records: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageCosts {
    pub avg_storage_gb: Decimal,
    pub avg_stage_gb: Decimal,
    pub avg_failsafe_gb: Decimal,
    pub estimated_storage_cost: Decimal,
}

/// Compute plus storage estimate for a period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallCosts {
    pub period_days: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub compute_metrics: ComputeCosts,
    pub storage_metrics: StorageCosts,
    pub total_estimated_cost: Decimal,
    pub currency: String,
    pub note: String,
}

/// One row of the warehouse ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseCost {
    pub warehouse_name: String,
    pub total_credits: Decimal,
    pub estimated_cost: Decimal,
    pub metering_records: u64,
    pub avg_credits_per_record: Decimal,
    pub max_credits_per_record: Decimal,
    pub first_usage: Option<DateTime<Utc>>,
    pub last_usage: Option<DateTime<Utc>>,
    /// Share of the credits of all warehouses, not just the ranked ones
    pub percentage_of_total: Decimal,
}

/// Warehouses ranked by credits, highest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseRanking {
    pub period_days: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub warehouses_analyzed: usize,
    pub total_credits_all_warehouses: Decimal,
    pub estimated_total_cost: Decimal,
    pub top_warehouses: Vec<WarehouseCost>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTotals {
    pub total_estimated_cost: Decimal,
    pub compute_cost: Decimal,
    pub storage_cost: Decimal,
    pub most_expensive_warehouse: Option<String>,
    pub total_warehouses_used: u64,
}

/// Overall costs and the default-size ranking for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseSummary {
    pub analysis_date: DateTime<Utc>,
    pub account: String,
    pub period_days: u32,
    pub overall_costs: OverallCosts,
    pub top_warehouses: WarehouseRanking,
    pub summary: SummaryTotals,
}

fn validate_days(days: u32) -> Result<DateRange> {
    if days == 0 || days > MAX_DAYS {
        return Err(PulseError::InvalidInput(format!(
            "days must be between 1 and {}, got {}",
            MAX_DAYS, days
        )));
    }
    Ok(DateRange::last_days(days))
}

/// Rank `usage` by credits and price the top `limit` entries
pub fn rank_warehouses(
    usage: Vec<WarehouseUsage>,
    limit: usize,
    pricing: &Pricing,
    period_days: u32,
    range: DateRange,
) -> WarehouseRanking {
    let total: Decimal = usage.iter().map(|w| w.credits_used).sum();
    let warehouses_analyzed = usage.len();

    let top_warehouses = top_n(usage, limit, |w| w.credits_used)
        .into_iter()
        .map(|w| WarehouseCost {
            total_credits: w.credits_used.round_dp(2),
            estimated_cost: pricing.compute_cost(w.credits_used),
            metering_records: w.metering_records,
            avg_credits_per_record: w.avg_credits_per_record.round_dp(4),
            max_credits_per_record: w.max_credits_per_record.round_dp(4),
            first_usage: w.first_usage,
            last_usage: w.last_usage,
            percentage_of_total: percentage_of(w.credits_used, total),
            warehouse_name: w.warehouse_name,
        })
        .collect();

    WarehouseRanking {
        period_days,
        start_date: range.start,
        end_date: range.end,
        warehouses_analyzed,
        total_credits_all_warehouses: total.round_dp(2),
        estimated_total_cost: pricing.compute_cost(total),
        top_warehouses,
    }
}

/// Price compute and storage usage for a period
pub fn price_usage(
    compute: ComputeUsage,
    storage: StorageUsage,
    pricing: &Pricing,
    period_days: u32,
    range: DateRange,
) -> OverallCosts {
    let compute_cost = pricing.compute_cost(compute.credits_used);
    let storage_cost = pricing.storage_cost(storage.total_gb(), period_days);

    OverallCosts {
        period_days,
        start_date: range.start,
        end_date: range.end,
        compute_metrics: ComputeCosts {
            total_credits_used: compute.credits_used.round_dp(2),
            estimated_compute_cost: compute_cost,
            warehouses_used: compute.warehouses_used,
            metering_records: compute.metering_records,
        },
        storage_metrics: StorageCosts {
            avg_storage_gb: storage.avg_storage_gb.round_dp(2),
            avg_stage_gb: storage.avg_stage_gb.round_dp(2),
            avg_failsafe_gb: storage.avg_failsafe_gb.round_dp(2),
            estimated_storage_cost: storage_cost,
        },
        total_estimated_cost: compute_cost + storage_cost,
        currency: "USD".to_string(),
        note: NOTE.to_string(),
    }
}

/// Runs warehouse queries with a deadline and prices the answers
pub struct WarehouseAnalyzer {
    provider: Arc<dyn WarehouseProvider>,
    pricing: Pricing,
    timeout: Duration,
}

impl WarehouseAnalyzer {
    pub fn new(provider: Arc<dyn WarehouseProvider>) -> Self {
        Self {
            provider,
            pricing: Pricing::default(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn account(&self) -> &str {
        self.provider.account()
    }

    pub fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    async fn timed<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| PulseError::Timeout(self.timeout.as_secs()))?
    }

    /// Estimated compute and storage cost over the last `days` days
    pub async fn overall_costs(&self, days: u32) -> Result<OverallCosts> {
        let range = validate_days(days)?;
        tracing::info!(
            "Fetching {} overall usage for {} ({} to {})",
            self.provider.name(),
            self.provider.account(),
            range.start_str(),
            range.end_str()
        );
        let (compute, storage) = self
            .timed(async {
                tokio::try_join!(
                    self.provider.compute_usage(&range),
                    self.provider.storage_usage(&range)
                )
            })
            .await?;
        Ok(price_usage(compute, storage, &self.pricing, days, range))
    }

    /// The `limit` warehouses with the most credits over the last `days` days
    pub async fn top_warehouses(&self, days: u32, limit: usize) -> Result<WarehouseRanking> {
        if limit == 0 || limit > MAX_WAREHOUSE_LIMIT {
            return Err(PulseError::InvalidInput(format!(
                "limit must be between 1 and {}, got {}",
                MAX_WAREHOUSE_LIMIT, limit
            )));
        }
        let range = validate_days(days)?;
        tracing::info!(
            "Ranking {} warehouses for {} over {} days",
            self.provider.name(),
            self.provider.account(),
            days
        );
        let usage = self.timed(self.provider.warehouse_usage(&range)).await?;
        Ok(rank_warehouses(usage, limit, &self.pricing, days, range))
    }

    /// Overall costs plus the top warehouses, fetched concurrently
    pub async fn summary(&self, days: u32) -> Result<WarehouseSummary> {
        let (overall, ranking) = tokio::try_join!(
            self.overall_costs(days),
            self.top_warehouses(days, DEFAULT_WAREHOUSE_LIMIT)
        )?;

        let summary = SummaryTotals {
            total_estimated_cost: overall.total_estimated_cost,
            compute_cost: overall.compute_metrics.estimated_compute_cost,
            storage_cost: overall.storage_metrics.estimated_storage_cost,
            most_expensive_warehouse: ranking
                .top_warehouses
                .first()
                .map(|w| w.warehouse_name.clone()),
            total_warehouses_used: overall.compute_metrics.warehouses_used,
        };

        Ok(WarehouseSummary {
            analysis_date: Utc::now(),
            account: self.provider.account().to_string(),
            period_days: days,
            overall_costs: overall,
            top_warehouses: ranking,
            summary,
        })
    }
}
