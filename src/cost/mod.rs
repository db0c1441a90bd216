//! Multi-account cost analysis
//!
//! Profile discovery, per-account cost fetching, cross-account aggregation
//! and report rendering.
//!
//! # Feature Flags
//!
//! The AWS Cost Explorer provider requires the `aws` feature. Everything else
//! (scanner, aggregation, formatting) is always available and works against
//! any [`CostProvider`].

pub mod aggregate;
#[cfg(feature = "aws")]
mod aws;
pub mod fetcher;
pub mod profiles;
pub mod report;

pub use aggregate::{aggregate, build_report, DEFAULT_CONCURRENCY, TOP_SERVICES_LIMIT};
#[cfg(feature = "aws")]
pub use aws::{AwsCostProvider, BILLING_REGION};
pub use fetcher::{CostFetcher, CostProvider, DEFAULT_FETCH_TIMEOUT, MAX_DAYS};
pub use profiles::{
    default_config_path, default_credentials_path, discover_profiles, ProfileCache, ProfilePaths,
};
pub use report::{format_report, ReportStyle};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a profile was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSource {
    Config,
    Credentials,
    Both,
}

/// A named set of credentials/config for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub region: Option<String>,
    pub has_credentials: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_profile: Option<String>,
    /// First characters of the access key id, never the full key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_hint: Option<String>,
    pub source: ProfileSource,
}

impl Profile {
    /// A profile known only by name (not found in any config file)
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: None,
            has_credentials: false,
            output: None,
            role_arn: None,
            source_profile: None,
            access_key_hint: None,
            source: ProfileSource::Config,
        }
    }
}

/// A single service's cost total for a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLineItem {
    pub service_name: String,
    pub amount: Decimal,
    pub currency: String,
}

/// Half-open date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Range of `days` days ending on `end` (exclusive)
    pub fn ending_on(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    /// Range of `days` days ending today (UTC, exclusive)
    pub fn last_days(days: u32) -> Self {
        Self::ending_on(Utc::now().date_naive(), days)
    }

    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

/// Why a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Validation,
    Credential,
    Transport,
    Api,
    Timeout,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Validation => write!(f, "validation"),
            FailureKind::Credential => write!(f, "credential"),
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Api => write!(f, "api"),
            FailureKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Outcome of a single profile fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchStatus {
    Success,
    Failed { reason: String, kind: FailureKind },
}

impl FetchStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchStatus::Success)
    }
}

/// Cost data for one profile in one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCostResult {
    pub profile: Profile,
    pub account_id: Option<String>,
    pub period: DateRange,
    pub total_cost: Decimal,
    pub line_items: Vec<CostLineItem>,
    #[serde(flatten)]
    pub status: FetchStatus,
}

impl ProfileCostResult {
    /// Build a successful result; the total is the sum of the line items
    pub fn success(
        profile: Profile,
        account_id: Option<String>,
        period: DateRange,
        line_items: Vec<CostLineItem>,
    ) -> Self {
        let total_cost = line_items.iter().map(|item| item.amount).sum();
        Self {
            profile,
            account_id,
            period,
            total_cost,
            line_items,
            status: FetchStatus::Success,
        }
    }

    /// Build a failed result carrying no cost data
    pub fn failed(
        profile: Profile,
        period: DateRange,
        kind: FailureKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            profile,
            account_id: None,
            period,
            total_cost: Decimal::ZERO,
            line_items: Vec::new(),
            status: FetchStatus::Failed {
                reason: reason.into(),
                kind,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Failure reason, if any
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            FetchStatus::Success => None,
            FetchStatus::Failed { reason, .. } => Some(reason),
        }
    }
}

/// A service's cost merged across all accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCost {
    pub service_name: String,
    pub amount: Decimal,
    /// Share of the all-accounts total, in percent
    pub percentage: Decimal,
}

/// Merged, ranked cost summary across all attempted profiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub generated_at: DateTime<Utc>,
    pub period_days: u32,
    pub currency: String,
    pub profiles_attempted: usize,
    pub profiles_succeeded: usize,
    pub profiles_failed: usize,
    pub accounts_with_costs: usize,
    pub total_cost_all_accounts: Decimal,
    pub top_services: Vec<ServiceCost>,
    pub most_expensive_account: Option<ProfileCostResult>,
    pub results: Vec<ProfileCostResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_is_half_open_days_long() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let range = DateRange::ending_on(end, 30);
        assert_eq!(range.start_str(), "2024-01-31");
        assert_eq!(range.end_str(), "2024-03-01");
        assert_eq!((range.end - range.start).num_days(), 30);
    }

    #[test]
    fn test_failed_result_has_no_cost() {
        let range = DateRange::ending_on(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 7);
        let result =
            ProfileCostResult::failed(Profile::named("dev"), range, FailureKind::Api, "denied");
        assert!(!result.is_success());
        assert_eq!(result.total_cost, Decimal::ZERO);
        assert!(result.line_items.is_empty());
        assert_eq!(result.failure_reason(), Some("denied"));
    }

    #[test]
    fn test_status_serializes_flat() {
        let range = DateRange::ending_on(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 7);
        let result = ProfileCostResult::failed(
            Profile::named("dev"),
            range,
            FailureKind::Timeout,
            "timed out",
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["kind"], "timeout");
        assert_eq!(value["reason"], "timed out");
    }
}
