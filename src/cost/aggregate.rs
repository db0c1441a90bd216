//! Cross-account cost aggregation
//!
//! Fetches every profile (bounded concurrency, results kept in profile
//! order), then merges services globally and ranks them.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use rust_decimal::prelude::*;

use super::fetcher::CostFetcher;
use super::{AggregateReport, Profile, ProfileCostResult, ServiceCost};

/// Number of services kept in the cross-account ranking
pub const TOP_SERVICES_LIMIT: usize = 5;

/// Default number of profiles fetched at once
pub const DEFAULT_CONCURRENCY: usize = 4;

const DEFAULT_CURRENCY: &str = "USD";

/// Fetch all `profiles` and build the report once every fetch has finished.
///
/// Never fails: per-profile failures are embedded in the report.
pub async fn aggregate(
    fetcher: &CostFetcher,
    profiles: &[Profile],
    days: u32,
    concurrency: usize,
) -> AggregateReport {
    tracing::info!(
        "Analyzing {} profiles over {} days (concurrency {})",
        profiles.len(),
        days,
        concurrency
    );

    let results: Vec<ProfileCostResult> = stream::iter(
        profiles
            .iter()
            .map(|profile| fetcher.fetch_costs(profile, days))
            .collect::<Vec<_>>(),
    )
    .buffered(concurrency.max(1))
    .collect()
    .await;

    build_report(days, results)
}

/// Build the report from already-fetched results (in profile order).
pub fn build_report(period_days: u32, results: Vec<ProfileCostResult>) -> AggregateReport {
    let succeeded: Vec<&ProfileCostResult> = results.iter().filter(|r| r.is_success()).collect();

    let total: Decimal = succeeded.iter().map(|r| r.total_cost).sum();
    let accounts_with_costs = succeeded
        .iter()
        .filter(|r| r.total_cost > Decimal::ZERO)
        .count();

    let currency = succeeded
        .iter()
        .flat_map(|r| r.line_items.first())
        .map(|item| item.currency.clone())
        .next()
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    // Global merge in first-seen order; the stable sort keeps that order on ties
    let mut services: Vec<(String, Decimal)> = Vec::new();
    for result in &succeeded {
        for item in &result.line_items {
            match services.iter_mut().find(|(name, _)| *name == item.service_name) {
                Some((_, amount)) => *amount += item.amount,
                None => services.push((item.service_name.clone(), item.amount)),
            }
        }
    }
    let top_services = top_n(services, TOP_SERVICES_LIMIT, |(_, amount)| *amount)
        .into_iter()
        .map(|(service_name, amount)| ServiceCost {
            percentage: percentage_of(amount, total),
            service_name,
            amount,
        })
        .collect();

    let most_expensive_account = succeeded
        .iter()
        .copied()
        .fold(None::<&ProfileCostResult>, |best, r| match best {
            Some(b) if b.total_cost >= r.total_cost => Some(b),
            _ => Some(r),
        })
        .cloned();

    let profiles_succeeded = succeeded.len();
    let profiles_attempted = results.len();

    AggregateReport {
        generated_at: Utc::now(),
        period_days,
        currency,
        profiles_attempted,
        profiles_succeeded,
        profiles_failed: profiles_attempted - profiles_succeeded,
        accounts_with_costs,
        total_cost_all_accounts: total,
        top_services,
        most_expensive_account,
        results,
    }
}

/// The `limit` largest items by `key`, descending. Ties keep input order.
pub(crate) fn top_n<T, K, F>(mut items: Vec<T>, limit: usize, key: F) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items.truncate(limit);
    items
}

/// `amount / total` in percent, truncated to two decimals; zero when the
/// total is zero. Truncation keeps the sum of shares at or below 100.
pub(crate) fn percentage_of(amount: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    (amount * Decimal::ONE_HUNDRED / total).round_dp_with_strategy(2, RoundingStrategy::ToZero)
}
