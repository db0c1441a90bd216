//! Per-account cost fetching
//!
//! [`CostFetcher`] wraps a [`CostProvider`] and turns every outcome into a
//! [`ProfileCostResult`]: provider errors and timeouts become `Failed`
//! results instead of propagating.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{CostLineItem, DateRange, FailureKind, Profile, ProfileCostResult};
use crate::error::{PulseError, Result};

/// Longest period a single analysis may cover
pub const MAX_DAYS: u32 = 365;

/// Default per-call timeout for billing and identity requests
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Billing backend for one vendor
#[async_trait]
pub trait CostProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Cost per service for `range`, in the account behind `profile`.
    ///
    /// May return one item per (service, sub-period); the fetcher merges them.
    async fn cost_by_service(
        &self,
        profile: &Profile,
        range: &DateRange,
    ) -> Result<Vec<CostLineItem>>;

    /// Account identifier behind `profile`
    async fn account_id(&self, profile: &Profile) -> Result<String>;
}

/// Fetches one profile's costs, never failing outright
#[derive(Clone)]
pub struct CostFetcher {
    provider: Arc<dyn CostProvider>,
    timeout: Duration,
}

impl CostFetcher {
    pub fn new(provider: Arc<dyn CostProvider>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Costs for the last `days` days, ending today (exclusive)
    pub async fn fetch_costs(&self, profile: &Profile, days: u32) -> ProfileCostResult {
        if days == 0 || days > MAX_DAYS {
            return ProfileCostResult::failed(
                profile.clone(),
                DateRange::last_days(0),
                FailureKind::Validation,
                format!("days must be between 1 and {}, got {}", MAX_DAYS, days),
            );
        }
        self.fetch_range(profile, DateRange::last_days(days)).await
    }

    /// Costs for an explicit range
    pub async fn fetch_range(&self, profile: &Profile, range: DateRange) -> ProfileCostResult {
        tracing::info!(
            "Fetching {} costs for profile {} ({} to {})",
            self.provider.name(),
            profile.name,
            range.start_str(),
            range.end_str()
        );

        let raw = match tokio::time::timeout(
            self.timeout,
            self.provider.cost_by_service(profile, &range),
        )
        .await
        {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                tracing::warn!("Cost fetch failed for profile {}: {}", profile.name, e);
                return ProfileCostResult::failed(
                    profile.clone(),
                    range,
                    failure_kind(&e),
                    e.to_string(),
                );
            }
            Err(_) => {
                let err = PulseError::Timeout(self.timeout.as_secs());
                tracing::warn!("Cost fetch timed out for profile {}", profile.name);
                return ProfileCostResult::failed(
                    profile.clone(),
                    range,
                    FailureKind::Timeout,
                    err.to_string(),
                );
            }
        };

        // Identity is best-effort: cost data stands on its own
        let account_id =
            match tokio::time::timeout(self.timeout, self.provider.account_id(profile)).await {
                Ok(Ok(id)) => Some(id),
                Ok(Err(e)) => {
                    tracing::warn!("Identity lookup failed for profile {}: {}", profile.name, e);
                    None
                }
                Err(_) => {
                    tracing::warn!("Identity lookup timed out for profile {}", profile.name);
                    None
                }
            };

        let line_items = merge_line_items(raw);
        tracing::debug!(
            "Profile {} returned {} services",
            profile.name,
            line_items.len()
        );
        ProfileCostResult::success(profile.clone(), account_id, range, line_items)
    }
}

/// Map a provider error onto the failure taxonomy
pub fn failure_kind(err: &PulseError) -> FailureKind {
    match err {
        PulseError::Credential(_) => FailureKind::Credential,
        PulseError::Transport(_) | PulseError::Http(_) | PulseError::Io(_) => {
            FailureKind::Transport
        }
        PulseError::Timeout(_) => FailureKind::Timeout,
        PulseError::InvalidInput(_) => FailureKind::Validation,
        _ => FailureKind::Api,
    }
}

/// Sum items per service (first-seen order), drop non-positive totals and
/// sort descending by amount. The sort is stable, so ties keep first-seen
/// order.
pub(crate) fn merge_line_items(raw: Vec<CostLineItem>) -> Vec<CostLineItem> {
    let mut merged: Vec<CostLineItem> = Vec::new();
    for item in raw {
        match merged
            .iter_mut()
            .find(|m| m.service_name == item.service_name)
        {
            Some(existing) => existing.amount += item.amount,
            None => merged.push(item),
        }
    }
    merged.retain(|item| item.amount > Decimal::ZERO);
    merged.sort_by(|a, b| b.amount.cmp(&a.amount));
    merged
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Scripted behaviour for one profile
    #[derive(Debug, Clone)]
    pub(crate) enum MockAccount {
        Costs {
            account_id: Option<String>,
            items: Vec<(String, Decimal)>,
        },
        Fails(String),
        NoCredentials,
        Hangs,
    }

    #[derive(Default)]
    pub(crate) struct MockProvider {
        accounts: HashMap<String, MockAccount>,
        pub(crate) calls: AtomicUsize,
    }

    impl MockProvider {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_costs(mut self, profile: &str, items: &[(&str, Decimal)]) -> Self {
            self.accounts.insert(
                profile.to_string(),
                MockAccount::Costs {
                    account_id: Some(format!("acct-{}", profile)),
                    items: items.iter().map(|(s, a)| (s.to_string(), *a)).collect(),
                },
            );
            self
        }

        pub(crate) fn with(mut self, profile: &str, account: MockAccount) -> Self {
            self.accounts.insert(profile.to_string(), account);
            self
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CostProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn cost_by_service(
            &self,
            profile: &Profile,
            _range: &DateRange,
        ) -> Result<Vec<CostLineItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.accounts.get(&profile.name) {
                Some(MockAccount::Costs { items, .. }) => Ok(items
                    .iter()
                    .map(|(service, amount)| CostLineItem {
                        service_name: service.clone(),
                        amount: *amount,
                        currency: "USD".to_string(),
                    })
                    .collect()),
                Some(MockAccount::Fails(reason)) => Err(PulseError::Api(reason.clone())),
                Some(MockAccount::NoCredentials) | None => Err(PulseError::Credential(
                    format!("no credentials for profile {}", profile.name),
                )),
                Some(MockAccount::Hangs) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
            }
        }

        async fn account_id(&self, profile: &Profile) -> Result<String> {
            match self.accounts.get(&profile.name) {
                Some(MockAccount::Costs {
                    account_id: Some(id),
                    ..
                }) => Ok(id.clone()),
                _ => Err(PulseError::Api("identity unavailable".to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockAccount, MockProvider};
    use super::*;
    use crate::cost::FetchStatus;
    use rust_decimal_macros::dec;

    fn fetcher(provider: MockProvider) -> CostFetcher {
        CostFetcher::new(Arc::new(provider))
    }

    #[tokio::test]
    async fn test_success_merges_and_sorts_services() {
        let provider = MockProvider::new().with_costs(
            "prod",
            &[
                ("Amazon S3", dec!(4.50)),
                ("Amazon EC2", dec!(10)),
                ("Amazon S3", dec!(6.00)),
                ("Tax", dec!(0)),
            ],
        );
        let result = fetcher(provider)
            .fetch_costs(&Profile::named("prod"), 30)
            .await;

        assert!(result.is_success());
        assert_eq!(result.account_id.as_deref(), Some("acct-prod"));
        assert_eq!(result.total_cost, dec!(20.50));
        let names: Vec<&str> = result
            .line_items
            .iter()
            .map(|i| i.service_name.as_str())
            .collect();
        assert_eq!(names, vec!["Amazon S3", "Amazon EC2"]);
        assert_eq!((result.period.end - result.period.start).num_days(), 30);
    }

    #[tokio::test]
    async fn test_invalid_days_fail_without_calling_provider() {
        let provider = Arc::new(MockProvider::new().with_costs("prod", &[]));
        let fetcher = CostFetcher::new(provider.clone());

        for days in [0, MAX_DAYS + 1] {
            let result = fetcher.fetch_costs(&Profile::named("prod"), days).await;
            assert!(matches!(
                result.status,
                FetchStatus::Failed {
                    kind: FailureKind::Validation,
                    ..
                }
            ));
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_errors_become_failed_results() {
        let provider = MockProvider::new()
            .with("a", MockAccount::Fails("AccessDenied".to_string()))
            .with("b", MockAccount::NoCredentials);
        let fetcher = fetcher(provider);

        let a = fetcher.fetch_costs(&Profile::named("a"), 7).await;
        assert_eq!(a.failure_reason(), Some("API error: AccessDenied"));
        assert_eq!(a.total_cost, Decimal::ZERO);

        let b = fetcher.fetch_costs(&Profile::named("b"), 7).await;
        assert!(matches!(
            b.status,
            FetchStatus::Failed {
                kind: FailureKind::Credential,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let provider = MockProvider::new().with("slow", MockAccount::Hangs);
        let fetcher = fetcher(provider).with_timeout(Duration::from_millis(20));

        let result = fetcher.fetch_costs(&Profile::named("slow"), 7).await;
        assert!(matches!(
            result.status,
            FetchStatus::Failed {
                kind: FailureKind::Timeout,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_identity_failure_keeps_cost_data() {
        let provider = MockProvider::new().with(
            "anon",
            MockAccount::Costs {
                account_id: None,
                items: vec![("AWS Lambda".to_string(), dec!(1.25))],
            },
        );
        let result = fetcher(provider)
            .fetch_costs(&Profile::named("anon"), 7)
            .await;

        assert!(result.is_success());
        assert_eq!(result.account_id, None);
        assert_eq!(result.total_cost, dec!(1.25));
    }
}
