//! Property-based tests for pulse
//!
//! These tests verify invariants that must hold for all inputs:
//! - Report counters and totals are consistent
//! - Service rankings stay bounded and sorted
//! - Parsers never panic
//!
//! Run with: cargo test --test property_tests

use proptest::prelude::*;

// ============================================================================
// AGGREGATION TESTS
// ============================================================================

mod aggregation_tests {
    use super::*;
    use chrono::NaiveDate;
    use pulse::cost::{
        build_report, CostLineItem, DateRange, FailureKind, Profile, ProfileCostResult,
        TOP_SERVICES_LIMIT,
    };
    use rust_decimal::Decimal;

    const SERVICES: &[&str] = &[
        "Amazon EC2",
        "Amazon S3",
        "Amazon RDS",
        "AWS Lambda",
        "Amazon CloudWatch",
        "Amazon DynamoDB",
        "AWS KMS",
        "Tax",
    ];

    /// (succeeded, [(service index, amount in cents)])
    type RawResult = (bool, Vec<(usize, i64)>);

    fn raw_results() -> impl Strategy<Value = Vec<RawResult>> {
        prop::collection::vec(
            (
                any::<bool>(),
                prop::collection::vec((0..SERVICES.len(), 1i64..10_000_000), 0..10),
            ),
            0..8,
        )
    }

    fn to_results(raw: Vec<RawResult>) -> Vec<ProfileCostResult> {
        let period = DateRange::ending_on(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), 30);
        raw.into_iter()
            .enumerate()
            .map(|(i, (ok, items))| {
                let profile = Profile::named(format!("profile-{}", i));
                if !ok {
                    return ProfileCostResult::failed(
                        profile,
                        period,
                        FailureKind::Api,
                        "denied",
                    );
                }
                let items = items
                    .into_iter()
                    .map(|(service, cents)| CostLineItem {
                        service_name: SERVICES[service].to_string(),
                        amount: Decimal::new(cents, 2),
                        currency: "USD".to_string(),
                    })
                    .collect();
                ProfileCostResult::success(profile, None, period, items)
            })
            .collect()
    }

    proptest! {
        /// Invariant: succeeded + failed == attempted
        #[test]
        fn counters_add_up(raw in raw_results()) {
            let report = build_report(30, to_results(raw));
            prop_assert_eq!(
                report.profiles_succeeded + report.profiles_failed,
                report.profiles_attempted
            );
            prop_assert_eq!(report.results.len(), report.profiles_attempted);
        }

        /// Invariant: total equals the sum of successful totals
        #[test]
        fn total_matches_successes(raw in raw_results()) {
            let report = build_report(30, to_results(raw));
            let expected: Decimal = report
                .results
                .iter()
                .filter(|r| r.is_success())
                .map(|r| r.total_cost)
                .sum();
            prop_assert_eq!(report.total_cost_all_accounts, expected);
        }

        /// Invariant: at most five services, sorted descending
        #[test]
        fn top_services_bounded_and_sorted(raw in raw_results()) {
            let report = build_report(30, to_results(raw));
            prop_assert!(report.top_services.len() <= TOP_SERVICES_LIMIT);
            for pair in report.top_services.windows(2) {
                prop_assert!(pair[0].amount >= pair[1].amount);
            }
        }

        /// Invariant: percentages never sum past 100
        #[test]
        fn percentages_bounded(raw in raw_results()) {
            let report = build_report(30, to_results(raw));
            let sum: Decimal = report.top_services.iter().map(|s| s.percentage).sum();
            prop_assert!(sum <= Decimal::ONE_HUNDRED);
            for service in &report.top_services {
                prop_assert!(service.percentage >= Decimal::ZERO);
            }
        }

        /// Invariant: the most expensive account is a success with the highest total
        #[test]
        fn most_expensive_is_maximal(raw in raw_results()) {
            let report = build_report(30, to_results(raw));
            match &report.most_expensive_account {
                Some(top) => {
                    prop_assert!(top.is_success());
                    for r in report.results.iter().filter(|r| r.is_success()) {
                        prop_assert!(top.total_cost >= r.total_cost);
                    }
                }
                None => prop_assert_eq!(report.profiles_succeeded, 0),
            }
        }
    }
}

// ============================================================================
// PROFILE SCANNER TESTS
// ============================================================================

mod scanner_tests {
    use super::*;
    use pulse::cost::discover_profiles;
    use tempfile::TempDir;

    fn scan(config: &str, credentials: &str) -> Vec<pulse::cost::Profile> {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config");
        let credentials_path = dir.path().join("credentials");
        std::fs::write(&config_path, config).unwrap();
        std::fs::write(&credentials_path, credentials).unwrap();
        discover_profiles(&config_path, &credentials_path)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Invariant: arbitrary file content never panics
        #[test]
        fn never_panics(config in "\\PC{0,300}", credentials in "\\PC{0,300}") {
            let _ = scan(&config, &credentials);
        }

        /// Invariant: output is sorted by name with no duplicates
        #[test]
        fn sorted_and_unique(names in prop::collection::vec("[a-z]{1,8}", 0..6)) {
            let config: String = names
                .iter()
                .map(|n| format!("[profile {}]\nregion = us-east-1\n", n))
                .collect();
            let credentials: String = names
                .iter()
                .rev()
                .map(|n| format!("[{}]\naws_access_key_id = AKIA\n", n))
                .collect();
            let profiles = scan(&config, &credentials);
            for pair in profiles.windows(2) {
                prop_assert!(pair[0].name < pair[1].name);
            }
        }

        /// Invariant: a key id alone never counts as credentials
        #[test]
        fn key_id_alone_is_not_credentials(name in "[a-z]{1,8}") {
            let profiles = scan("", &format!("[{}]\naws_access_key_id = AKIAXYZ\n", name));
            prop_assert_eq!(profiles.len(), 1);
            prop_assert!(!profiles[0].has_credentials);
        }
    }
}

// ============================================================================
// INDICATOR TESTS
// ============================================================================

mod indicator_tests {
    use super::*;
    use pulse::market::indicators::{bollinger, rsi, sma};

    fn prices() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(1.0f64..1000.0, 21..120)
    }

    proptest! {
        /// Invariant: RSI stays within [0, 100]
        #[test]
        fn rsi_bounded(series in prices()) {
            let value = rsi(&series, 14).unwrap();
            prop_assert!((0.0..=100.0).contains(&value));
        }

        /// Invariant: SMA lies between the window's min and max
        #[test]
        fn sma_within_range(series in prices()) {
            let value = sma(&series, 20).unwrap();
            let window = &series[series.len() - 20..];
            let min = window.iter().copied().fold(f64::INFINITY, f64::min);
            let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(value >= min - 1e-9 && value <= max + 1e-9);
        }

        /// Invariant: lower <= middle <= upper
        #[test]
        fn bands_ordered(series in prices()) {
            let bands = bollinger(&series, 20, 2.0).unwrap();
            prop_assert!(bands.lower <= bands.middle);
            prop_assert!(bands.middle <= bands.upper);
        }
    }
}
