//! Golden tests - fixture-based tests that lock expected behavior
//!
//! These tests use fixtures to verify that profile discovery and cost
//! aggregation produce expected outputs. Any change in behavior will cause
//! these tests to fail, signaling a potential breaking change.
//!
//! Run with: cargo test --test golden_tests

use serde::Deserialize;
use std::fs;

fn fixture(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

// ============================================================================
// PROFILE DISCOVERY GOLDEN TESTS
// ============================================================================

mod profiles_golden {
    use super::*;
    use pretty_assertions::assert_eq;
    use pulse::cost::{discover_profiles, Profile};

    #[test]
    fn test_profile_discovery_golden() {
        let profiles = discover_profiles(&fixture("aws/config"), &fixture("aws/credentials"));

        let content = fs::read_to_string(fixture("expected_profiles.json"))
            .expect("Failed to read expected_profiles.json fixture");
        let expected: Vec<Profile> =
            serde_json::from_str(&content).expect("Failed to parse fixture JSON");

        assert_eq!(profiles, expected);
    }

    #[test]
    fn test_missing_files_yield_nothing() {
        let profiles = discover_profiles(&fixture("aws/nope"), &fixture("aws/also-nope"));
        assert!(profiles.is_empty());
    }

    #[test]
    fn test_config_only_and_credentials_only() {
        let config_only = discover_profiles(&fixture("aws/config"), &fixture("aws/nope"));
        let names: Vec<&str> = config_only.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["default", "prod", "staging"]);
        assert!(config_only.iter().all(|p| !p.has_credentials));

        let credentials_only = discover_profiles(&fixture("aws/nope"), &fixture("aws/credentials"));
        let names: Vec<&str> = credentials_only.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["default", "legacy", "staging"]);
    }
}

// ============================================================================
// COST AGGREGATION GOLDEN TESTS
// ============================================================================

mod cost_golden {
    use super::*;
    use chrono::NaiveDate;
    use pulse::cost::{
        build_report, format_report, CostLineItem, DateRange, FailureKind, Profile,
        ProfileCostResult,
    };
    use rust_decimal::Decimal;

    #[derive(Debug, Deserialize)]
    struct Account {
        profile: String,
        #[serde(default)]
        items: Vec<(String, Decimal)>,
        #[serde(default)]
        failure: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct Expected {
        total: Decimal,
        succeeded: usize,
        failed: usize,
        top: Vec<(String, Decimal, Decimal)>,
        most_expensive: Option<String>,
        summary: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        days: u32,
        accounts: Vec<Account>,
        expected: Expected,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    fn to_result(account: Account, period: DateRange) -> ProfileCostResult {
        let profile = Profile::named(account.profile);
        match account.failure {
            Some(reason) => ProfileCostResult::failed(profile, period, FailureKind::Api, reason),
            None => ProfileCostResult::success(
                profile,
                None,
                period,
                account
                    .items
                    .into_iter()
                    .map(|(service_name, amount)| CostLineItem {
                        service_name,
                        amount,
                        currency: "USD".to_string(),
                    })
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_cost_scenarios_golden() {
        let content = fs::read_to_string(fixture("cost_scenarios.json"))
            .expect("Failed to read cost_scenarios.json fixture");
        let fixture: Fixture =
            serde_json::from_str(&content).expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            let end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
            let period = DateRange::ending_on(end, case.days);
            let results = case
                .accounts
                .into_iter()
                .map(|a| to_result(a, period))
                .collect();
            let report = build_report(case.days, results);
            let expected = case.expected;

            assert_eq!(
                report.total_cost_all_accounts, expected.total,
                "Case '{}': total",
                case.name
            );
            assert_eq!(
                report.profiles_succeeded, expected.succeeded,
                "Case '{}': succeeded",
                case.name
            );
            assert_eq!(
                report.profiles_failed, expected.failed,
                "Case '{}': failed",
                case.name
            );

            let top: Vec<(String, Decimal, Decimal)> = report
                .top_services
                .iter()
                .map(|s| (s.service_name.clone(), s.amount, s.percentage))
                .collect();
            assert_eq!(top, expected.top, "Case '{}': top services", case.name);

            assert_eq!(
                report
                    .most_expensive_account
                    .as_ref()
                    .map(|r| r.profile.name.clone()),
                expected.most_expensive,
                "Case '{}': most expensive",
                case.name
            );

            let summary = format_report(&report, "summary");
            let lines: Vec<&str> = summary.lines().collect();
            assert_eq!(lines, expected.summary, "Case '{}': summary", case.name);
        }
    }
}
