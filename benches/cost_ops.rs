//! Performance benchmarks for profile discovery and cost aggregation

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pulse::cost::{
    build_report, discover_profiles, format_report, CostLineItem, DateRange, FailureKind, Profile,
    ProfileCostResult,
};
use rust_decimal::Decimal;

const SERVICES: &[&str] = &[
    "Amazon Elastic Compute Cloud - Compute",
    "Amazon Simple Storage Service",
    "Amazon Relational Database Service",
    "AWS Lambda",
    "Amazon CloudWatch",
    "Amazon DynamoDB",
    "AWS Key Management Service",
    "Amazon Virtual Private Cloud",
    "Tax",
];

fn results(accounts: usize) -> Vec<ProfileCostResult> {
    let period = DateRange::ending_on(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), 30);
    (0..accounts)
        .map(|i| {
            let profile = Profile::named(format!("account-{}", i));
            if i % 7 == 6 {
                return ProfileCostResult::failed(profile, period, FailureKind::Credential, "expired");
            }
            let items = SERVICES
                .iter()
                .enumerate()
                .map(|(j, service)| CostLineItem {
                    service_name: service.to_string(),
                    amount: Decimal::new(((i + 1) * (j + 3) * 1234) as i64, 2),
                    currency: "USD".to_string(),
                })
                .collect();
            ProfileCostResult::success(profile, Some(format!("{:012}", i)), period, items)
        })
        .collect()
}

fn bench_build_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_report");

    for accounts in [5, 50, 500] {
        let input = results(accounts);
        group.throughput(Throughput::Elements(accounts as u64));
        group.bench_with_input(BenchmarkId::from_parameter(accounts), &input, |b, input| {
            b.iter(|| build_report(30, black_box(input.clone())))
        });
    }

    group.finish();
}

fn bench_format_report(c: &mut Criterion) {
    let report = build_report(30, results(50));

    let mut group = c.benchmark_group("format_report");
    for style in ["detailed", "summary"] {
        group.bench_with_input(BenchmarkId::from_parameter(style), &style, |b, style| {
            b.iter(|| format_report(black_box(&report), style))
        });
    }
    group.finish();
}

fn bench_discover_profiles(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let config_path = dir.path().join("config");
    let credentials_path = dir.path().join("credentials");

    let mut config = String::from("[default]\nregion = us-east-1\noutput = json\n\n");
    let mut credentials = String::new();
    for i in 0..200 {
        config.push_str(&format!(
            "[profile team-{i}]\nregion = eu-west-1\nrole_arn = arn:aws:iam::{i:012}:role/Read\nsource_profile = default\n\n"
        ));
        credentials.push_str(&format!(
            "[team-{i}]\naws_access_key_id = AKIA{i:016}\naws_secret_access_key = secret{i}\n\n"
        ));
    }
    std::fs::write(&config_path, config).unwrap();
    std::fs::write(&credentials_path, credentials).unwrap();

    c.bench_function("discover_profiles_200", |b| {
        b.iter(|| discover_profiles(black_box(&config_path), black_box(&credentials_path)))
    });
}

criterion_group!(
    benches,
    bench_build_report,
    bench_format_report,
    bench_discover_profiles
);
criterion_main!(benches);
