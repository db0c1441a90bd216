//! Text rendering of [`AggregateReport`]

use rust_decimal::Decimal;

use super::aggregate::percentage_of;
use super::{AggregateReport, FetchStatus, ProfileCostResult, ServiceCost};

const SUMMARY_SERVICE_LIMIT: usize = 3;
const PROFILE_SERVICE_LIMIT: usize = 5;

/// Report layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportStyle {
    #[default]
    Detailed,
    Summary,
}

impl ReportStyle {
    /// Parse a style name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "detailed" => Some(ReportStyle::Detailed),
            "summary" => Some(ReportStyle::Summary),
            _ => None,
        }
    }

    /// Parse a style name, falling back to `Detailed` for anything unknown
    pub fn parse_or_default(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown report format {:?}, falling back to detailed",
                name
            );
            ReportStyle::Detailed
        })
    }
}

/// Render `report` in the named style. Unknown styles render as detailed.
pub fn format_report(report: &AggregateReport, style: &str) -> String {
    match ReportStyle::parse_or_default(style) {
        ReportStyle::Summary => format_summary(report),
        ReportStyle::Detailed => format_detailed(report),
    }
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

fn percent(share: Decimal) -> String {
    format!("{:.1}%", share.round_dp(1))
}

fn service_line(index: usize, service: &ServiceCost) -> String {
    format!(
        "{}. {}: {} ({})",
        index + 1,
        service.service_name,
        money(service.amount),
        percent(service.percentage)
    )
}

fn render(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn format_summary(report: &AggregateReport) -> String {
    let mut lines = vec![
        format!("AWS COST SUMMARY (last {} days)", report.period_days),
        format!(
            "Total Cost (All Accounts): {} {}",
            money(report.total_cost_all_accounts),
            report.currency
        ),
    ];
    if report.top_services.is_empty() {
        lines.push("Top Services: none".to_string());
    } else {
        lines.push("Top Services:".to_string());
        lines.extend(
            report
                .top_services
                .iter()
                .take(SUMMARY_SERVICE_LIMIT)
                .enumerate()
                .map(|(i, service)| service_line(i, service)),
        );
    }
    render(lines)
}

fn format_detailed(report: &AggregateReport) -> String {
    let mut lines = vec![
        "AWS COST ANALYSIS REPORT".to_string(),
        "=".repeat(50),
        format!(
            "Generated: {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        format!("Period: Last {} days", report.period_days),
        format!("Profiles Attempted: {}", report.profiles_attempted),
        format!("Succeeded: {}", report.profiles_succeeded),
        format!("Failed: {}", report.profiles_failed),
        format!("Accounts With Costs: {}", report.accounts_with_costs),
        format!(
            "Total Cost (All Accounts): {} {}",
            money(report.total_cost_all_accounts),
            report.currency
        ),
        String::new(),
        "TOP SERVICES (ALL ACCOUNTS)".to_string(),
        "-".repeat(40),
    ];
    if report.top_services.is_empty() {
        lines.push("No service costs recorded".to_string());
    }
    lines.extend(
        report
            .top_services
            .iter()
            .enumerate()
            .map(|(i, service)| service_line(i, service)),
    );
    lines.push(String::new());

    lines.push("MOST EXPENSIVE ACCOUNT".to_string());
    lines.push("-".repeat(30));
    match &report.most_expensive_account {
        Some(top) => {
            lines.push(format!("Profile: {}", top.profile.name));
            lines.push(format!("Account ID: {}", account_label(top)));
            lines.push(format!("Cost: {}", money(top.total_cost)));
        }
        None => lines.push("None (no profile succeeded)".to_string()),
    }
    lines.push(String::new());

    lines.push("PROFILE DETAILS".to_string());
    lines.push("-".repeat(40));
    if report.results.is_empty() {
        lines.push("No profiles analyzed".to_string());
    }
    for result in &report.results {
        profile_lines(&mut lines, result);
    }

    render(lines)
}

fn account_label(result: &ProfileCostResult) -> &str {
    result.account_id.as_deref().unwrap_or("unknown")
}

fn profile_lines(lines: &mut Vec<String>, result: &ProfileCostResult) {
    match &result.status {
        FetchStatus::Failed { reason, kind } => {
            lines.push(format!(
                "[failed] {} ({}): {}",
                result.profile.name, kind, reason
            ));
        }
        FetchStatus::Success => {
            lines.push(format!(
                "[ok] {} (Account: {})",
                result.profile.name,
                account_label(result)
            ));
            lines.push(format!(
                "   Region: {}",
                result.profile.region.as_deref().unwrap_or("not set")
            ));
            lines.push(format!("   Total Cost: {}", money(result.total_cost)));
            lines.push(format!("   Services: {}", result.line_items.len()));
            lines.extend(
                result
                    .line_items
                    .iter()
                    .take(PROFILE_SERVICE_LIMIT)
                    .enumerate()
                    .map(|(i, item)| {
                        format!(
                            "     {}. {}: {} ({})",
                            i + 1,
                            item.service_name,
                            money(item.amount),
                            percent(percentage_of(item.amount, result.total_cost))
                        )
                    }),
            );
        }
    }
    lines.push(String::new());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{build_report, CostLineItem, DateRange, FailureKind, Profile};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn range() -> DateRange {
        DateRange::ending_on(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), 30)
    }

    fn success(name: &str, items: &[(&str, Decimal)]) -> ProfileCostResult {
        ProfileCostResult::success(
            Profile::named(name),
            Some("123456789012".to_string()),
            range(),
            items
                .iter()
                .map(|(s, a)| CostLineItem {
                    service_name: s.to_string(),
                    amount: *a,
                    currency: "USD".to_string(),
                })
                .collect(),
        )
    }

    fn many_services() -> AggregateReport {
        build_report(
            30,
            vec![success(
                "prod",
                &[
                    ("EC2", dec!(50)),
                    ("RDS", dec!(20)),
                    ("S3", dec!(15)),
                    ("Lambda", dec!(10)),
                    ("CloudWatch", dec!(5)),
                ],
            )],
        )
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!(ReportStyle::parse("summary"), Some(ReportStyle::Summary));
        assert_eq!(ReportStyle::parse(" Detailed "), Some(ReportStyle::Detailed));
        assert_eq!(ReportStyle::parse("pdf"), None);
        assert_eq!(ReportStyle::parse_or_default("pdf"), ReportStyle::Detailed);
    }

    #[test]
    fn test_summary_caps_services_at_three() {
        let text = format_report(&many_services(), "summary");
        assert!(text.contains("1. EC2: $50.00 (50.0%)"));
        assert!(text.contains("3. S3: $15.00 (15.0%)"));
        assert!(!text.contains("Lambda"));
        assert!(!text.contains("CloudWatch"));
        assert!(text.contains("Total Cost (All Accounts): $100.00 USD"));
    }

    #[test]
    fn test_detailed_lists_everything() {
        let text = format_report(&many_services(), "detailed");
        assert!(text.contains("5. CloudWatch: $5.00 (5.0%)"));
        assert!(text.contains("Profile: prod"));
        assert!(text.contains("Account ID: 123456789012"));
        assert!(text.contains("Profiles Attempted: 1"));
        assert!(text.contains("Services: 5"));
    }

    #[test]
    fn test_unknown_style_falls_back_to_detailed() {
        let report = many_services();
        assert_eq!(
            format_report(&report, "fancy"),
            format_report(&report, "detailed")
        );
    }

    #[test]
    fn test_empty_report_renders() {
        let report = build_report(30, Vec::new());
        let detailed = format_report(&report, "detailed");
        assert!(detailed.contains("Total Cost (All Accounts): $0.00 USD"));
        assert!(detailed.contains("No service costs recorded"));
        assert!(detailed.contains("None (no profile succeeded)"));

        let summary = format_report(&report, "summary");
        assert!(summary.contains("Top Services: none"));
    }

    #[test]
    fn test_failures_show_reasons() {
        let report = build_report(
            30,
            vec![ProfileCostResult::failed(
                Profile::named("legacy"),
                range(),
                FailureKind::Credential,
                "The security token included in the request is expired",
            )],
        );
        let text = format_report(&report, "detailed");
        assert!(text.contains("Succeeded: 0"));
        assert!(text.contains(
            "[failed] legacy (credential): The security token included in the request is expired"
        ));
    }

    #[test]
    fn test_percentages_use_one_decimal() {
        let report = build_report(
            30,
            vec![success("a", &[("A", dec!(2)), ("B", dec!(1))])],
        );
        let text = format_report(&report, "summary");
        assert!(text.contains("1. A: $2.00 (66.7%)"));
        assert!(text.contains("2. B: $1.00 (33.3%)"));
    }

    #[test]
    fn test_every_line_is_newline_terminated() {
        let report = many_services();
        for style in ["summary", "detailed"] {
            let text = format_report(&report, style);
            assert!(text.ends_with('\n'));
            assert!(!text.ends_with("\n\n\n"));
        }
        let summary = format_report(&report, "summary");
        assert_eq!(summary.lines().count(), 6);
        assert_eq!(
            summary.lines().next(),
            Some("AWS COST SUMMARY (last 30 days)")
        );
    }
}
