//! Text rendering of [`WarehouseSummary`]

use rust_decimal::Decimal;

use super::{Pricing, WarehouseSummary};

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

/// Render a summary as a plain-text report
pub fn format_warehouse_report(summary: &WarehouseSummary, pricing: &Pricing) -> String {
    let overall = &summary.overall_costs;
    let compute = &overall.compute_metrics;
    let storage = &overall.storage_metrics;
    let ranking = &summary.top_warehouses;

    let mut lines = vec![
        "SNOWFLAKE COST ANALYSIS REPORT".to_string(),
        "=".repeat(50),
        format!("Account: {}", summary.account),
        format!(
            "Analysis Date: {}",
            summary.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        format!(
            "Period: Last {} days ({} to {})",
            summary.period_days, overall.start_date, overall.end_date
        ),
        format!(
            "Total Estimated Cost: {} {}",
            money(summary.summary.total_estimated_cost),
            overall.currency
        ),
        String::new(),
        "COMPUTE COSTS".to_string(),
        "-".repeat(30),
        format!("Credits Used: {:.2}", compute.total_credits_used),
        format!("Estimated Cost: {}", money(compute.estimated_compute_cost)),
        format!("Warehouses Used: {}", compute.warehouses_used),
        format!("Metering Records: {}", compute.metering_records),
        String::new(),
        "STORAGE COSTS".to_string(),
        "-".repeat(30),
        format!("Avg Storage: {:.2} GB", storage.avg_storage_gb),
        format!("Avg Stage: {:.2} GB", storage.avg_stage_gb),
        format!("Avg Fail-safe: {:.2} GB", storage.avg_failsafe_gb),
        format!("Estimated Cost: {}", money(storage.estimated_storage_cost)),
        String::new(),
        "TOP WAREHOUSES BY COST".to_string(),
        "-".repeat(40),
    ];

    if ranking.top_warehouses.is_empty() {
        lines.push("No warehouse usage recorded".to_string());
        lines.push(String::new());
    }
    for (i, warehouse) in ranking.top_warehouses.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, warehouse.warehouse_name));
        lines.push(format!(
            "   Cost: {} ({:.1}%)",
            money(warehouse.estimated_cost),
            warehouse.percentage_of_total.round_dp(1)
        ));
        lines.push(format!("   Credits: {:.2}", warehouse.total_credits));
        lines.push(format!("   Metering Records: {}", warehouse.metering_records));
        lines.push(String::new());
    }

    lines.push(format!(
        "Note: estimates use {} per credit and ${} per GB-month of storage.",
        money(pricing.credit_price),
        pricing.storage_price_per_gb_month
    ));
    lines.push("Actual costs may vary based on your contract and region.".to_string());

    lines.join("\n")
}
