//! Human-readable text report.

use chrono::NaiveDateTime;
use spend_core::formatting::{format_count, format_currency, percentage};
use spend_data::aggregator::AggregationResult;
use spend_data::anomalies::{AnomalyExample, AnomalyReport};

/// Suppliers listed in the report.
pub const REPORT_TOP_SUPPLIERS: usize = 10;

pub const RECOMMENDATIONS: &[&str] = &[
    "Monitor large payment outliers for potential fraud or errors",
    "Investigate suppliers with unusually high spending concentrations",
    "Review seasonal spending patterns for budget planning",
    "Implement controls for payments exceeding normal thresholds",
    "Analyze service category effectiveness vs. spending",
];

/// Stateless builder for the plain-text analysis report.
pub struct ReportBuilder;

impl ReportBuilder {
    pub fn build(
        aggregation: &AggregationResult,
        anomalies: &AnomalyReport,
        generated_at: NaiveDateTime,
    ) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push("YOUTH JUSTICE SPENDING ANALYSIS REPORT".to_string());
        lines.push("=".repeat(50));
        lines.push(format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")));
        lines.push(String::new());

        Self::executive_summary(&mut lines, aggregation);
        Self::yearly_trends(&mut lines, aggregation);
        Self::categories(&mut lines, aggregation);
        Self::suppliers(&mut lines, aggregation);
        Self::anomalies(&mut lines, anomalies);

        section(&mut lines, "RECOMMENDATIONS", 15);
        for (i, recommendation) in RECOMMENDATIONS.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, recommendation));
        }

        lines.join("\n")
    }

    fn executive_summary(lines: &mut Vec<String>, aggregation: &AggregationResult) {
        let summary = &aggregation.summary;
        let date_range = summary
            .date_range
            .map(|r| format!("{} to {}", r.start, r.end))
            .unwrap_or_else(|| "Unknown".to_string());
        let average = summary
            .average_payment
            .map(format_currency)
            .unwrap_or_else(|| "N/A".to_string());

        section(lines, "EXECUTIVE SUMMARY", 20);
        lines.push(format!(
            "Total Records Analyzed: {}",
            format_count(summary.total_records)
        ));
        lines.push(format!("Total Spending: {}", format_currency(summary.total_amount)));
        lines.push(format!("Average Payment: {average}"));
        lines.push(format!("Date Range: {date_range}"));
        lines.push(String::new());
    }

    fn yearly_trends(lines: &mut Vec<String>, aggregation: &AggregationResult) {
        if aggregation.yearly.is_empty() {
            return;
        }
        section(lines, "YEARLY SPENDING TRENDS", 25);
        for year in &aggregation.yearly {
            lines.push(format!(
                "{}: {} ({} payments)",
                year.key,
                format_currency(year.sum),
                format_count(year.count)
            ));
        }
        lines.push(String::new());
    }

    fn categories(lines: &mut Vec<String>, aggregation: &AggregationResult) {
        if aggregation.categories.is_empty() {
            return;
        }
        let total = aggregation.summary.total_amount;
        section(lines, "SPENDING BY SERVICE CATEGORY", 30);
        for category in &aggregation.categories {
            lines.push(format!(
                "{}: {} ({:.1}%)",
                category.key,
                format_currency(category.sum),
                percentage(category.sum, total, 1)
            ));
        }
        lines.push(String::new());
    }

    fn suppliers(lines: &mut Vec<String>, aggregation: &AggregationResult) {
        if aggregation.top_suppliers.is_empty() {
            return;
        }
        section(lines, "TOP 10 SUPPLIERS", 15);
        for supplier in aggregation.top_suppliers.iter().take(REPORT_TOP_SUPPLIERS) {
            lines.push(format!("{}: {}", supplier.key, format_currency(supplier.sum)));
        }
        if let Some(pct) = aggregation.concentration.top_10_percentage {
            lines.push(format!(
                "Top 10 share of spending: {:.1}% across {} suppliers",
                pct,
                format_count(aggregation.concentration.total_suppliers)
            ));
        }
        lines.push(String::new());
    }

    fn anomalies(lines: &mut Vec<String>, anomalies: &AnomalyReport) {
        if anomalies.statistical_outliers.is_none()
            && anomalies.large_payments.is_none()
            && anomalies.payment_delays.is_none()
        {
            return;
        }
        section(lines, "ANOMALIES AND OUTLIERS", 22);

        if let Some(outliers) = &anomalies.statistical_outliers {
            lines.push(format!(
                "Statistical Outliers: {} ({}%)",
                outliers.count, outliers.percentage
            ));
            lines.push(format!(
                "Outlier Bounds: {} to {}",
                format_currency(outliers.lower_bound),
                format_currency(outliers.upper_bound)
            ));
        }

        if let Some(large) = &anomalies.large_payments {
            lines.push(format!("Large Payments (>99th percentile): {}", large.count));
            lines.push(format!(
                "Large Payment Threshold: {}",
                format_currency(large.threshold)
            ));
            for example in &large.examples {
                lines.push(format!("  - {}", describe_amount(example)));
            }
        }

        if let Some(delays) = &anomalies.payment_delays {
            lines.push(format!(
                "Long Payment Delays (>{} days): {}",
                delays.threshold_days, delays.count
            ));
            lines.push(format!("Average Payment Delay: {:.1} days", delays.mean_delay));
            lines.push(format!("Longest Payment Delay: {} days", delays.max_delay));
            for example in &delays.examples {
                lines.push(format!("  - {}", describe_delay(example)));
            }
        }

        lines.push(String::new());
    }
}

fn section(lines: &mut Vec<String>, title: &str, rule: usize) {
    lines.push(title.to_string());
    lines.push("-".repeat(rule));
}

fn describe_amount(example: &AnomalyExample) -> String {
    let amount = example
        .amount
        .map(format_currency)
        .unwrap_or_else(|| "N/A".to_string());
    match &example.description {
        Some(description) => format!("{}: {} ({})", example.supplier_name, amount, description),
        None => format!("{}: {}", example.supplier_name, amount),
    }
}

fn describe_delay(example: &AnomalyExample) -> String {
    let days = example.delay_days.unwrap_or_default();
    match example.amount {
        Some(amount) => format!(
            "{}: {} days ({})",
            example.supplier_name,
            days,
            format_currency(amount)
        ),
        None => format!("{}: {} days", example.supplier_name, days),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
