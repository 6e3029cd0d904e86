//! Console summaries.
//!
//! Everything here goes to stderr so a report on stdout stays machine-readable.

use std::path::Path;

use owo_colors::OwoColorize;
use tabled::{settings::Style as TableStyle, Table, Tabled};

use claimaudit_rs::api::results::{AuditStatistics, BatchManifest};
use claimaudit_rs::core::config::AuditConfig;

#[derive(Tabled)]
struct SummaryRow {
    metric: String,
    value: String,
}

impl SummaryRow {
    fn new(metric: &str, value: impl ToString) -> Self {
        Self {
            metric: metric.to_string(),
            value: value.to_string(),
        }
    }
}

fn print_table(rows: Vec<SummaryRow>) {
    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    eprintln!("{table}");
}

/// Summarise a finished session
pub fn display_session_summary(
    manifest: &BatchManifest,
    stats: &AuditStatistics,
    report: Option<&Path>,
) {
    let status = manifest.status.to_string();
    let status = if manifest.is_incomplete() {
        status.red().bold().to_string()
    } else {
        status.bright_green().bold().to_string()
    };
    eprintln!("{} {}", "Audit session".bright_blue().bold(), manifest.session_id);

    let mut rows = vec![
        SummaryRow::new("Status", status),
        SummaryRow::new("Baseline version", manifest.baseline_version),
        SummaryRow::new(
            "Anomaly model",
            manifest.model_version.as_deref().unwrap_or("none (rule-only)"),
        ),
        SummaryRow::new("Claims audited", manifest.audited_count()),
        SummaryRow::new("Ingestion failures", manifest.ingestion_failure_count()),
    ];
    if manifest.not_processed_count() > 0 {
        rows.push(SummaryRow::new("Not processed", manifest.not_processed_count()));
    }
    rows.push(SummaryRow::new("High risk", stats.high_risk));
    rows.push(SummaryRow::new("Medium risk", stats.medium_risk));
    for (action, count) in &stats.action_counts {
        rows.push(SummaryRow::new(action, count));
    }
    print_table(rows);

    for warning in &manifest.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
    if let Some(path) = report {
        eprintln!("{} {}", "Report:".dimmed(), path.display().to_string().cyan());
    }
}

/// Show the headline settings of a configuration
pub fn display_config_summary(config: &AuditConfig) {
    print_table(vec![
        SummaryRow::new("outlier_zscore_threshold", config.outlier_zscore_threshold),
        SummaryRow::new(
            "price_outlier.critical_deviation",
            config.price_outlier.critical_deviation,
        ),
        SummaryRow::new("duplicate_lookback_days", config.duplicate_lookback_days),
        SummaryRow::new("min_baseline_sample_count", config.min_baseline_sample_count),
        SummaryRow::new("anomaly_weight", config.anomaly_weight),
        SummaryRow::new("code_families", config.code_tables.code_families.len()),
        SummaryRow::new("bundles", config.code_tables.bundles.len()),
    ]);
}
