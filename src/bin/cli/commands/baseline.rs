//! Baseline snapshot construction.

use anyhow::Context;
use chrono::Utc;
use owo_colors::OwoColorize;

use crate::cli::args::BuildBaselineArgs;
use claimaudit_rs::core::baseline::{stats_from_history, BaselineSnapshot, SnapshotVersion};
use claimaudit_rs::core::normalizer::NormalizationContext;
use claimaudit_rs::io::claim_source::{load_records, normalize_history};

/// Compute per-code pricing statistics from historical claims
pub async fn build_baseline_command(args: BuildBaselineArgs) -> anyhow::Result<()> {
    let records = load_records(&args.history)
        .with_context(|| format!("Failed to load history from {}", args.history.display()))?;
    let as_of = Utc::now();
    let claims = normalize_history(&records, &NormalizationContext::new(as_of, 0));

    let snapshot = BaselineSnapshot {
        version: SnapshotVersion(args.version),
        as_of,
        stats: stats_from_history(&claims),
    };
    snapshot.to_json_file(&args.out)?;

    eprintln!(
        "{} {}",
        "Baseline written to:".bright_green().bold(),
        args.out.display().to_string().cyan()
    );
    eprintln!(
        "   version {}, {} procedure codes from {} of {} records",
        snapshot.version,
        snapshot.len(),
        claims.len(),
        records.len()
    );
    Ok(())
}
