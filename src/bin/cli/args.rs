//! CLI Argument Structures and Configuration
//!
//! This module contains all CLI argument definitions, command structures,
//! and configuration enums used by the claimaudit binary.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use claimaudit_rs::io::reports::ReportFormat;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Post-payment medical claim audit engine
#[derive(Parser)]
#[command(name = "claimaudit")]
#[command(version = VERSION)]
#[command(about = "Audit paid medical claims for billing errors and missing screenings")]
#[command(long_about = "
Audit batches of paid medical claims against a historical pricing baseline.
Every claim gets rule findings, an optional anomaly score, a suspicion score
and a recommended action.

Common Usage:

  # Audit a batch against a prebuilt baseline
  claimaudit audit --claims claims.json --baseline baseline.json

  # Build the baseline from historical claims first
  claimaudit build-baseline --history history.jsonl --out baseline.json

  # Add a pretrained anomaly model and write a YAML report
  claimaudit audit --claims claims.json --baseline baseline.json \\
      --model forest.json --format yaml --out report.yml

  # Inspect the configuration knobs
  claimaudit print-default-config
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit a batch of claims
    Audit(Box<AuditArgs>),

    /// Compute a baseline snapshot from historical claims
    #[command(name = "build-baseline")]
    BuildBaseline(BuildBaselineArgs),

    /// Print default configuration in YAML format
    #[command(name = "print-default-config")]
    PrintDefaultConfig,

    /// Initialize a configuration file with defaults
    #[command(name = "init-config")]
    InitConfig(InitConfigArgs),

    /// Validate a claimaudit configuration file
    #[command(name = "validate-config")]
    ValidateConfig(ValidateConfigArgs),
}

/// Threshold overrides applied on top of the configuration file
#[derive(Args, Default)]
pub struct ThresholdArgs {
    /// Absolute robust z-score above which a charge is a price outlier
    #[arg(long)]
    pub outlier_threshold: Option<f64>,

    /// Duplicate lookback window in days
    #[arg(long)]
    pub lookback_days: Option<i64>,

    /// Minimum baseline samples before price deviations count
    #[arg(long)]
    pub min_samples: Option<u64>,

    /// Weight of the anomaly score in the suspicion score
    #[arg(long)]
    pub anomaly_weight: Option<f64>,

    /// Maximum worker threads (0 lets the pool decide)
    #[arg(long)]
    pub max_workers: Option<usize>,
}

#[derive(Args)]
pub struct AuditArgs {
    /// Claims to audit (.json, .jsonl or .yaml)
    #[arg(long)]
    pub claims: PathBuf,

    /// Baseline snapshot produced by build-baseline
    #[arg(long, conflicts_with = "history")]
    pub baseline: Option<PathBuf>,

    /// Historical claims to compute the baseline from on the fly
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Pretrained isolation forest artifact
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Recorded financial assistance screenings
    #[arg(long)]
    pub screenings: Option<PathBuf>,

    /// Configuration file (defaults to .claimaudit.yml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Report destination (stdout when omitted)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Exit with status 1 when any claim needs follow-up
    #[arg(long)]
    pub fail_on_flagged: bool,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

#[derive(Args)]
pub struct BuildBaselineArgs {
    /// Historical claims (.json, .jsonl or .yaml)
    #[arg(long)]
    pub history: PathBuf,

    /// Snapshot destination
    #[arg(long)]
    pub out: PathBuf,

    /// Version number to stamp on the snapshot
    #[arg(long, default_value_t = 1)]
    pub version: u64,
}

#[derive(Args)]
pub struct InitConfigArgs {
    /// Output configuration file name
    #[arg(short, long, default_value = ".claimaudit.yml")]
    pub output: PathBuf,

    /// Overwrite existing configuration file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ValidateConfigArgs {
    /// Configuration file to validate
    pub config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON format output
    Json,
    /// YAML format output
    Yaml,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Yaml => ReportFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}
