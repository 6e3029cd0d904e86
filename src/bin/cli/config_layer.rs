//! Configuration Layer Management
//!
//! Defaults, then a configuration file, then CLI overrides.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::cli::args::ThresholdArgs;
use claimaudit_rs::core::config::AuditConfig;

const IMPLICIT_CONFIG_FILES: [&str; 2] = [".claimaudit.yml", ".claimaudit.yaml"];

/// Merge a partial override into a configuration, with the override taking priority
pub trait ConfigMerge<T> {
    /// Apply the override
    fn merge_with(&mut self, other: T);
}

impl ConfigMerge<&ThresholdArgs> for AuditConfig {
    fn merge_with(&mut self, args: &ThresholdArgs) {
        if let Some(threshold) = args.outlier_threshold {
            self.outlier_zscore_threshold = threshold;
        }
        if let Some(days) = args.lookback_days {
            self.duplicate_lookback_days = days;
        }
        if let Some(samples) = args.min_samples {
            self.min_baseline_sample_count = samples;
        }
        if let Some(weight) = args.anomaly_weight {
            self.anomaly_weight = weight;
        }
        if let Some(workers) = args.max_workers {
            self.performance.max_workers = workers;
        }
    }
}

/// Explicit config path, otherwise the first local default that exists
fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        IMPLICIT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    })
}

/// Load a configuration file without applying any overrides
pub fn load_config_file(path: &Path) -> anyhow::Result<AuditConfig> {
    AuditConfig::from_yaml_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Build the effective configuration for an audit run
pub fn build_layered_config(
    explicit: Option<&Path>,
    overrides: &ThresholdArgs,
) -> anyhow::Result<AuditConfig> {
    let mut config = match resolve_config_path(explicit) {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration file");
            load_config_file(&path)?
        }
        None => AuditConfig::default(),
    };

    config.merge_with(overrides);
    config
        .validate()
        .context("Configuration is invalid after applying CLI overrides")?;
    Ok(config)
}
