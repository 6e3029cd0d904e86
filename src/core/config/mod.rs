//! Configuration types and management for claimaudit-rs.
//!
//! [`AuditConfig`] is the single strongly shaped configuration object for the
//! audit engine. It is loaded from YAML or JSON, validated eagerly, and rejected
//! with a configuration error before any claim is touched.

pub mod scoring;
pub mod tables;
pub mod validation;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{AuditError, Result, ResultExt};

pub use scoring::{ActionThresholds, FusionConfig, RiskBands, SeverityWeights};
pub use tables::{BundleDefinition, CodeFamily, CodeLevel, CodeTables};
pub use validation::{
    validate_day_span, validate_non_increasing, validate_positive_f64, validate_positive_i64,
    validate_strictly_descending, validate_unit_range,
};

/// Price outlier rule tuning beyond the headline threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceOutlierConfig {
    /// Absolute deviation at or above which a price outlier is critical rather than a warning
    #[serde(default = "PriceOutlierConfig::default_critical_deviation")]
    pub critical_deviation: f64,
}

impl Default for PriceOutlierConfig {
    fn default() -> Self {
        Self {
            critical_deviation: Self::default_critical_deviation(),
        }
    }
}

impl PriceOutlierConfig {
    const fn default_critical_deviation() -> f64 {
        6.0
    }
}

/// Worker pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PerformanceConfig {
    /// Maximum rayon worker threads per session (0 lets rayon decide)
    #[serde(default)]
    pub max_workers: usize,
}

/// Main configuration for the audit engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Absolute robust z-score above which a charge is a price outlier
    #[serde(default = "AuditConfig::default_outlier_zscore_threshold")]
    pub outlier_zscore_threshold: f64,

    /// Window (in days of creation time) within which an identical claim is a duplicate
    #[serde(default = "AuditConfig::default_duplicate_lookback_days")]
    pub duplicate_lookback_days: i64,

    /// Minimum baseline samples before price deviations count as evidence
    #[serde(default = "AuditConfig::default_min_baseline_sample_count")]
    pub min_baseline_sample_count: u64,

    /// Base score per severity level
    #[serde(default)]
    pub severity_weights: SeverityWeights,

    /// Weight applied to the anomaly score during fusion
    #[serde(default = "AuditConfig::default_anomaly_weight")]
    pub anomaly_weight: f64,

    /// Minimum suspicion score per recommended action
    #[serde(default)]
    pub action_thresholds: ActionThresholds,

    /// Price outlier severity split
    #[serde(default)]
    pub price_outlier: PriceOutlierConfig,

    /// Code family and bundle reference tables
    #[serde(default)]
    pub code_tables: CodeTables,

    /// Score bands used by result statistics
    #[serde(default)]
    pub risk_bands: RiskBands,

    /// Worker pool settings
    #[serde(default)]
    pub performance: PerformanceConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            outlier_zscore_threshold: Self::default_outlier_zscore_threshold(),
            duplicate_lookback_days: Self::default_duplicate_lookback_days(),
            min_baseline_sample_count: Self::default_min_baseline_sample_count(),
            severity_weights: SeverityWeights::default(),
            anomaly_weight: Self::default_anomaly_weight(),
            action_thresholds: ActionThresholds::default(),
            price_outlier: PriceOutlierConfig::default(),
            code_tables: CodeTables::default(),
            risk_bands: RiskBands::default(),
            performance: PerformanceConfig::default(),
        }
    }
}

impl AuditConfig {
    const fn default_outlier_zscore_threshold() -> f64 {
        3.0
    }

    const fn default_duplicate_lookback_days() -> i64 {
        30
    }

    const fn default_min_baseline_sample_count() -> u64 {
        30
    }

    const fn default_anomaly_weight() -> f64 {
        0.30
    }

    /// Load configuration from a YAML (or JSON, which is valid YAML) file
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            AuditError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content).map_err(|e| {
            AuditError::io(
                format!("Failed to write config file: {}", path.display()),
                e,
            )
        })
    }

    /// Fusion settings as a standalone value
    pub fn fusion(&self) -> FusionConfig {
        FusionConfig {
            severity_weights: self.severity_weights.clone(),
            anomaly_weight: self.anomaly_weight,
            action_thresholds: self.action_thresholds.clone(),
        }
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> Result<()> {
        validate_positive_f64(self.outlier_zscore_threshold, "outlier_zscore_threshold")?;
        validate_day_span(self.duplicate_lookback_days, "duplicate_lookback_days")?;
        validate_positive_f64(
            self.price_outlier.critical_deviation,
            "price_outlier.critical_deviation",
        )?;
        if self.price_outlier.critical_deviation < self.outlier_zscore_threshold {
            return Err(AuditError::config_field(
                format!(
                    "price_outlier.critical_deviation ({}) must be >= outlier_zscore_threshold ({})",
                    self.price_outlier.critical_deviation, self.outlier_zscore_threshold
                ),
                "price_outlier.critical_deviation",
            ));
        }

        self.fusion().validate()?;
        self.code_tables.validate()?;
        self.risk_bands.validate()?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
