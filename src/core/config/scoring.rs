//! Score fusion configuration types.
//!
//! This module contains the severity weights, anomaly weight, recommended-action
//! thresholds and reporting risk bands used when fusing rule findings with the
//! anomaly score.

use serde::{Deserialize, Serialize};

use super::validation::{
    validate_non_increasing, validate_strictly_descending, validate_unit_range,
};
use crate::core::errors::Result;
use crate::core::findings::Severity;
use crate::core::scoring::RecommendedAction;

/// Base score contributed by the most severe finding on a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityWeights {
    /// Weight for critical findings
    #[serde(default = "SeverityWeights::default_critical")]
    pub critical: f64,

    /// Weight for warning findings
    #[serde(default = "SeverityWeights::default_warning")]
    pub warning: f64,

    /// Weight for informational findings
    #[serde(default = "SeverityWeights::default_info")]
    pub info: f64,
}

/// Default implementation for [`SeverityWeights`].
impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: Self::default_critical(),
            warning: Self::default_warning(),
            info: Self::default_info(),
        }
    }
}

impl SeverityWeights {
    const fn default_critical() -> f64 {
        0.70
    }

    const fn default_warning() -> f64 {
        0.40
    }

    const fn default_info() -> f64 {
        0.10
    }

    /// Weight assigned to a severity level
    pub fn weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }

    /// Validate severity weights
    ///
    /// Weights must be unit-range and ordered so that a more severe finding can
    /// never lower the base score.
    pub fn validate(&self) -> Result<()> {
        validate_unit_range(self.critical, "severity_weights.critical")?;
        validate_unit_range(self.warning, "severity_weights.warning")?;
        validate_unit_range(self.info, "severity_weights.info")?;
        validate_non_increasing(
            &[
                ("critical", self.critical),
                ("warning", self.warning),
                ("info", self.info),
            ],
            "severity_weights",
        )
    }
}

/// Minimum suspicion score for each recommended action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionThresholds {
    /// Score at or above which the claim is referred for provider dispute
    #[serde(default = "ActionThresholds::default_refer")]
    pub refer_for_provider_dispute: f64,

    /// Score at or above which medical records are requested
    #[serde(default = "ActionThresholds::default_records")]
    pub request_medical_records: f64,

    /// Score at or above which the claim is flagged for manual review
    #[serde(default = "ActionThresholds::default_review")]
    pub flag_for_manual_review: f64,
}

/// Default implementation for [`ActionThresholds`].
impl Default for ActionThresholds {
    fn default() -> Self {
        Self {
            refer_for_provider_dispute: Self::default_refer(),
            request_medical_records: Self::default_records(),
            flag_for_manual_review: Self::default_review(),
        }
    }
}

impl ActionThresholds {
    const fn default_refer() -> f64 {
        0.85
    }

    const fn default_records() -> f64 {
        0.60
    }

    const fn default_review() -> f64 {
        0.30
    }

    /// Map a suspicion score onto an action
    pub fn action_for(&self, suspicion_score: f64) -> RecommendedAction {
        if suspicion_score >= self.refer_for_provider_dispute {
            RecommendedAction::ReferForProviderDispute
        } else if suspicion_score >= self.request_medical_records {
            RecommendedAction::RequestMedicalRecords
        } else if suspicion_score >= self.flag_for_manual_review {
            RecommendedAction::FlagForManualReview
        } else {
            RecommendedAction::NoAction
        }
    }

    /// Validate action thresholds
    pub fn validate(&self) -> Result<()> {
        validate_unit_range(
            self.refer_for_provider_dispute,
            "action_thresholds.refer_for_provider_dispute",
        )?;
        validate_unit_range(
            self.request_medical_records,
            "action_thresholds.request_medical_records",
        )?;
        validate_unit_range(
            self.flag_for_manual_review,
            "action_thresholds.flag_for_manual_review",
        )?;
        validate_strictly_descending(
            &[
                ("refer_for_provider_dispute", self.refer_for_provider_dispute),
                ("request_medical_records", self.request_medical_records),
                ("flag_for_manual_review", self.flag_for_manual_review),
            ],
            "action_thresholds",
        )
    }
}

/// Everything score fusion needs, extracted from [`super::AuditConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Severity weights for the deterministic base score
    #[serde(default)]
    pub severity_weights: SeverityWeights,

    /// Multiplier applied to the anomaly score
    #[serde(default = "FusionConfig::default_anomaly_weight")]
    pub anomaly_weight: f64,

    /// Recommended-action thresholds
    #[serde(default)]
    pub action_thresholds: ActionThresholds,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            severity_weights: SeverityWeights::default(),
            anomaly_weight: Self::default_anomaly_weight(),
            action_thresholds: ActionThresholds::default(),
        }
    }
}

impl FusionConfig {
    const fn default_anomaly_weight() -> f64 {
        0.30
    }

    /// Validate fusion configuration
    pub fn validate(&self) -> Result<()> {
        self.severity_weights.validate()?;
        validate_unit_range(self.anomaly_weight, "anomaly_weight")?;
        self.action_thresholds.validate()
    }
}

/// Score bands used when summarising a result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBands {
    /// Lower bound of the high-risk band
    #[serde(default = "RiskBands::default_high")]
    pub high: f64,
    /// Lower bound of the medium-risk band
    #[serde(default = "RiskBands::default_medium")]
    pub medium: f64,
    /// Lower bound of the low-risk band
    #[serde(default = "RiskBands::default_low")]
    pub low: f64,
}

impl Default for RiskBands {
    fn default() -> Self {
        Self {
            high: Self::default_high(),
            medium: Self::default_medium(),
            low: Self::default_low(),
        }
    }
}

impl RiskBands {
    const fn default_high() -> f64 {
        0.80
    }

    const fn default_medium() -> f64 {
        0.60
    }

    const fn default_low() -> f64 {
        0.40
    }

    /// Validate risk bands
    pub fn validate(&self) -> Result<()> {
        validate_unit_range(self.high, "risk_bands.high")?;
        validate_unit_range(self.medium, "risk_bands.medium")?;
        validate_unit_range(self.low, "risk_bands.low")?;
        validate_strictly_descending(
            &[
                ("high", self.high),
                ("medium", self.medium),
                ("low", self.low),
            ],
            "risk_bands",
        )
    }
}
