//! Feature extraction for the anomaly scorer.
//!
//! This module provides the feature definitions and per-claim feature vectors
//! fed to the pretrained anomaly model. Feature order is fixed so that a model
//! artifact can address features by index as well as by name.

use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::core::claim::Claim;
use crate::core::errors::{AuditError, Result};
use crate::core::findings::{severity_counts, Finding};
use crate::detectors::context::RuleContext;
use crate::detectors::price_outlier::robust_deviation;

/// Feature names in model order
pub const PRICE_DEVIATION: &str = "price_deviation";
/// Count of critical findings
pub const CRITICAL_FINDINGS: &str = "critical_findings";
/// Count of warning findings
pub const WARNING_FINDINGS: &str = "warning_findings";
/// Count of informational findings
pub const INFO_FINDINGS: &str = "info_findings";
/// Claim charge relative to the provider's mean charge in the session
pub const PROVIDER_CHARGE_RATIO: &str = "provider_charge_ratio";
/// Claims by the same member with the same provider in the session
pub const MEMBER_PROVIDER_FREQUENCY: &str = "member_provider_frequency";
/// Billed units
pub const UNITS: &str = "units";

/// Definition of a feature that can be extracted from a claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureDefinition {
    /// Unique name of the feature
    pub name: String,

    /// Human-readable description of what this feature measures
    pub description: String,

    /// Minimum expected value
    pub min_value: Option<f64>,

    /// Maximum expected value
    pub max_value: Option<f64>,

    /// Default value when feature cannot be computed
    pub default_value: f64,
}

impl FeatureDefinition {
    /// Create a new feature definition
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            min_value: None,
            max_value: None,
            default_value: 0.0,
        }
    }

    /// Set the value range for this feature
    pub fn with_range(mut self, min_value: f64, max_value: f64) -> Self {
        self.min_value = Some(min_value);
        self.max_value = Some(max_value);
        self
    }

    /// Set the default value for this feature
    pub fn with_default(mut self, default_value: f64) -> Self {
        self.default_value = default_value;
        self
    }

    /// Check if a value is within the expected range
    pub fn is_valid_value(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.min_value.map_or(true, |min| value >= min)
            && self.max_value.map_or(true, |max| value <= max)
    }

    /// Clamp a value to the valid range
    pub fn clamp_value(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.default_value;
        }

        let mut clamped = value;
        if let Some(min) = self.min_value {
            clamped = clamped.max(min);
        }
        if let Some(max) = self.max_value {
            clamped = clamped.min(max);
        }
        clamped
    }
}

/// Container for a claim's computed feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Business claim id the features describe
    pub claim_id: String,

    /// Feature values in insertion order
    pub features: IndexMap<String, f64>,
}

impl FeatureVector {
    /// Create a new empty feature vector for a claim
    pub fn new(claim_id: impl Into<String>) -> Self {
        Self {
            claim_id: claim_id.into(),
            features: IndexMap::new(),
        }
    }

    /// Add a feature value to the vector
    pub fn add_feature(&mut self, name: impl Into<String>, value: f64) -> &mut Self {
        self.features.insert(name.into(), value);
        self
    }

    /// Get a feature value by name
    pub fn get_feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    /// Get the number of features in this vector
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Values ordered as `names`, using 0.0 for anything absent
    pub fn ordered_values(&self, names: &[String]) -> Vec<f64> {
        names
            .iter()
            .map(|name| self.get_feature(name).unwrap_or(0.0))
            .collect()
    }
}

/// Builds the fixed claim feature set
#[derive(Debug, Clone)]
pub struct ClaimFeatureBuilder {
    definitions: Vec<FeatureDefinition>,
}

impl Default for ClaimFeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimFeatureBuilder {
    /// Builder with the standard feature definitions
    pub fn new() -> Self {
        let definitions = vec![
            FeatureDefinition::new(
                PRICE_DEVIATION,
                "Robust z-score of the charge against the pinned baseline",
            )
            .with_range(-100.0, 100.0),
            FeatureDefinition::new(CRITICAL_FINDINGS, "Number of critical rule findings")
                .with_range(0.0, 100.0),
            FeatureDefinition::new(WARNING_FINDINGS, "Number of warning rule findings")
                .with_range(0.0, 100.0),
            FeatureDefinition::new(INFO_FINDINGS, "Number of informational rule findings")
                .with_range(0.0, 100.0),
            FeatureDefinition::new(
                PROVIDER_CHARGE_RATIO,
                "Charge divided by the provider's mean charge in the session",
            )
            .with_range(0.0, 1000.0)
            .with_default(1.0),
            FeatureDefinition::new(
                MEMBER_PROVIDER_FREQUENCY,
                "Session claims for this member with this provider",
            )
            .with_range(0.0, 10_000.0),
            FeatureDefinition::new(UNITS, "Billed units").with_range(0.0, 10_000.0),
        ];
        Self { definitions }
    }

    /// Feature definitions in model order
    pub fn definitions(&self) -> &[FeatureDefinition] {
        &self.definitions
    }

    /// Feature names in model order
    pub fn feature_names(&self) -> Vec<String> {
        self.definitions.iter().map(|d| d.name.clone()).collect()
    }

    /// Build the feature vector for one claim
    pub fn build(&self, claim: &Claim, findings: &[Finding], context: &RuleContext<'_>) -> FeatureVector {
        let (info, warning, critical) = severity_counts(findings);

        let price_deviation = context
            .snapshot
            .get(&claim.procedure_code)
            .filter(|stats| stats.sample_count >= context.config.min_baseline_sample_count)
            .and_then(|stats| robust_deviation(claim.charge_amount, stats))
            .unwrap_or(0.0);

        let charge = claim.charge_amount.to_f64().unwrap_or(0.0);
        let provider_charge_ratio = context
            .index
            .provider_mean_charge(&claim.provider_id)
            .filter(|mean| *mean > 0.0)
            .map_or(1.0, |mean| charge / mean);

        let frequency = context
            .index
            .member_provider_frequency(&claim.member_id, &claim.provider_id);

        let raw = [
            price_deviation,
            critical as f64,
            warning as f64,
            info as f64,
            provider_charge_ratio,
            frequency as f64,
            f64::from(claim.units),
        ];

        let mut vector = FeatureVector::new(claim.claim_id.clone());
        for (definition, value) in self.definitions.iter().zip(raw) {
            vector.add_feature(definition.name.clone(), definition.clamp_value(value));
        }
        vector
    }

    /// Check that every feature value is within its declared range
    pub fn validate(&self, vector: &FeatureVector) -> Result<()> {
        for definition in &self.definitions {
            let value = vector
                .get_feature(&definition.name)
                .unwrap_or(definition.default_value);
            if !definition.is_valid_value(value) {
                return Err(AuditError::validation_field(
                    format!("Feature '{}' value {} is out of range", definition.name, value),
                    definition.name.clone(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "featureset_tests.rs"]
mod tests;
